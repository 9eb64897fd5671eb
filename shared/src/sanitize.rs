//! Input normalization applied before validation, and HTML escaping for
//! anything rendered into an email body.

/// Trim, drop control characters and collapse runs of whitespace into a
/// single space. Used for single-line fields.
pub fn single_line(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`single_line`] but keeps line breaks, capping blank-line runs at one.
pub fn multi_line(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for raw in normalized.split('\n') {
        let line = single_line(raw);
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

pub fn email(input: &str) -> String {
    single_line(input).to_lowercase()
}

/// Phone numbers keep their formatting; validation checks the characters.
pub fn phone(input: &str) -> String {
    single_line(input)
}

/// Adds `https://` when a scheme is missing.
pub fn url(input: &str) -> String {
    let trimmed = single_line(input);
    if trimmed.is_empty() {
        return trimmed;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed
    } else {
        format!("https://{}", trimmed)
    }
}

/// Instagram handles are stored without the leading `@`, lower-cased.
pub fn instagram_handle(input: &str) -> String {
    let trimmed = single_line(input);
    let handle = trimmed
        .strip_prefix("https://www.instagram.com/")
        .or_else(|| trimmed.strip_prefix("https://instagram.com/"))
        .or_else(|| trimmed.strip_prefix("instagram.com/"))
        .unwrap_or(&trimmed);
    handle
        .trim_start_matches('@')
        .trim_end_matches('/')
        .to_lowercase()
}

/// Empty after normalization counts as absent.
pub fn optional(input: Option<&str>, f: fn(&str) -> String) -> Option<String> {
    input.map(f).filter(|v| !v.is_empty())
}

/// Escape user text for an HTML email body, preserving line breaks.
pub fn html(input: &str) -> String {
    input
        .split('\n')
        .map(ammonia::clean_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_collapses_whitespace_and_controls() {
        assert_eq!(single_line("  Ada \t  Lovelace\u{0007} "), "Ada Lovelace");
        assert_eq!(single_line("\n\n"), "");
    }

    #[test]
    fn multi_line_keeps_paragraphs() {
        let text = "  First line  \r\n\r\n\r\n  second   line \n";
        assert_eq!(multi_line(text), "First line\n\nsecond line");
    }

    #[test]
    fn url_gets_scheme() {
        assert_eq!(url("acme.com"), "https://acme.com");
        assert_eq!(url(" HTTP://acme.com "), "HTTP://acme.com");
        assert_eq!(url("   "), "");
    }

    #[test]
    fn instagram_handle_strips_prefixes() {
        assert_eq!(instagram_handle("@Acme.Studio"), "acme.studio");
        assert_eq!(instagram_handle("https://instagram.com/acme/"), "acme");
    }

    #[test]
    fn optional_treats_blank_as_absent() {
        assert_eq!(optional(Some("   "), single_line), None);
        assert_eq!(optional(None, single_line), None);
        assert_eq!(optional(Some(" x "), single_line), Some("x".to_string()));
    }

    #[test]
    fn html_escapes_markup() {
        let escaped = html("<script>alert(1)</script>\nok");
        assert!(!escaped.contains("<script>"));
        assert!(escaped.contains("<br>"));
    }
}
