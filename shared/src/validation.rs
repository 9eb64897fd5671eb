use crate::sanitize;
use crate::types::{
    CompanySize, ContactForm, ContactSubmission, FieldError, HeardFrom, Industry, Need, Presence,
};
use email_address::EmailAddress;
use std::str::FromStr;

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 254;
pub const TEXT_MAX: usize = 100;
pub const PHONE_MIN_DIGITS: usize = 8;
pub const PHONE_MAX_DIGITS: usize = 15;
pub const SUMMARY_MIN: usize = 10;
pub const SUMMARY_MAX: usize = 2000;
pub const INSTAGRAM_MAX: usize = 30;

/// [`validate`], with the type errors found while decoding the body listed
/// first. A field already reported there is not reported again.
pub fn validate_decoded(
    form: &ContactForm,
    type_errors: Vec<FieldError>,
) -> Result<ContactSubmission, Vec<FieldError>> {
    match validate(form) {
        Ok(submission) if type_errors.is_empty() => Ok(submission),
        Ok(_) => Err(type_errors),
        Err(errors) => {
            let mut merged = type_errors;
            for error in errors {
                if !merged.iter().any(|e| e.field == error.field) {
                    merged.push(error);
                }
            }
            Err(merged)
        }
    }
}

/// Validate and sanitize a contact form. Every failing field is reported.
pub fn validate(form: &ContactForm) -> Result<ContactSubmission, Vec<FieldError>> {
    let mut errors = Vec::new();

    let full_name = full_name(form.full_name.as_deref(), &mut errors);
    let email = email(form.email.as_deref(), &mut errors);
    let whatsapp = whatsapp(form.whatsapp.as_deref(), &mut errors);
    let linkedin = linkedin(form.linkedin.as_deref(), &mut errors);
    let company = short_text("company", form.company.as_deref(), &mut errors);
    let role = short_text("role", form.role.as_deref(), &mut errors);
    let presence = presence(
        form.website_url.as_deref(),
        form.instagram.as_deref(),
        &mut errors,
    );
    let company_size = code::<CompanySize>("companySize", form.company_size.as_deref(), &mut errors);
    let industry = code::<Industry>("industry", form.industry.as_deref(), &mut errors);
    let needs = needs(form.need.clone().map(|n| n.into_vec()), &mut errors);
    let summary = summary(form.summary.as_deref(), &mut errors);
    let heard_from = code::<HeardFrom>("heardFrom", form.heard_from.as_deref(), &mut errors);
    accept_terms(form.accept_terms, &mut errors);

    match (
        full_name,
        email,
        whatsapp,
        company,
        role,
        presence,
        company_size,
        industry,
        needs,
        summary,
        heard_from,
    ) {
        (
            Some(full_name),
            Some(email),
            Some(whatsapp),
            Some(company),
            Some(role),
            Some(presence),
            Some(company_size),
            Some(industry),
            Some(needs),
            Some(summary),
            Some(heard_from),
        ) if errors.is_empty() => Ok(ContactSubmission {
            full_name,
            email,
            whatsapp,
            linkedin,
            company,
            role,
            presence,
            company_size,
            industry,
            needs,
            summary,
            heard_from,
        }),
        _ => Err(errors),
    }
}

fn required(
    field: &str,
    value: Option<&str>,
    clean: fn(&str) -> String,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match sanitize::optional(value, clean) {
        Some(v) => Some(v),
        None => {
            errors.push(FieldError::new(field, "This field is required"));
            None
        }
    }
}

fn within(
    field: &str,
    value: String,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("Must be at least {} characters", min),
        ));
        None
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("Must be at most {} characters", max),
        ));
        None
    } else {
        Some(value)
    }
}

pub(crate) fn full_name(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let name = required("fullName", value, sanitize::single_line, errors)?;
    within("fullName", name, NAME_MIN, NAME_MAX, errors)
}

pub(crate) fn email(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let email = required("email", value, sanitize::email, errors)?;
    if email.len() > EMAIL_MAX || !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Enter a valid email address"));
        return None;
    }
    Some(email)
}

/// `email_address` accepts dotless domains; a contact form should not.
pub fn is_valid_email(value: &str) -> bool {
    match EmailAddress::from_str(value) {
        Ok(parsed) => {
            let domain = parsed.domain();
            domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        Err(_) => false,
    }
}

pub(crate) fn whatsapp(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let phone = required("whatsapp", value, sanitize::phone, errors)?;
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let plus_ok = phone.rfind('+').map(|i| i == 0).unwrap_or(true);
    if !allowed || !plus_ok || !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        errors.push(FieldError::new("whatsapp", "Enter a valid phone number"));
        return None;
    }
    Some(phone)
}

fn linkedin(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let link = sanitize::optional(value, sanitize::url)?;
    let on_linkedin = url::Url::parse(&link)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| host == "linkedin.com" || host.ends_with(".linkedin.com"))
        .unwrap_or(false);
    if !on_linkedin {
        errors.push(FieldError::new("linkedin", "Enter a LinkedIn profile URL"));
        return None;
    }
    Some(link)
}

pub(crate) fn short_text(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let text = required(field, value, sanitize::single_line, errors)?;
    within(field, text, 1, TEXT_MAX, errors)
}

fn is_web_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| {
            matches!(u.scheme(), "http" | "https")
                && u.host_str().map(|h| h.contains('.')).unwrap_or(false)
        })
        .unwrap_or(false)
}

fn is_instagram_handle(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= INSTAGRAM_MAX
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

pub(crate) fn presence(
    website_url: Option<&str>,
    instagram: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<Presence> {
    let website_url = sanitize::optional(website_url, sanitize::url);
    let instagram = sanitize::optional(instagram, sanitize::instagram_handle);
    let mut ok = true;

    if website_url.is_none() && instagram.is_none() {
        errors.push(FieldError::new(
            "websiteUrl",
            "Provide a website or an Instagram handle",
        ));
        return None;
    }
    if let Some(site) = &website_url {
        if !is_web_url(site) {
            errors.push(FieldError::new("websiteUrl", "Enter a valid website URL"));
            ok = false;
        }
    }
    if let Some(handle) = &instagram {
        if !is_instagram_handle(handle) {
            errors.push(FieldError::new("instagram", "Enter a valid Instagram handle"));
            ok = false;
        }
    }
    ok.then_some(Presence {
        website_url,
        instagram,
    })
}

pub(crate) fn code<T: FromStr>(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = required(field, value, sanitize::single_line, errors)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(FieldError::new(field, "Select one of the available options"));
            None
        }
    }
}

pub(crate) fn needs(value: Option<Vec<String>>, errors: &mut Vec<FieldError>) -> Option<Vec<Need>> {
    let codes: Vec<String> = value
        .unwrap_or_default()
        .iter()
        .map(|c| sanitize::single_line(c))
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        errors.push(FieldError::new("need", "Select at least one option"));
        return None;
    }
    let mut needs = Vec::with_capacity(codes.len());
    for c in &codes {
        match c.parse::<Need>() {
            Ok(n) if !needs.contains(&n) => needs.push(n),
            Ok(_) => {}
            Err(_) => {
                errors.push(FieldError::new("need", format!("Unknown option: {}", c)));
                return None;
            }
        }
    }
    Some(needs)
}

pub(crate) fn summary(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let text = required("summary", value, sanitize::multi_line, errors)?;
    within("summary", text, SUMMARY_MIN, SUMMARY_MAX, errors)
}

pub(crate) fn accept_terms(value: Option<bool>, errors: &mut Vec<FieldError>) -> bool {
    if value == Some(true) {
        true
    } else {
        errors.push(FieldError::new("acceptTerms", "You must accept the terms"));
        false
    }
}
