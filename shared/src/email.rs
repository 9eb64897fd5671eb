use crate::sanitize;
use crate::types::Lead;
use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("provider rejected message: {0}")]
    Provider(String),
    #[error("webhook returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError>;
}

/// Sends through AWS SES v2
pub struct SesMailer {
    client: SesClient,
    from_email: String,
}

impl SesMailer {
    pub fn new(client: SesClient, from_email: impl Into<String>) -> Self {
        Self {
            client,
            from_email: from_email.into(),
        }
    }
}

fn utf8(data: impl Into<String>, what: &str) -> Result<Content, DeliveryError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| DeliveryError::Build(format!("{}: {:?}", what, e)))
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let body = Body::builder()
            .html(utf8(email.html.clone(), "html")?)
            .text(utf8(email.text.clone(), "text")?)
            .build();

        let message = Message::builder()
            .subject(utf8(email.subject.clone(), "subject")?)
            .body(body)
            .build();

        let content = EmailContent::builder().simple(message).build();

        let mut request = self
            .client
            .send_email()
            .from_email_address(&self.from_email)
            .destination(destination)
            .content(content);
        if let Some(reply_to) = &email.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        request
            .send()
            .await
            .map_err(|e| DeliveryError::Provider(format!("{:?}", e)))?;
        Ok(())
    }
}

// ========== TEMPLATES ==========

fn layout(site_name: &str, title: &str, inner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{
            font-family: 'HelveticaNeue', Helvetica, Arial, sans-serif;
            line-height: 1.6;
            color: #333333;
            background: #ffffff;
            margin: 0;
            padding: 0;
        }}
        .wrapper {{ max-width: 600px; margin: 0 auto; padding: 48px 20px; }}
        .container {{ border: 1px solid #e5e5e5; padding: 48px 40px; }}
        .logo {{ font-size: 22px; font-weight: 300; color: #000000; text-align: center; margin: 0 0 32px 0; }}
        .title {{ font-size: 20px; font-weight: 300; color: #000000; margin: 0 0 24px 0; }}
        .text {{ font-size: 15px; margin: 0 0 20px 0; }}
        table.fields {{ width: 100%; border-collapse: collapse; font-size: 14px; }}
        table.fields td {{ padding: 8px 0; border-bottom: 1px solid #f0f0f0; vertical-align: top; }}
        table.fields td.key {{ color: #666666; width: 35%; }}
        .footer {{ margin-top: 40px; padding-top: 20px; border-top: 1px solid #e5e5e5; font-size: 13px; color: #666666; text-align: center; }}
    </style>
</head>
<body>
    <div class="wrapper">
        <div class="container">
            <h1 class="logo">{site}</h1>
            <h2 class="title">{title}</h2>
            {inner}
            <div class="footer">{site}</div>
        </div>
    </div>
</body>
</html>"#,
        site = sanitize::html(site_name),
        title = sanitize::html(title),
        inner = inner,
    )
}

/// Acknowledgement sent to the person who filled the form
pub fn confirmation_email(lead: &Lead, site_name: &str) -> OutboundEmail {
    let s = &lead.submission;
    let first_name = s.full_name.split_whitespace().next().unwrap_or(&s.full_name);
    let needs = s
        .needs
        .iter()
        .map(|n| n.label())
        .collect::<Vec<_>>()
        .join(", ");

    let html_inner = format!(
        r#"<p class="text">Hi {name},</p>
            <p class="text">Thanks for reaching out about {company}. We received your request and will get back to you within one business day.</p>
            <p class="text">What you told us you need: {needs}.</p>
            <p class="text">If anything changes in the meantime, just reply to this email.</p>"#,
        name = sanitize::html(first_name),
        company = sanitize::html(&s.company),
        needs = sanitize::html(&needs),
    );

    let text = format!(
        "Hi {},\n\nThanks for reaching out about {}. We received your request and will get back to you within one business day.\n\nWhat you told us you need: {}.\n\nIf anything changes in the meantime, just reply to this email.\n\n{}",
        first_name, s.company, needs, site_name
    );

    OutboundEmail {
        to: s.email.clone(),
        reply_to: None,
        subject: format!("We received your message | {}", site_name),
        html: layout(site_name, "Thanks for getting in touch", &html_inner),
        text,
    }
}

fn field_rows(lead: &Lead) -> Vec<(&'static str, String)> {
    let s = &lead.submission;
    let p = &lead.provenance;
    vec![
        ("Name", s.full_name.clone()),
        ("Email", s.email.clone()),
        ("WhatsApp", s.whatsapp.clone()),
        ("LinkedIn", s.linkedin.clone().unwrap_or_else(|| "-".to_string())),
        ("Company", s.company.clone()),
        ("Role", s.role.clone()),
        (
            "Website",
            s.presence.website_url.clone().unwrap_or_else(|| "-".to_string()),
        ),
        (
            "Instagram",
            s.presence
                .instagram
                .as_ref()
                .map(|h| format!("@{}", h))
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Company size", s.company_size.label().to_string()),
        ("Industry", s.industry.label().to_string()),
        (
            "Needs",
            s.needs.iter().map(|n| n.label()).collect::<Vec<_>>().join(", "),
        ),
        ("Heard from", s.heard_from.label().to_string()),
        ("Summary", s.summary.clone()),
        ("Submitted at", p.submitted_at.to_rfc3339()),
        ("IP", p.client_ip.clone()),
        ("User agent", p.user_agent.clone()),
        ("Submission", p.submission_id.clone()),
    ]
}

/// Internal notification with every field; replies go to the lead
pub fn notification_email(lead: &Lead, admin_email: &str, site_name: &str) -> OutboundEmail {
    let s = &lead.submission;
    let rows = field_rows(lead);

    let table = rows
        .iter()
        .map(|(k, v)| {
            format!(
                r#"<tr><td class="key">{}</td><td>{}</td></tr>"#,
                k,
                sanitize::html(v)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let html_inner = format!(r#"<table class="fields">{}</table>"#, table);

    let text = rows
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    OutboundEmail {
        to: admin_email.to_string(),
        reply_to: Some(s.email.clone()),
        subject: format!("New lead: {} ({})", s.full_name, s.company),
        html: layout(site_name, "New contact submission", &html_inner),
        text,
    }
}
