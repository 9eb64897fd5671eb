use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

// ========== CONTACT FORM (wire) ==========

/// `need` arrives either as a single code or as a list of codes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(code) => vec![code],
            OneOrMany::Many(codes) => codes,
        }
    }
}

/// Request body for POST /api/contact, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phone")]
    pub whatsapp: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "website")]
    pub website_url: Option<String>,
    pub instagram: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub need: Option<OneOrMany>,
    pub summary: Option<String>,
    pub heard_from: Option<String>,
    pub accept_terms: Option<bool>,
    pub honeypot: Option<String>,
}

/// Keys holding free text or a single code, with the field they report under.
const TEXT_KEYS: [(&str, &str); 14] = [
    ("fullName", "fullName"),
    ("email", "email"),
    ("whatsapp", "whatsapp"),
    ("phone", "whatsapp"),
    ("linkedin", "linkedin"),
    ("company", "company"),
    ("role", "role"),
    ("websiteUrl", "websiteUrl"),
    ("website", "websiteUrl"),
    ("instagram", "instagram"),
    ("companySize", "companySize"),
    ("industry", "industry"),
    ("summary", "summary"),
    ("heardFrom", "heardFrom"),
];

impl ContactForm {
    /// Decode a JSON object field by field. A value of the wrong JSON type is
    /// dropped and reported under its field name instead of failing the whole
    /// body. `null` counts as absent.
    pub fn from_object(
        mut object: Map<String, Value>,
    ) -> Result<(ContactForm, Vec<FieldError>), serde_json::Error> {
        let mut errors = Vec::new();

        // The canonical key wins when a client sends both spellings.
        for (alias, canonical) in [("phone", "whatsapp"), ("website", "websiteUrl")] {
            if object.contains_key(canonical) {
                object.remove(alias);
            }
        }
        for (key, field) in TEXT_KEYS {
            if matches!(object.get(key), Some(v) if !v.is_null() && !v.is_string()) {
                object.remove(key);
                errors.push(FieldError::new(field, "Must be text"));
            }
        }

        let need_ok = match object.get("need") {
            None | Some(Value::Null) | Some(Value::String(_)) => true,
            Some(Value::Array(items)) => items.iter().all(Value::is_string),
            Some(_) => false,
        };
        if !need_ok {
            object.remove("need");
            errors.push(FieldError::new("need", "Select at least one option"));
        }

        if matches!(object.get("acceptTerms"), Some(v) if !v.is_null() && !v.is_boolean()) {
            object.remove("acceptTerms");
            errors.push(FieldError::new("acceptTerms", "You must accept the terms"));
        }

        // Any non-empty honeypot value is a bot signal, whatever its type.
        match object.get("honeypot") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(Value::Bool(false)) => {
                object.remove("honeypot");
            }
            Some(other) => {
                let filled = other.to_string();
                object.insert("honeypot".to_string(), Value::String(filled));
            }
        }

        let form = serde_json::from_value(Value::Object(object))?;
        Ok((form, errors))
    }

    /// A filled honeypot means the form was completed by a bot.
    pub fn is_bot(&self) -> bool {
        self.honeypot
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}

// ========== ENUMERATED CODES ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanySize {
    Solo,
    Small,
    Medium,
    Large,
    Big,
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 6] = [
        CompanySize::Solo,
        CompanySize::Small,
        CompanySize::Medium,
        CompanySize::Large,
        CompanySize::Big,
        CompanySize::Enterprise,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CompanySize::Solo => "1",
            CompanySize::Small => "2-10",
            CompanySize::Medium => "11-50",
            CompanySize::Large => "51-200",
            CompanySize::Big => "201-500",
            CompanySize::Enterprise => "500+",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompanySize::Solo => "Just me",
            CompanySize::Small => "2-10 employees",
            CompanySize::Medium => "11-50 employees",
            CompanySize::Large => "51-200 employees",
            CompanySize::Big => "201-500 employees",
            CompanySize::Enterprise => "More than 500 employees",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Industry {
    Ecommerce,
    Saas,
    Health,
    Education,
    Finance,
    RealEstate,
    Hospitality,
    ProfessionalServices,
    Nonprofit,
    Other,
}

impl Industry {
    pub const ALL: [Industry; 10] = [
        Industry::Ecommerce,
        Industry::Saas,
        Industry::Health,
        Industry::Education,
        Industry::Finance,
        Industry::RealEstate,
        Industry::Hospitality,
        Industry::ProfessionalServices,
        Industry::Nonprofit,
        Industry::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Industry::Ecommerce => "ecommerce",
            Industry::Saas => "saas",
            Industry::Health => "health",
            Industry::Education => "education",
            Industry::Finance => "finance",
            Industry::RealEstate => "real-estate",
            Industry::Hospitality => "hospitality",
            Industry::ProfessionalServices => "professional-services",
            Industry::Nonprofit => "nonprofit",
            Industry::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Industry::Ecommerce => "E-commerce / Retail",
            Industry::Saas => "SaaS / Technology",
            Industry::Health => "Health & Wellness",
            Industry::Education => "Education",
            Industry::Finance => "Finance & Insurance",
            Industry::RealEstate => "Real Estate",
            Industry::Hospitality => "Hospitality & Food",
            Industry::ProfessionalServices => "Professional Services",
            Industry::Nonprofit => "Non-profit",
            Industry::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Need {
    Website,
    LandingPage,
    Ecommerce,
    WebApp,
    Redesign,
    Seo,
    Maintenance,
    Branding,
    Other,
}

impl Need {
    pub const ALL: [Need; 9] = [
        Need::Website,
        Need::LandingPage,
        Need::Ecommerce,
        Need::WebApp,
        Need::Redesign,
        Need::Seo,
        Need::Maintenance,
        Need::Branding,
        Need::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Need::Website => "website",
            Need::LandingPage => "landing-page",
            Need::Ecommerce => "ecommerce",
            Need::WebApp => "web-app",
            Need::Redesign => "redesign",
            Need::Seo => "seo",
            Need::Maintenance => "maintenance",
            Need::Branding => "branding",
            Need::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Need::Website => "Institutional website",
            Need::LandingPage => "Landing page",
            Need::Ecommerce => "Online store",
            Need::WebApp => "Web application",
            Need::Redesign => "Redesign of an existing site",
            Need::Seo => "SEO & performance",
            Need::Maintenance => "Maintenance & support",
            Need::Branding => "Branding & visual identity",
            Need::Other => "Something else",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeardFrom {
    Google,
    Instagram,
    Linkedin,
    Referral,
    Event,
    Other,
}

impl HeardFrom {
    pub const ALL: [HeardFrom; 6] = [
        HeardFrom::Google,
        HeardFrom::Instagram,
        HeardFrom::Linkedin,
        HeardFrom::Referral,
        HeardFrom::Event,
        HeardFrom::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            HeardFrom::Google => "google",
            HeardFrom::Instagram => "instagram",
            HeardFrom::Linkedin => "linkedin",
            HeardFrom::Referral => "referral",
            HeardFrom::Event => "event",
            HeardFrom::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeardFrom::Google => "Google search",
            HeardFrom::Instagram => "Instagram",
            HeardFrom::Linkedin => "LinkedIn",
            HeardFrom::Referral => "Referral from a friend or client",
            HeardFrom::Event => "Event or talk",
            HeardFrom::Other => "Other",
        }
    }
}

/// Unknown enumerated code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown code: {0}")]
pub struct UnknownCode(pub String);

impl FromStr for CompanySize {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompanySize::ALL
            .into_iter()
            .find(|v| v.code() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

impl FromStr for Industry {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Industry::ALL
            .into_iter()
            .find(|v| v.code() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

impl FromStr for Need {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Need::ALL
            .into_iter()
            .find(|v| v.code() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

impl FromStr for HeardFrom {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeardFrom::ALL
            .into_iter()
            .find(|v| v.code() == s)
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

// ========== VALIDATED SUBMISSION ==========

/// Where the business can be seen online. At least one is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub website_url: Option<String>,
    pub instagram: Option<String>,
}

/// A contact submission that passed validation and sanitization
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    pub full_name: String,
    pub email: String,
    pub whatsapp: String,
    pub linkedin: Option<String>,
    pub company: String,
    pub role: String,
    pub presence: Presence,
    pub company_size: CompanySize,
    pub industry: Industry,
    pub needs: Vec<Need>,
    pub summary: String,
    pub heard_from: HeardFrom,
}

/// Request metadata attached server-side
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub submission_id: String,
    pub client_ip: String,
    pub user_agent: String,
    pub submitted_at: DateTime<Utc>,
}

/// Validated submission plus provenance; what the fan-out operates on
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub submission: ContactSubmission,
    pub provenance: Provenance,
}

// ========== WEBHOOK RECORD ==========

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabeledCode {
    pub code: String,
    pub label: String,
}

/// Normalized lead posted to the automation webhook
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub submission_id: String,
    pub full_name: String,
    pub email: String,
    pub whatsapp: String,
    pub linkedin: Option<String>,
    pub company: String,
    pub role: String,
    pub website_url: Option<String>,
    pub instagram: Option<String>,
    pub company_size: LabeledCode,
    pub industry: LabeledCode,
    pub need: Vec<LabeledCode>,
    pub summary: String,
    pub heard_from: LabeledCode,
    pub client_ip: String,
    pub user_agent: String,
    pub submitted_at: String,
    pub source: String,
}

fn labeled(code: &str, label: &str) -> LabeledCode {
    LabeledCode {
        code: code.to_string(),
        label: label.to_string(),
    }
}

impl From<&Lead> for LeadRecord {
    fn from(lead: &Lead) -> Self {
        let s = &lead.submission;
        let p = &lead.provenance;
        LeadRecord {
            submission_id: p.submission_id.clone(),
            full_name: s.full_name.clone(),
            email: s.email.clone(),
            whatsapp: s.whatsapp.clone(),
            linkedin: s.linkedin.clone(),
            company: s.company.clone(),
            role: s.role.clone(),
            website_url: s.presence.website_url.clone(),
            instagram: s.presence.instagram.clone(),
            company_size: labeled(s.company_size.code(), s.company_size.label()),
            industry: labeled(s.industry.code(), s.industry.label()),
            need: s.needs.iter().map(|n| labeled(n.code(), n.label())).collect(),
            summary: s.summary.clone(),
            heard_from: labeled(s.heard_from.code(), s.heard_from.label()),
            client_ip: p.client_ip.clone(),
            user_agent: p.user_agent.clone(),
            submitted_at: p.submitted_at.to_rfc3339(),
            source: "contact-form".to_string(),
        }
    }
}

// ========== RESPONSES ==========

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}
