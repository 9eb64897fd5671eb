//! Qualification and contact wizards as closed state machines. Transitions
//! are pure: the same state and input always give the same result.

use crate::types::{ContactForm, FieldError};
use crate::validation;
use serde::{Deserialize, Serialize};

// ========== QUALIFICATION FLOW ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Website,
    Ecommerce,
    WebApp,
    Redesign,
    Other,
}

/// Budget tiers, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetTier {
    Under5k,
    From5kTo15k,
    From15kTo50k,
    Over50k,
}

impl BudgetTier {
    pub const LOWEST: BudgetTier = BudgetTier::Under5k;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Timeline {
    Asap,
    OneToThreeMonths,
    ThreeToSixMonths,
    Flexible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum QualificationState {
    ServiceType,
    Budget {
        service: ServiceType,
    },
    Timeline {
        service: ServiceType,
        budget: BudgetTier,
    },
    Booking {
        service: ServiceType,
        budget: BudgetTier,
        timeline: Timeline,
    },
    NotAFit {
        service: ServiceType,
        budget: BudgetTier,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum QualificationInput {
    SelectService(ServiceType),
    SelectBudget(BudgetTier),
    SelectTimeline(Timeline),
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("input {input:?} is not valid at step {step}")]
    UnexpectedInput {
        step: &'static str,
        input: QualificationInput,
    },
    #[error("already at the first step")]
    AtStart,
}

impl QualificationState {
    pub fn start() -> Self {
        QualificationState::ServiceType
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualificationState::ServiceType => "service-type",
            QualificationState::Budget { .. } => "budget",
            QualificationState::Timeline { .. } => "timeline",
            QualificationState::Booking { .. } => "booking",
            QualificationState::NotAFit { .. } => "not-a-fit",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QualificationState::Booking { .. } | QualificationState::NotAFit { .. }
        )
    }
}

/// Advance the qualification flow by one input.
pub fn transition(
    state: &QualificationState,
    input: QualificationInput,
) -> Result<QualificationState, WizardError> {
    use QualificationInput as I;
    use QualificationState as S;

    let next = match (state, input) {
        (S::ServiceType, I::SelectService(service)) => S::Budget { service },
        (S::Budget { service }, I::SelectBudget(budget)) if budget == BudgetTier::LOWEST => {
            S::NotAFit {
                service: *service,
                budget,
            }
        }
        (S::Budget { service }, I::SelectBudget(budget)) => S::Timeline {
            service: *service,
            budget,
        },
        (S::Timeline { service, budget }, I::SelectTimeline(timeline)) => S::Booking {
            service: *service,
            budget: *budget,
            timeline,
        },

        (S::ServiceType, I::Back) => return Err(WizardError::AtStart),
        (S::Budget { .. }, I::Back) => S::ServiceType,
        (S::Timeline { service, .. }, I::Back) | (S::NotAFit { service, .. }, I::Back) => {
            S::Budget { service: *service }
        }
        (
            S::Booking {
                service, budget, ..
            },
            I::Back,
        ) => S::Timeline {
            service: *service,
            budget: *budget,
        },

        (state, input) => {
            return Err(WizardError::UnexpectedInput {
                step: state.name(),
                input,
            })
        }
    };
    Ok(next)
}

/// Fold a sequence of inputs from the first step.
pub fn replay(inputs: &[QualificationInput]) -> Result<QualificationState, WizardError> {
    inputs
        .iter()
        .try_fold(QualificationState::start(), |state, input| {
            transition(&state, *input)
        })
}

// ========== CONTACT WIZARD ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStep {
    Identity,
    Company,
    Project,
    Review,
}

impl ContactStep {
    pub fn back(self) -> Option<ContactStep> {
        match self {
            ContactStep::Identity => None,
            ContactStep::Company => Some(ContactStep::Identity),
            ContactStep::Project => Some(ContactStep::Company),
            ContactStep::Review => Some(ContactStep::Project),
        }
    }

    fn following(self) -> ContactStep {
        match self {
            ContactStep::Identity => ContactStep::Company,
            ContactStep::Company => ContactStep::Project,
            ContactStep::Project | ContactStep::Review => ContactStep::Review,
        }
    }

    /// Field errors for the fields this step collects.
    pub fn check(self, draft: &ContactForm) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match self {
            ContactStep::Identity => {
                validation::full_name(draft.full_name.as_deref(), &mut errors);
                validation::email(draft.email.as_deref(), &mut errors);
                validation::whatsapp(draft.whatsapp.as_deref(), &mut errors);
            }
            ContactStep::Company => {
                validation::short_text("company", draft.company.as_deref(), &mut errors);
                validation::short_text("role", draft.role.as_deref(), &mut errors);
                validation::presence(
                    draft.website_url.as_deref(),
                    draft.instagram.as_deref(),
                    &mut errors,
                );
                validation::code::<crate::types::CompanySize>(
                    "companySize",
                    draft.company_size.as_deref(),
                    &mut errors,
                );
                validation::code::<crate::types::Industry>(
                    "industry",
                    draft.industry.as_deref(),
                    &mut errors,
                );
            }
            ContactStep::Project => {
                validation::needs(draft.need.clone().map(|n| n.into_vec()), &mut errors);
                validation::summary(draft.summary.as_deref(), &mut errors);
                validation::code::<crate::types::HeardFrom>(
                    "heardFrom",
                    draft.heard_from.as_deref(),
                    &mut errors,
                );
                validation::accept_terms(draft.accept_terms, &mut errors);
            }
            ContactStep::Review => {
                if let Err(all) = validation::validate(draft) {
                    errors = all;
                }
            }
        }
        errors
    }

    /// Move forward when this step's fields are valid.
    pub fn advance(self, draft: &ContactForm) -> Result<ContactStep, Vec<FieldError>> {
        let errors = self.check(draft);
        if errors.is_empty() {
            Ok(self.following())
        } else {
            Err(errors)
        }
    }
}
