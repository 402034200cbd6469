use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("wizard configuration error: {0}")]
    Configuration(String),
    #[error("step {step} is not complete; required fields are missing")]
    NotReady { step: usize },
    #[error("cannot finish from step {step}; the wizard has {total} steps")]
    NotFinalStep { step: usize, total: usize },
    #[error("draft {code} has no seed reference")]
    MissingSeedReference { code: String },
    #[error("draft field '{field}' holds an unexpected value: {reason}")]
    InvalidField { field: String, reason: String },
}
