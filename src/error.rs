use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown period '{0}' (expected 1_day, 1_week, 1_month, 2_months, 3_months, 6_months, 10_months or all)")]
    InvalidPeriod(String),

    #[error("malformed date '{0}'")]
    MalformedDate(String),

    #[error("unknown attendance status '{0}'")]
    UnknownStatus(String),

    #[error("unknown merit type '{0}'")]
    UnknownMeritKind(String),

    #[error("merit points must be a non-negative number, got {0}")]
    NegativePoints(f64),

    #[error("invalid score weights: present {present}, late {late} (need present > late >= 0)")]
    InvalidWeights { present: f64, late: f64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
