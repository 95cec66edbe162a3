use std::env;

use thiserror::Error;

use crate::calendar::{self, ReportingCalendar};
use crate::error::{EngineError, EngineResult};

/// Points awarded per attended lesson. `present > late >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    present: f64,
    late: f64,
}

impl ScoreWeights {
    pub fn new(present: f64, late: f64) -> EngineResult<Self> {
        if !present.is_finite() || !late.is_finite() || late < 0.0 || present <= late {
            return Err(EngineError::InvalidWeights { present, late });
        }
        Ok(Self { present, late })
    }

    pub fn present(&self) -> f64 {
        self.present
    }

    pub fn late(&self) -> f64 {
        self.late
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            present: 1.0,
            late: 0.5,
        }
    }
}

/// Tunables shared by every aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub weights: ScoreWeights,
    /// How many efficiency points each late-percentage point costs a group.
    pub efficiency_late_discount: f64,
    pub calendar: ReportingCalendar,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            efficiency_late_discount: 0.0,
            calendar: ReportingCalendar::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be a non-negative number, got {value}")]
    NegativeValue { var: &'static str, value: f64 },

    #[error("ROSTER_UTC_OFFSET must look like +05:00, got '{0}'")]
    InvalidOffset(String),

    #[error(transparent)]
    Weights(#[from] EngineError),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset variables fall back to the stock weights (present 1.0, late 0.5)
    /// on purpose; only a value that is set but invalid is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = read_number(&lookup, "ROSTER_PRESENT_WEIGHT", 1.0)?;
        let late = read_number(&lookup, "ROSTER_LATE_WEIGHT", 0.5)?;
        let weights = ScoreWeights::new(present, late)?;

        let efficiency_late_discount =
            read_number(&lookup, "ROSTER_EFFICIENCY_LATE_DISCOUNT", 0.0)?;
        if efficiency_late_discount < 0.0 {
            return Err(ConfigError::NegativeValue {
                var: "ROSTER_EFFICIENCY_LATE_DISCOUNT",
                value: efficiency_late_discount,
            });
        }

        let calendar = match lookup("ROSTER_UTC_OFFSET") {
            Some(raw) => ReportingCalendar::new(
                calendar::parse_offset(&raw).ok_or(ConfigError::InvalidOffset(raw))?,
            ),
            None => ReportingCalendar::default(),
        };

        let log_level = lookup("ROSTER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            engine: EngineConfig {
                weights,
                efficiency_late_discount,
                calendar,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn read_number<F>(lookup: &F, var: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ConfigError::InvalidNumber { var, value: raw }),
        },
    }
}
