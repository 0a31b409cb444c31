// Admission priority

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Admission priority (higher ordinal drains first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl AdmissionPriority {
    pub fn ordinal(&self) -> u8 {
        match self {
            AdmissionPriority::Critical => 3,
            AdmissionPriority::High => 2,
            AdmissionPriority::Normal => 1,
            AdmissionPriority::Low => 0,
        }
    }
}

impl std::fmt::Display for AdmissionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionPriority::Critical => write!(f, "CRITICAL"),
            AdmissionPriority::High => write!(f, "HIGH"),
            AdmissionPriority::Normal => write!(f, "NORMAL"),
            AdmissionPriority::Low => write!(f, "LOW"),
        }
    }
}

impl FromStr for AdmissionPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(AdmissionPriority::Critical),
            "HIGH" => Ok(AdmissionPriority::High),
            "NORMAL" => Ok(AdmissionPriority::Normal),
            "LOW" => Ok(AdmissionPriority::Low),
            _ => Err(DomainError::InvalidPriority(s.to_string())),
        }
    }
}
