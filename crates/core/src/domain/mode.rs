// System operating mode

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Process-wide operating posture, set by the power/thermal policy.
///
/// Only changes how quickly idle workers are hibernated, never the
/// admission thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemMode {
    Eco,
    #[default]
    Normal,
    High,
    Ultra,
}

impl SystemMode {
    /// Base idle timeout before hibernation in this mode
    pub fn base_idle_timeout(&self) -> Duration {
        match self {
            SystemMode::Eco => Duration::from_secs(60),
            SystemMode::Normal => Duration::from_secs(300),
            SystemMode::High | SystemMode::Ultra => Duration::from_secs(1800),
        }
    }
}

impl std::fmt::Display for SystemMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemMode::Eco => write!(f, "ECO"),
            SystemMode::Normal => write!(f, "NORMAL"),
            SystemMode::High => write!(f, "HIGH"),
            SystemMode::Ultra => write!(f, "ULTRA"),
        }
    }
}

impl FromStr for SystemMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECO" => Ok(SystemMode::Eco),
            "NORMAL" => Ok(SystemMode::Normal),
            "HIGH" => Ok(SystemMode::High),
            "ULTRA" => Ok(SystemMode::Ultra),
            _ => Err(DomainError::InvalidMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_timeouts() {
        assert_eq!(SystemMode::Eco.base_idle_timeout(), Duration::from_secs(60));
        assert_eq!(SystemMode::Normal.base_idle_timeout(), Duration::from_secs(300));
        assert_eq!(SystemMode::High.base_idle_timeout(), Duration::from_secs(1800));
        assert_eq!(SystemMode::default(), SystemMode::Normal);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("eco".parse::<SystemMode>().unwrap(), SystemMode::Eco);
        assert_eq!("ULTRA".parse::<SystemMode>().unwrap(), SystemMode::Ultra);
        assert!(matches!(
            "turbo".parse::<SystemMode>(),
            Err(DomainError::InvalidMode(_))
        ));
    }
}
