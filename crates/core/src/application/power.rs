// Mode-driven power policy

use crate::application::constants::{
    ECO_RECONCILE_INTERVAL, HIGH_RECONCILE_INTERVAL, NORMAL_RECONCILE_INTERVAL,
    ULTRA_RECONCILE_INTERVAL,
};
use crate::domain::SystemMode;
use crate::port::PowerPolicy;
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Holds the process-wide SystemMode and derives the reconciliation cadence from it
pub struct ModePowerPolicy {
    mode: RwLock<SystemMode>,
}

impl ModePowerPolicy {
    pub fn new(mode: SystemMode) -> Self {
        Self {
            mode: RwLock::new(mode),
        }
    }

    /// Switch operating posture (e.g. from a thermal or battery policy)
    pub fn set_mode(&self, mode: SystemMode) {
        let mut current = self.mode.write().unwrap_or_else(|e| e.into_inner());
        if *current != mode {
            info!(from = %*current, to = %mode, "System mode changed");
            *current = mode;
        }
    }

    pub fn interval_for(mode: SystemMode) -> Duration {
        match mode {
            SystemMode::Eco => ECO_RECONCILE_INTERVAL,
            SystemMode::Normal => NORMAL_RECONCILE_INTERVAL,
            SystemMode::High => HIGH_RECONCILE_INTERVAL,
            SystemMode::Ultra => ULTRA_RECONCILE_INTERVAL,
        }
    }
}

impl Default for ModePowerPolicy {
    fn default() -> Self {
        Self::new(SystemMode::default())
    }
}

impl PowerPolicy for ModePowerPolicy {
    fn mode(&self) -> SystemMode {
        *self.mode.read().unwrap_or_else(|e| e.into_inner())
    }

    fn reconcile_interval(&self) -> Duration {
        Self::interval_for(self.mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_follows_mode() {
        let policy = ModePowerPolicy::default();
        assert_eq!(policy.mode(), SystemMode::Normal);
        assert_eq!(policy.reconcile_interval(), Duration::from_millis(2000));

        policy.set_mode(SystemMode::Eco);
        assert_eq!(policy.mode(), SystemMode::Eco);
        assert_eq!(policy.reconcile_interval(), Duration::from_millis(5000));

        policy.set_mode(SystemMode::Ultra);
        assert_eq!(policy.reconcile_interval(), Duration::from_millis(500));
    }
}
