// Power policy port - supplies the operating mode and reconciliation cadence
use crate::domain::SystemMode;
use std::time::Duration;

pub trait PowerPolicy: Send + Sync {
    /// Current operating mode
    fn mode(&self) -> SystemMode;

    /// How often the arbiter's reconciliation loop ticks
    fn reconcile_interval(&self) -> Duration;
}
