// Arbiter constants (no magic values)
use std::time::Duration;

/// RAM usage above which non-critical requests are queued (85%)
pub const MAX_RAM_RATIO: f64 = 0.85;

/// CPU load above which non-critical requests are queued (percent)
pub const MAX_CPU_PERCENT: f32 = 98.0;

/// CRITICAL requests bypass the queue until RAM reaches this ratio (98%)
pub const CRITICAL_RAM_CEILING: f64 = 0.98;

/// Startup grace period: metrics are unreliable while subsystems warm up
pub const STARTUP_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// How long a metrics snapshot stays valid
pub const METRICS_CACHE_TTL: Duration = Duration::from_secs(2);

/// Hard timeout on every external metrics command
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconciliation interval per mode
pub const ECO_RECONCILE_INTERVAL: Duration = Duration::from_millis(5000);
pub const NORMAL_RECONCILE_INTERVAL: Duration = Duration::from_millis(2000);
pub const HIGH_RECONCILE_INTERVAL: Duration = Duration::from_millis(1000);
pub const ULTRA_RECONCILE_INTERVAL: Duration = Duration::from_millis(500);

/// Default cadence of the periodic pruning sweep
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(30);
