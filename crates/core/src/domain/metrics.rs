// Resource metrics snapshot

use serde::{Deserialize, Serialize};

const GIB: u64 = 1024 * 1024 * 1024;

/// GPU memory usage in MB. Zero/zero means "unknown or no GPU".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VramUsage {
    pub used_mb: u64,
    pub total_mb: u64,
}

impl VramUsage {
    pub fn new(used_mb: u64, total_mb: u64) -> Self {
        Self { used_mb, total_mb }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Immutable host snapshot. Always replaced as a whole, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub cpu_load_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub vram_used_mb: u64,
    pub vram_total_mb: u64,
}

impl ResourceMetrics {
    /// Fraction of RAM in use (0.0 - 1.0). Returns 0.0 when the total is unknown.
    pub fn ram_usage_ratio(&self) -> f64 {
        if self.ram_total_bytes == 0 {
            return 0.0;
        }
        self.ram_used_bytes as f64 / self.ram_total_bytes as f64
    }

    pub fn ram_usage_percent(&self) -> f64 {
        self.ram_usage_ratio() * 100.0
    }

    /// Degraded snapshot handed out when real sampling fails
    pub fn simulated() -> Self {
        Self {
            cpu_load_percent: 40.0,
            ram_used_bytes: 8 * GIB,
            ram_total_bytes: 16 * GIB,
            vram_used_mb: 2048,
            vram_total_mb: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_ratio() {
        let metrics = ResourceMetrics {
            cpu_load_percent: 10.0,
            ram_used_bytes: 3,
            ram_total_bytes: 4,
            vram_used_mb: 0,
            vram_total_mb: 0,
        };
        assert!((metrics.ram_usage_ratio() - 0.75).abs() < f64::EPSILON);
        assert!((metrics.ram_usage_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_ram_ratio_unknown_total() {
        let metrics = ResourceMetrics {
            ram_total_bytes: 0,
            ..ResourceMetrics::simulated()
        };
        assert_eq!(metrics.ram_usage_ratio(), 0.0);
    }

    #[test]
    fn test_simulated_snapshot_is_half_full() {
        let metrics = ResourceMetrics::simulated();
        assert!((metrics.ram_usage_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(metrics.vram_total_mb, 4096);
    }
}
