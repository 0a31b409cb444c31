// AMD VRAM via rocm-smi (JSON first, text fallback)

use super::{GpuVendor, VramProvider};
use arbiter_core::domain::VramUsage;
use arbiter_core::port::CommandRunner;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// Key spellings differ between rocm-smi releases
const USED_KEYS: &[&str] = &["VRAM Use (MB)", "vram_used"];
const TOTAL_KEYS: &[&str] = &["VRAM Total (MB)", "vram_total"];

pub struct AmdVram {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl AmdVram {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    async fn query_json(&self) -> Option<VramUsage> {
        let output = self
            .runner
            .run("rocm-smi", &["--showmemuse", "--json"], self.timeout)
            .await
            .map_err(|e| debug!(error = %e, "rocm-smi JSON query failed"))
            .ok()?;
        parse_memuse_json(&output.stdout)
    }

    async fn query_text(&self) -> Option<VramUsage> {
        let output = self
            .runner
            .run("rocm-smi", &["--showmeminfo", "vram"], self.timeout)
            .await
            .map_err(|e| debug!(error = %e, "rocm-smi meminfo query failed"))
            .ok()?;
        parse_meminfo_text(&output.stdout)
    }
}

/// Number or numeric string (leading digits) as MB
fn as_mb(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn first_key(card: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| card.get(*k).and_then(as_mb))
}

/// `{"card0": {"VRAM Use (MB)": "512", "VRAM Total (MB)": "8176"}, "card1": {...}}`
///
/// Summed across cards, matching the text and NVIDIA paths.
pub(crate) fn parse_memuse_json(stdout: &str) -> Option<VramUsage> {
    let data: Value = serde_json::from_str(stdout).ok()?;
    let mut usage = VramUsage::zero();

    for card in data.as_object()?.values() {
        let Some(total) = first_key(card, TOTAL_KEYS) else {
            continue;
        };
        usage.total_mb += total;
        usage.used_mb += first_key(card, USED_KEYS).unwrap_or(0);
    }
    (usage.total_mb > 0).then_some(usage)
}

fn last_number(line: &str) -> Option<u64> {
    line.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .last()
        .and_then(|s| s.parse().ok())
}

fn bytes_to_mb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

/// `GPU[0] : VRAM Total Memory (B): 8573157376`
/// `GPU[0] : VRAM Total Used Memory (B): 536870912`
pub(crate) fn parse_meminfo_text(stdout: &str) -> Option<VramUsage> {
    let mut usage = VramUsage::zero();
    for line in stdout.lines() {
        let Some(bytes) = last_number(line) else {
            continue;
        };
        if line.contains("Used") {
            usage.used_mb += bytes_to_mb(bytes);
        } else if line.contains("Total") {
            usage.total_mb += bytes_to_mb(bytes);
        }
    }
    (usage.total_mb > 0).then_some(usage)
}

#[async_trait]
impl VramProvider for AmdVram {
    fn vendor(&self) -> GpuVendor {
        GpuVendor::Amd
    }

    async fn query(&self) -> VramUsage {
        if let Some(usage) = self.query_json().await {
            return usage;
        }
        self.query_text().await.unwrap_or_else(VramUsage::zero)
    }
}
