// Resource Arbiter Infrastructure - System Adapters
// Implements: HostProbe, CommandRunner, GpuProbe

pub mod gpu;
pub mod host_probe_impl;
pub mod subprocess_runner;

pub use gpu::{GpuMonitor, GpuVendor};
pub use host_probe_impl::SysinfoHostProbe;
pub use subprocess_runner::SubprocessCommandRunner;
