//! Compute device selection
//!
//! The generation handle is bound to one device chosen at start-up from a
//! preference list. Availability is checked through [`DeviceProbe`] so the
//! fallback chain can be tested without hardware.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Mps,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float16,
    Float32,
}

impl ComputeDevice {
    /// Default order tried when nothing is configured
    pub const PREFERENCE: [ComputeDevice; 3] =
        [ComputeDevice::Cuda, ComputeDevice::Mps, ComputeDevice::Cpu];

    pub fn as_str(self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Mps => "mps",
            ComputeDevice::Cpu => "cpu",
        }
    }

    /// Half precision only pays off on CUDA
    pub fn precision(self) -> Precision {
        match self {
            ComputeDevice::Cuda => Precision::Float16,
            ComputeDevice::Mps | ComputeDevice::Cpu => Precision::Float32,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "GPU (CUDA)",
            ComputeDevice::Mps => "MPS (Apple Silicon)",
            ComputeDevice::Cpu => "CPU",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeDevice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Ok(ComputeDevice::Cuda),
            "mps" => Ok(ComputeDevice::Mps),
            "cpu" => Ok(ComputeDevice::Cpu),
            other => Err(format!("unknown compute device '{other}'")),
        }
    }
}

pub trait DeviceProbe: Send + Sync {
    fn is_available(&self, device: ComputeDevice) -> bool;
}

/// Probes the local machine
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn is_available(&self, device: ComputeDevice) -> bool {
        match device {
            ComputeDevice::Cuda => Path::new("/proc/driver/nvidia/version").exists(),
            ComputeDevice::Mps => cfg!(all(target_os = "macos", target_arch = "aarch64")),
            ComputeDevice::Cpu => true,
        }
    }
}

/// First available device in `preference`, or CPU
pub fn select_device(preference: &[ComputeDevice], probe: &dyn DeviceProbe) -> ComputeDevice {
    preference
        .iter()
        .copied()
        .find(|device| probe.is_available(*device))
        .unwrap_or(ComputeDevice::Cpu)
}
