//! Generation capability: device selection, prompts, the inference client
//! and the serializer that keeps it single-flight.

pub mod device;
pub mod exclusive;
pub mod http;
pub mod prompt;

pub use device::{select_device, ComputeDevice, DeviceProbe, Precision, SystemProbe};
pub use exclusive::ExclusiveAccess;
pub use http::DiffusionClient;
pub use prompt::PromptTemplate;

use crate::config::GenerationConfig;
use crate::error::Result;

/// Pick a device and build the inference client bound to it
pub fn initialize(config: &GenerationConfig, probe: &dyn DeviceProbe) -> Result<DiffusionClient> {
    let device = select_device(&config.devices, probe);
    DiffusionClient::new(config.clone(), device)
}
