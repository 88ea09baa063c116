use tracing::{debug, info};

use super::DeviceProbe;
use crate::domain::{Device, SetupError};
use crate::settings::DevicePreference;

/// Resolve the compute device for model loading.
pub fn select_device(
    preference: DevicePreference,
    probe: &dyn DeviceProbe,
) -> Result<Device, SetupError> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Auto => {
            if probe.cuda_available() {
                Device::Cuda
            } else {
                debug!(
                    target: "pinecone_bootstrap::models",
                    "no CUDA device detected, falling back to CPU"
                );
                Device::Cpu
            }
        }
        DevicePreference::Cuda => {
            if !probe.cuda_available() {
                return Err(SetupError::model_load(
                    "CUDA was requested but no CUDA device is available",
                ));
            }
            Device::Cuda
        }
    };

    info!(
        target: "pinecone_bootstrap::models",
        device = %device,
        "compute device selected"
    );
    Ok(device)
}
