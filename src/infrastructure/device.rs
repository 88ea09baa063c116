//! CUDA detection for the model loader.

use std::path::Path;

use tracing::debug;

use crate::application::services::DeviceProbe;

const NVIDIA_DRIVER_VERSION: &str = "/proc/driver/nvidia/version";

/// Probe that inspects the host for a usable NVIDIA GPU.
///
/// `CUDA_VISIBLE_DEVICES` set to an empty string or `-1` hides every device,
/// as it does for the CUDA runtime itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDeviceProbe;

impl SystemDeviceProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceProbe for SystemDeviceProbe {
    fn cuda_available(&self) -> bool {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        if devices_hidden(visible.as_deref()) {
            debug!(
                target: "pinecone_bootstrap::models",
                "CUDA_VISIBLE_DEVICES hides all GPUs"
            );
            return false;
        }

        let driver = Path::new(NVIDIA_DRIVER_VERSION).exists();
        let smi = which::which("nvidia-smi").is_ok();
        debug!(
            target: "pinecone_bootstrap::models",
            driver,
            smi,
            "probed for CUDA"
        );
        driver || smi
    }
}

fn devices_hidden(visible: Option<&str>) -> bool {
    matches!(visible.map(str::trim), Some("") | Some("-1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_negative_visibility_hides_devices() {
        assert!(devices_hidden(Some("")));
        assert!(devices_hidden(Some(" -1 ")));
        assert!(!devices_hidden(Some("0,1")));
        assert!(!devices_hidden(None));
    }
}
