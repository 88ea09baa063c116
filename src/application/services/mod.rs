//! Service layer: contracts for remote and model adapters, index provisioning
//! and device selection.

mod device;
mod provisioner;
mod setup_service;

#[cfg(test)]
pub(crate) mod testing;

pub use device::select_device;
pub use provisioner::{ensure_index, ProvisionedIndex};
pub use setup_service::{
    ControlPlane, CreateOutcome, DenseEncoder, DeviceProbe, SparseEncoder, VectorIndex,
};
