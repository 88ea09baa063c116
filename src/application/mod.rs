//! Application layer wiring DTOs and services for the setup pipeline.

pub mod dtos;
pub mod services;

pub use dtos::{SetupFailure, SetupReport};
pub use services::{ensure_index, select_device, ProvisionedIndex};
