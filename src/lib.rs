//! Emulator authz - authorization mediation for the GCP service emulators
//!
//! This library provides the policy document schema and validator, the
//! permission mediator, and principal propagation shared by every emulator.
//! It exposes all modules for testing purposes.

pub mod authz;
pub mod errors;
pub mod settings;
