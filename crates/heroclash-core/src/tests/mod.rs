//! Test module for end-to-end battles and invariant properties.
//!
//! - `helpers.rs`: scripted collaborators and registry factories
//! - `integration.rs`: full battles through the registry surface
//! - `properties.rs`: proptest invariants over the core pipeline

mod helpers;
mod integration;

pub use helpers::*;
