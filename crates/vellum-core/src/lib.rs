// SPDX-License-Identifier: MIT
//
// Vellum: core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::VellumError;
pub use types::*;
