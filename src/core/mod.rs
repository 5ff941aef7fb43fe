//! Core types and utilities shared by every pipeline phase

pub mod types;
pub mod error;
pub mod logging;
pub mod config;

pub use types::*;
pub use error::Error;
pub use config::{BakeConfig, RebakeConfig};
