//! LAS-TRX Core - Domain models, run settings, and collaborator ports
//!
//! This crate contains the reference/transform configuration model, the error taxonomy, the
//! layered run settings, and the port definitions for point-cloud formats and coordinate
//! transformers, together with the LAS/LAZ format adapter.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod persist;
pub mod ports;

pub use error::{FileTransformError, LastrxError, Result};
