//! Core abstractions for process diagrams
//!
//! This module defines the element model, the storage and layout traits a
//! diagram plugin implements, and the shared ambient pieces (errors,
//! configuration, retry, logging).

pub mod config;
mod database;
mod error;
mod layout;
pub mod logging;
pub mod retry;
mod types;

pub use config::*;
pub use database::*;
pub use error::*;
pub use layout::*;
pub use logging::*;
pub use retry::*;
pub use types::*;
