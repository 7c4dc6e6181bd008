//! Plugin implementations
//!
//! `process` lays out swimlane diagrams, `hierarchy` lays out value chain
//! and SIPOC overview boards, `remote` publishes them and `orchestrator`
//! ties everything into a pipeline.

pub mod hierarchy;
pub mod orchestrator;
pub mod process;
pub mod remote;

pub use hierarchy::*;
pub use orchestrator::*;
pub use process::*;
pub use remote::*;
