//! Core layout trait for process positioning
//!
//! This trait defines the interface for arranging process elements on a
//! lane/column/row grid.

use anyhow::Result;

use super::Database;

/// Core trait for layout algorithms
///
/// # Example
/// ```
/// use lanewright::core::LayoutAlgorithm;
/// use lanewright::plugins::process::{ProcessDatabase, ProcessLayoutAlgorithm};
///
/// let db = ProcessDatabase::new();
/// let layout = ProcessLayoutAlgorithm::new();
/// assert_eq!(layout.name(), "swimlane-sugiyama");
/// assert!(layout.layout(&db).is_err());
/// ```
pub trait LayoutAlgorithm<D: Database>: Send + Sync {
    /// The output type of this layout algorithm
    type Output;

    /// Arrange elements in the database using this layout algorithm
    fn layout(&self, database: &D) -> Result<Self::Output>;

    /// Get the name of this layout algorithm
    fn name(&self) -> &'static str;

    /// Get the version of this layout algorithm
    fn version(&self) -> &'static str;
}
