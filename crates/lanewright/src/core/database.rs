//! Core database trait for process data storage
//!
//! This trait defines the interface for storing and managing process data.
//! A diagram plugin implements it with its own element and flow types.

use anyhow::Result;

/// Core trait for process databases
///
/// The associated types allow each plugin to define its own element and
/// flow structures with plugin-specific metadata.
pub trait Database: Send + Sync {
    /// The element data type for this database
    type Element: Clone + Send + Sync;

    /// The flow data type for this database
    type Flow: Clone + Send + Sync;

    /// Add an element to the database
    fn add_element(&mut self, element: Self::Element) -> Result<()>;

    /// Add a flow to the database
    fn add_flow(&mut self, flow: Self::Flow) -> Result<()>;

    /// Get an element by ID
    fn get_element(&self, id: &str) -> Option<&Self::Element>;

    /// Iterate over all elements in insertion order
    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    /// Iterate over all flows in insertion order
    fn flows(&self) -> impl Iterator<Item = &Self::Flow>;

    /// Clear all data from the database
    fn clear(&mut self);

    /// Get the number of elements
    fn element_count(&self) -> usize;

    /// Get the number of flows
    fn flow_count(&self) -> usize;
}
