//! SIPOC board
//!
//! Title, five column headers (suppliers, inputs, process, outputs,
//! customers) chained left to right, and one cell per non-empty entry.

use std::collections::BTreeMap;

use tracing::{debug, span, Level};

use super::board::{BoardColor, BoardConnector, BoardDiagram, BoardKind, BoardShape};
use super::model::{OrganizationHierarchy, Sipoc};
use crate::core::{HierarchyConfig, ProcessError};

pub const TITLE_HEIGHT: f64 = 50.0;
pub const HEADER_HEIGHT: f64 = 60.0;
pub const ORIGIN: (f64, f64) = (100.0, 100.0);

const COLUMNS: [(&str, &str, BoardColor); 5] = [
    ("suppliers", "SUPPLIERS", BoardColor::new("#E3F2FD", "#1976D2")),
    ("inputs", "INPUTS", BoardColor::new("#E8F5E9", "#388E3C")),
    ("process", "PROCESS", BoardColor::new("#FFF9C4", "#FBC02D")),
    ("outputs", "OUTPUTS", BoardColor::new("#FCE4EC", "#C2185B")),
    ("customers", "CUSTOMERS", BoardColor::new("#F3E5F5", "#7B1FA2")),
];
const HEADER_COLOR: BoardColor = BoardColor::new("#37474F", "#37474F");
const TITLE_COLOR: BoardColor = BoardColor::new("#263238", "#263238");
const FLOW_COLOR: &str = "#757575";

/// Lays out a SIPOC table as five columns
#[derive(Debug, Clone)]
pub struct SipocLayout {
    column_width: f64,
    column_spacing: f64,
    row_height: f64,
    row_spacing: f64,
}

impl Default for SipocLayout {
    fn default() -> Self {
        Self {
            column_width: 200.0,
            column_spacing: 30.0,
            row_height: 50.0,
            row_spacing: 10.0,
        }
    }
}

impl SipocLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes from the `[hierarchy]` configuration section
    pub fn from_config(config: &HierarchyConfig) -> Self {
        Self::new()
            .with_column_width(config.sipoc_column_width)
            .with_column_spacing(config.sipoc_column_spacing)
            .with_row_height(config.sipoc_row_height)
    }

    pub fn with_column_width(mut self, width: f64) -> Self {
        self.column_width = width;
        self
    }

    pub fn with_column_spacing(mut self, spacing: f64) -> Self {
        self.column_spacing = spacing;
        self
    }

    pub fn with_row_height(mut self, height: f64) -> Self {
        self.row_height = height;
        self
    }

    /// Lay out the SIPOC of one macroprocess, titled with its name
    pub fn layout_macroprocess(
        &self,
        hierarchy: &OrganizationHierarchy,
        macroprocess_id: &str,
    ) -> Result<BoardDiagram, ProcessError> {
        hierarchy.validate()?;
        let macroprocess = hierarchy.macroprocess(macroprocess_id).ok_or_else(|| {
            ProcessError::invalid_hierarchy(macroprocess_id, "unknown macroprocess")
        })?;
        let sipoc = macroprocess.sipoc.as_ref().ok_or_else(|| {
            ProcessError::invalid_hierarchy(macroprocess_id, "macroprocess has no SIPOC")
        })?;
        let mut diagram = self.layout(sipoc, &format!("SIPOC - {}", macroprocess.name))?;
        diagram.description = macroprocess.description.clone();
        diagram
            .metadata
            .insert("macroprocess_id".to_string(), macroprocess.id.clone());
        Ok(diagram)
    }

    pub fn layout(&self, sipoc: &Sipoc, title: &str) -> Result<BoardDiagram, ProcessError> {
        let span = span!(Level::INFO, "layout_sipoc", title = %title);
        let _enter = span.enter();

        if !(self.column_width > 0.0) || !(self.row_height > 0.0) {
            return Err(ProcessError::config_error(format!(
                "SIPOC column width and row height must be positive, got {} and {}",
                self.column_width, self.row_height
            )));
        }
        if !(self.column_spacing >= 0.0) {
            return Err(ProcessError::config_error(format!(
                "SIPOC column spacing must be non-negative, got {}",
                self.column_spacing
            )));
        }

        let columns = sipoc.columns();
        let rows = columns.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let pitch_x = self.column_width + self.column_spacing;
        let pitch_y = self.row_height + self.row_spacing;
        let total_width = COLUMNS.len() as f64 * pitch_x - self.column_spacing;
        let column_x = |index: usize| ORIGIN.0 + index as f64 * pitch_x;

        let mut shapes = vec![BoardShape {
            id: "sipoc_title".to_string(),
            content: title.to_string(),
            x: ORIGIN.0,
            y: ORIGIN.1,
            width: total_width,
            height: TITLE_HEIGHT,
            color: TITLE_COLOR,
            font_size: 18,
            macroprocess_id: None,
        }];

        let header_y = ORIGIN.1 + TITLE_HEIGHT + 20.0;
        for (index, (key, header, _)) in COLUMNS.iter().enumerate() {
            shapes.push(BoardShape {
                id: format!("sipoc_header_{}", key),
                content: header.to_string(),
                x: column_x(index),
                y: header_y,
                width: self.column_width,
                height: HEADER_HEIGHT,
                color: HEADER_COLOR,
                font_size: 14,
                macroprocess_id: None,
            });
        }
        let connectors: Vec<BoardConnector> = shapes[1..]
            .windows(2)
            .map(|pair| BoardConnector::between(&pair[0], &pair[1], FLOW_COLOR))
            .collect();

        let cells_y = header_y + HEADER_HEIGHT + 10.0;
        for row in 0..rows {
            for (index, (key, _, color)) in COLUMNS.iter().enumerate() {
                let Some(content) = columns[index].get(row).map(|c| c.trim()) else {
                    continue;
                };
                if content.is_empty() {
                    continue;
                }
                shapes.push(BoardShape {
                    id: format!("sipoc_{}_{}", key, row),
                    content: content.to_string(),
                    x: column_x(index),
                    y: cells_y + row as f64 * pitch_y,
                    width: self.column_width,
                    height: self.row_height,
                    color: *color,
                    font_size: 11,
                    macroprocess_id: None,
                });
            }
        }
        debug!(rows, cells = shapes.len() - 1 - COLUMNS.len(), "SIPOC cells placed");

        Ok(BoardDiagram {
            kind: BoardKind::Sipoc,
            name: title.to_string(),
            description: String::new(),
            shapes,
            connectors,
            width: total_width + 2.0 * ORIGIN.0,
            height: TITLE_HEIGHT + HEADER_HEIGHT + rows as f64 * pitch_y + ORIGIN.1 + 50.0,
            metadata: BTreeMap::new(),
        })
    }
}
