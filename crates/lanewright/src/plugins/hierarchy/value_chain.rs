//! Value chain board
//!
//! A title bar, then one frame per band (primary, support, management)
//! stacked top to bottom. Macroprocesses sit side by side inside their
//! frame; the primary band is chained left to right.

use std::collections::BTreeMap;

use tracing::{debug, info, span, warn, Level};

use super::board::{BoardColor, BoardConnector, BoardDiagram, BoardKind, BoardShape};
use super::model::{Macroprocess, MacroprocessKind, OrganizationHierarchy, ValueChain};
use crate::core::{HierarchyConfig, ProcessError};

pub const FRAME_PADDING: f64 = 30.0;
pub const FRAME_HEADER_HEIGHT: f64 = 50.0;
pub const TITLE_HEIGHT: f64 = 60.0;
/// Distance from the top of the title to the first frame
pub const TITLE_ADVANCE: f64 = 80.0;
pub const ORIGIN: (f64, f64) = (100.0, 100.0);

const TITLE_COLOR: BoardColor = BoardColor::new("#37474F", "#37474F");
const HEADER_COLOR: BoardColor = BoardColor::new("#FAFAFA", "#9E9E9E");
const CHAIN_COLOR: &str = "#1976D2";

fn band_colors(kind: MacroprocessKind) -> (BoardColor, BoardColor) {
    match kind {
        MacroprocessKind::Primary => (
            BoardColor::new("#BBDEFB", "#1976D2"),
            BoardColor::new("#E3F2FD", "#1976D2"),
        ),
        MacroprocessKind::Support => (
            BoardColor::new("#C8E6C9", "#388E3C"),
            BoardColor::new("#E8F5E9", "#388E3C"),
        ),
        MacroprocessKind::Management => (
            BoardColor::new("#FFE0B2", "#F57C00"),
            BoardColor::new("#FFF3E0", "#F57C00"),
        ),
    }
}

fn band_title(kind: MacroprocessKind) -> &'static str {
    match kind {
        MacroprocessKind::Primary => "PRIMARY MACROPROCESSES",
        MacroprocessKind::Support => "SUPPORT MACROPROCESSES",
        MacroprocessKind::Management => "MANAGEMENT MACROPROCESSES",
    }
}

/// Lays out a value chain in three bands
#[derive(Debug, Clone)]
pub struct ValueChainLayout {
    macro_width: f64,
    macro_height: f64,
    spacing_x: f64,
    spacing_y: f64,
}

impl Default for ValueChainLayout {
    fn default() -> Self {
        Self {
            macro_width: 180.0,
            macro_height: 80.0,
            spacing_x: 40.0,
            spacing_y: 30.0,
        }
    }
}

impl ValueChainLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes from the `[hierarchy]` configuration section
    pub fn from_config(config: &HierarchyConfig) -> Self {
        Self::new()
            .with_macro_size(config.macro_width, config.macro_height)
            .with_spacing(config.macro_spacing_x, config.macro_spacing_y)
    }

    pub fn with_macro_size(mut self, width: f64, height: f64) -> Self {
        self.macro_width = width;
        self.macro_height = height;
        self
    }

    /// Gap between macroprocesses in a band, and between bands
    pub fn with_spacing(mut self, x: f64, y: f64) -> Self {
        self.spacing_x = x;
        self.spacing_y = y;
        self
    }

    /// Lay out the hierarchy's value chain
    pub fn layout_hierarchy(
        &self,
        hierarchy: &OrganizationHierarchy,
    ) -> Result<BoardDiagram, ProcessError> {
        hierarchy.validate()?;
        let chain = hierarchy.value_chain.as_ref().ok_or_else(|| {
            ProcessError::invalid_hierarchy("value chain", "hierarchy has no value chain")
        })?;
        self.layout(chain, &hierarchy.macroprocesses)
    }

    /// Lay out a value chain; band entries missing from `macroprocesses`
    /// are skipped
    pub fn layout(
        &self,
        chain: &ValueChain,
        macroprocesses: &BTreeMap<String, Macroprocess>,
    ) -> Result<BoardDiagram, ProcessError> {
        let span = span!(Level::INFO, "layout_value_chain", value_chain = %chain.id);
        let _enter = span.enter();

        for (name, value) in [
            ("macro_width", self.macro_width),
            ("macro_height", self.macro_height),
        ] {
            if !(value > 0.0) {
                return Err(ProcessError::config_error(format!(
                    "value chain {} must be positive, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("spacing_x", self.spacing_x), ("spacing_y", self.spacing_y)] {
            if !(value >= 0.0) {
                return Err(ProcessError::config_error(format!(
                    "value chain {} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        let bands: Vec<(MacroprocessKind, Vec<&Macroprocess>)> = MacroprocessKind::ALL
            .iter()
            .map(|&kind| {
                let members = chain
                    .band(kind)
                    .iter()
                    .filter_map(|id| {
                        let found = macroprocesses.get(id);
                        if found.is_none() {
                            warn!(macroprocess_id = %id, band = %kind, "Unknown macroprocess skipped");
                        }
                        found
                    })
                    .collect();
                (kind, members)
            })
            .collect();

        let widest = bands.iter().map(|(_, m)| m.len()).max().unwrap_or(0).max(1);
        let frame_width = widest as f64 * (self.macro_width + self.spacing_x) + 2.0 * FRAME_PADDING;
        let frame_height = self.macro_height + FRAME_HEADER_HEIGHT + 2.0 * FRAME_PADDING;
        let (x, mut y) = ORIGIN;

        let mut shapes = vec![BoardShape {
            id: "vc_title".to_string(),
            content: format!("VALUE CHAIN\n{}", chain.name),
            x,
            y,
            width: frame_width,
            height: TITLE_HEIGHT,
            color: TITLE_COLOR,
            font_size: 18,
            macroprocess_id: None,
        }];
        y += TITLE_ADVANCE;

        let mut connectors = Vec::new();
        for (kind, members) in &bands {
            let (frame_color, macro_color) = band_colors(*kind);
            let frame_id = format!("frame_{}", kind);
            shapes.push(BoardShape {
                id: frame_id.clone(),
                content: String::new(),
                x,
                y,
                width: frame_width,
                height: frame_height,
                color: frame_color,
                font_size: 12,
                macroprocess_id: None,
            });
            shapes.push(BoardShape {
                id: format!("{}_title", frame_id),
                content: band_title(*kind).to_string(),
                x: x + FRAME_PADDING,
                y: y + 10.0,
                width: frame_width - 2.0 * FRAME_PADDING,
                height: FRAME_HEADER_HEIGHT - 20.0,
                color: HEADER_COLOR,
                font_size: 14,
                macroprocess_id: None,
            });

            let first = shapes.len();
            for (index, macroprocess) in members.iter().enumerate() {
                shapes.push(BoardShape {
                    id: macroprocess.id.clone(),
                    content: macroprocess.name.clone(),
                    x: x + FRAME_PADDING + index as f64 * (self.macro_width + self.spacing_x),
                    y: y + FRAME_HEADER_HEIGHT + FRAME_PADDING,
                    width: self.macro_width,
                    height: self.macro_height,
                    color: macro_color,
                    font_size: 12,
                    macroprocess_id: Some(macroprocess.id.clone()),
                });
            }
            if *kind == MacroprocessKind::Primary {
                for pair in shapes[first..].windows(2) {
                    connectors.push(BoardConnector::between(&pair[0], &pair[1], CHAIN_COLOR));
                }
            }
            debug!(band = %kind, members = members.len(), "Band placed");
            y += frame_height + self.spacing_y;
        }

        let mut metadata = BTreeMap::new();
        let fields = [
            ("organization", &chain.organization),
            ("mission", &chain.mission),
            ("vision", &chain.vision),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                metadata.insert(key.to_string(), value.clone());
            }
        }

        let diagram = BoardDiagram {
            kind: BoardKind::ValueChain,
            name: chain.name.clone(),
            description: chain.description.clone(),
            shapes,
            connectors,
            width: frame_width + 2.0 * ORIGIN.0,
            height: y + 50.0,
            metadata,
        };
        info!(
            shapes = diagram.shapes.len(),
            connectors = diagram.connectors.len(),
            "Value chain laid out"
        );
        Ok(diagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> OrganizationHierarchy {
        let mut hierarchy = OrganizationHierarchy::default();
        let mut chain = ValueChain::new("VC", "Acme");
        chain.organization = Some("Acme Ltd".to_string());
        chain.primary_macroprocesses = vec!["sell".into(), "make".into(), "ship".into()];
        chain.support_macroprocesses = vec!["hr".into(), "ghost".into()];
        hierarchy.value_chain = Some(chain);
        for (id, name, kind) in [
            ("sell", "Sell", MacroprocessKind::Primary),
            ("make", "Make", MacroprocessKind::Primary),
            ("ship", "Ship", MacroprocessKind::Primary),
            ("hr", "People", MacroprocessKind::Support),
        ] {
            hierarchy.add_macroprocess(Macroprocess::new(id, name, kind));
        }
        hierarchy
    }

    #[test]
    fn test_frame_dimensions() {
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy()).unwrap();
        // 3 * (180 + 40) + 2 * 30
        let frame = diagram.shape("frame_primary").unwrap();
        assert_eq!(frame.width, 720.0);
        assert_eq!(frame.height, 190.0);
        assert_eq!((frame.x, frame.y), (100.0, 180.0));
        assert_eq!(diagram.shape("frame_support").unwrap().y, 400.0);
        assert_eq!(diagram.shape("frame_management").unwrap().y, 620.0);
        assert_eq!(diagram.width, 920.0);
        assert_eq!(diagram.height, 890.0);
    }

    #[test]
    fn test_macroprocess_positions() {
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy()).unwrap();
        let make = diagram.shape("make").unwrap();
        assert_eq!((make.x, make.y), (350.0, 260.0));
        assert_eq!((make.width, make.height), (180.0, 80.0));
        assert_eq!(make.macroprocess_id.as_deref(), Some("make"));
        assert_eq!(diagram.shape("hr").unwrap().y, 480.0);
        assert!(diagram.shape("ghost").is_none());
    }

    #[test]
    fn test_primary_band_is_chained() {
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy()).unwrap();
        let pairs: Vec<(&str, &str)> = diagram
            .connectors
            .iter()
            .map(|c| (c.source_id.as_str(), c.target_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("sell", "make"), ("make", "ship")]);
        let first = &diagram.connectors[0];
        assert_eq!(first.waypoints[0].x, 310.0);
        assert_eq!(first.waypoints[1].x, 350.0);
        assert_eq!(first.waypoints[0].y, first.waypoints[1].y);
    }

    #[test]
    fn test_macroprocesses_inside_their_frame() {
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy()).unwrap();
        let frame = diagram.shape("frame_primary").unwrap();
        for id in ["sell", "make", "ship"] {
            let shape = diagram.shape(id).unwrap();
            assert!(shape.x >= frame.x && shape.right() <= frame.right());
            assert!(shape.y >= frame.y && shape.bottom() <= frame.bottom());
        }
    }

    #[test]
    fn test_empty_chain_keeps_one_slot() {
        let mut hierarchy = OrganizationHierarchy::default();
        hierarchy.value_chain = Some(ValueChain::new("VC", "Empty"));
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy).unwrap();
        assert_eq!(diagram.shape("frame_primary").unwrap().width, 280.0);
        assert_eq!(diagram.shapes.len(), 7);
        assert!(diagram.connectors.is_empty());
    }

    #[test]
    fn test_metadata_and_title() {
        let diagram = ValueChainLayout::new().layout_hierarchy(&hierarchy()).unwrap();
        assert_eq!(diagram.kind, BoardKind::ValueChain);
        assert_eq!(diagram.shapes[0].content, "VALUE CHAIN\nAcme");
        assert_eq!(diagram.metadata.get("organization").map(String::as_str), Some("Acme Ltd"));
        assert!(!diagram.metadata.contains_key("mission"));
    }

    #[test]
    fn test_missing_value_chain() {
        let err = ValueChainLayout::new()
            .layout_hierarchy(&OrganizationHierarchy::default())
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_sizes_from_config() {
        let config = HierarchyConfig {
            macro_width: 100.0,
            macro_spacing_x: 20.0,
            ..HierarchyConfig::default()
        };
        let diagram = ValueChainLayout::from_config(&config)
            .layout_hierarchy(&hierarchy())
            .unwrap();
        // 3 * (100 + 20) + 2 * 30
        assert_eq!(diagram.shape("frame_primary").unwrap().width, 420.0);
        assert_eq!(diagram.shape("ship").unwrap().x, 370.0);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let err = ValueChainLayout::new()
            .with_macro_size(0.0, 80.0)
            .layout_hierarchy(&hierarchy())
            .unwrap_err();
        assert!(matches!(err, ProcessError::Config { .. }));

        let err = ValueChainLayout::new()
            .with_spacing(f64::NAN, 10.0)
            .layout_hierarchy(&hierarchy())
            .unwrap_err();
        assert!(err.to_string().contains("spacing_x"));
    }
}
