//! Pipeline configuration
//!
//! One explicit [`PipelineConfig`] value carries every tunable of a run:
//! layout geometry, the retry schedule, and the remote service settings.
//! It is loaded from TOML (sections `[layout]`, `[hierarchy]`, `[retry]`,
//! `[canvas]`, `[tasks]`) and then patched from `LANEWRIGHT_*` environment
//! variables.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ProcessError;
use super::retry::RetryPolicy;

/// Config file looked up in the working directory when no path is given
pub const LOCAL_CONFIG_FILE: &str = "lanewright.toml";

pub const ENV_ICON_BASE_URL: &str = "LANEWRIGHT_ICON_BASE_URL";
pub const ENV_CANVAS_TOKEN: &str = "LANEWRIGHT_CANVAS_TOKEN";
pub const ENV_TASKS_TOKEN: &str = "LANEWRIGHT_TASKS_TOKEN";

/// Geometry and ordering knobs of the swimlane layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum height of one lane band
    pub lane_height: f64,
    /// Horizontal gap between two columns
    pub column_spacing: f64,
    pub margin_top: f64,
    pub margin_left: f64,
    /// Width of the actor label strip on the left of each lane
    pub lane_label_width: f64,
    /// Inner vertical padding of a lane band
    pub lane_padding: f64,
    /// X of the first column
    pub content_offset_x: f64,
    /// Vertical gap between stacked elements of one cell
    pub row_spacing: f64,
    /// Space reserved under events for their label
    pub label_below_height: f64,
    pub min_canvas_width: f64,
    pub min_canvas_height: f64,
    pub canvas_margin: f64,
    /// Public location of the icon library; icons are omitted when unset
    pub icon_base_url: Option<String>,
    /// Actor used for elements that carry none
    pub default_actor: Option<String>,
    /// Append declared actors without elements as empty lanes
    pub include_empty_lanes: bool,
    /// Upper bound on row ordering sweeps
    pub ordering_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_height: 200.0,
            column_spacing: 150.0,
            margin_top: 100.0,
            margin_left: 50.0,
            lane_label_width: 60.0,
            lane_padding: 20.0,
            content_offset_x: 250.0,
            row_spacing: 30.0,
            label_below_height: 40.0,
            min_canvas_width: 4000.0,
            min_canvas_height: 3000.0,
            canvas_margin: 100.0,
            icon_base_url: None,
            default_actor: None,
            include_empty_lanes: false,
            ordering_passes: 4,
        }
    }
}

impl LayoutConfig {
    /// Reject values that would produce overlapping or inverted geometry
    pub fn validate(&self) -> Result<(), ProcessError> {
        let non_negative = [
            ("column_spacing", self.column_spacing),
            ("margin_top", self.margin_top),
            ("margin_left", self.margin_left),
            ("lane_label_width", self.lane_label_width),
            ("lane_padding", self.lane_padding),
            ("content_offset_x", self.content_offset_x),
            ("row_spacing", self.row_spacing),
            ("label_below_height", self.label_below_height),
            ("canvas_margin", self.canvas_margin),
            ("min_canvas_width", self.min_canvas_width),
            ("min_canvas_height", self.min_canvas_height),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ProcessError::config_error(format!(
                    "layout.{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if !(self.lane_height > 0.0) {
            return Err(ProcessError::config_error(format!(
                "layout.lane_height must be positive, got {}",
                self.lane_height
            )));
        }
        Ok(())
    }
}

/// Sizes of the value chain and SIPOC overview boards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub macro_width: f64,
    pub macro_height: f64,
    /// Gap between macroprocesses of one band
    pub macro_spacing_x: f64,
    /// Gap between bands
    pub macro_spacing_y: f64,
    pub sipoc_column_width: f64,
    pub sipoc_column_spacing: f64,
    pub sipoc_row_height: f64,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            macro_width: 180.0,
            macro_height: 80.0,
            macro_spacing_x: 40.0,
            macro_spacing_y: 30.0,
            sipoc_column_width: 200.0,
            sipoc_column_spacing: 30.0,
            sipoc_row_height: 50.0,
        }
    }
}

impl HierarchyConfig {
    pub fn validate(&self) -> Result<(), ProcessError> {
        let positive = [
            ("macro_width", self.macro_width),
            ("macro_height", self.macro_height),
            ("sipoc_column_width", self.sipoc_column_width),
            ("sipoc_row_height", self.sipoc_row_height),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ProcessError::config_error(format!(
                    "hierarchy.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("macro_spacing_x", self.macro_spacing_x),
            ("macro_spacing_y", self.macro_spacing_y),
            ("sipoc_column_spacing", self.sipoc_column_spacing),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ProcessError::config_error(format!(
                    "hierarchy.{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Whiteboard service settings
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Prefix added to every board name
    pub board_prefix: Option<String>,
    /// Team or workspace the boards are created in
    pub team_id: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl fmt::Debug for CanvasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasConfig")
            .field("board_prefix", &self.board_prefix)
            .field("team_id", &self.team_id)
            .field("token", &redacted(&self.token))
            .finish()
    }
}

/// Task service settings
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// List the tasks are created in
    pub list_id: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("list_id", &self.list_id)
            .field("token", &redacted(&self.token))
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[redacted]",
        None => "None",
    }
}

/// Complete configuration of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layout: LayoutConfig,
    pub hierarchy: HierarchyConfig,
    pub retry: RetryPolicy,
    pub canvas: CanvasConfig,
    pub tasks: TaskConfig,
}

impl PipelineConfig {
    /// Parse a TOML document; missing sections and keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ProcessError> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| ProcessError::config_error(format!("invalid TOML: {}", e)))?;
        config.layout.validate()?;
        config.hierarchy.validate()?;
        Ok(config)
    }

    /// Render as TOML (credentials are never written)
    pub fn to_toml_string(&self) -> Result<String, ProcessError> {
        toml::to_string(self).map_err(|e| ProcessError::config_error(e.to_string()))
    }

    /// Apply `LANEWRIGHT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ICON_BASE_URL).filter(|v| !v.is_empty()) {
            debug!(icon_base_url = %url, "icon base URL overridden from environment");
            self.layout.icon_base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_CANVAS_TOKEN).filter(|v| !v.is_empty()) {
            debug!("canvas token taken from environment");
            self.canvas.token = Some(token);
        }
        if let Some(token) = lookup(ENV_TASKS_TOKEN).filter(|v| !v.is_empty()) {
            debug!("tasks token taken from environment");
            self.tasks.token = Some(token);
        }
    }
}

/// Find and load configuration
///
/// Search order:
/// 1. Explicit path if provided (must exist)
/// 2. `lanewright.toml` in the working directory
/// 3. Defaults
///
/// Environment overrides are applied last.
pub fn load_config(explicit_path: Option<&Path>) -> Result<PipelineConfig, ProcessError> {
    let mut config = if let Some(path) = explicit_path {
        info!(path = %path.display(), "Loading configuration from explicit path");
        load_config_file(path)?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        info!(path = LOCAL_CONFIG_FILE, "Loading configuration from local path");
        load_config_file(Path::new(LOCAL_CONFIG_FILE))?
    } else {
        debug!("No configuration file found, using default configuration");
        PipelineConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<PipelineConfig, ProcessError> {
    if !path.exists() {
        return Err(missing_file(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    PipelineConfig::from_toml_str(&content)
}

fn missing_file(path: PathBuf) -> ProcessError {
    ProcessError::config_error(format!("missing configuration file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_layout_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.lane_height, 200.0);
        assert_eq!(config.column_spacing, 150.0);
        assert_eq!(config.content_offset_x, 250.0);
        assert_eq!(config.min_canvas_width, 4000.0);
        assert_eq!(config.ordering_passes, 4);
        assert!(config.icon_base_url.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [layout]
            lane_height = 260.0
            default_actor = "Operations"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.lane_height, 260.0);
        assert_eq!(config.layout.default_actor.as_deref(), Some("Operations"));
        assert_eq!(config.layout.column_spacing, 150.0);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 500);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = PipelineConfig::from_toml_str("[layout\nlane_height = ").unwrap_err();
        assert!(matches!(err, ProcessError::Config { .. }));
    }

    #[test]
    fn test_validation_rejects_zero_lane_height() {
        let err = PipelineConfig::from_toml_str("[layout]\nlane_height = 0.0").unwrap_err();
        assert!(err.to_string().contains("lane_height"));
    }

    #[test]
    fn test_hierarchy_section() {
        let config = PipelineConfig::from_toml_str("[hierarchy]\nmacro_width = 220.0").unwrap();
        assert_eq!(config.hierarchy.macro_width, 220.0);
        assert_eq!(config.hierarchy.sipoc_column_width, 200.0);

        let err = PipelineConfig::from_toml_str("[hierarchy]\nmacro_spacing_y = -5.0").unwrap_err();
        assert!(err.to_string().contains("hierarchy.macro_spacing_y"));
    }

    #[test]
    fn test_layout_validation_covers_canvas_minimums() {
        let config = LayoutConfig {
            min_canvas_width: -1.0,
            ..LayoutConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_canvas_width"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_ICON_BASE_URL, "https://icons.example.com/lib/"),
            (ENV_CANVAS_TOKEN, "canvas-secret"),
            (ENV_TASKS_TOKEN, ""),
        ]
        .into_iter()
        .collect();
        let mut config = PipelineConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(
            config.layout.icon_base_url.as_deref(),
            Some("https://icons.example.com/lib/")
        );
        assert_eq!(config.canvas.token.as_deref(), Some("canvas-secret"));
        assert!(config.tasks.token.is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let mut config = PipelineConfig::default();
        config.canvas.token = Some("canvas-secret".to_string());
        config.tasks.token = Some("tasks-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("canvas-secret"));
        assert!(!rendered.contains("tasks-secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_tokens_not_serialized() {
        let mut config = PipelineConfig::default();
        config.canvas.token = Some("canvas-secret".to_string());
        let toml = config.to_toml_string().unwrap();
        assert!(!toml.contains("canvas-secret"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("missing configuration file"));
    }
}
