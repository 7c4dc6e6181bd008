//! Command-line interface for the lanewright utility
//!
//! Lays out process documents as swimlane diagrams and previews what
//! publishing them would send to the remote services. Hierarchy
//! documents get value chain and SIPOC overview boards.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use lanewright::core::logging::init_logging;
use lanewright::core::{load_config, Clock, NoJitter, PipelineConfig, Process};
use lanewright::plugins::{
    BoardDiagram, Diagram, OrganizationHierarchy, Pipeline, RecordingCanvas, RecordingTaskClient,
};

/// Lanewright - Lay out business processes as swimlane diagrams
#[derive(Parser)]
#[command(name = "lanewright")]
#[command(about = "Lay out business process documents as swimlane diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./lanewright.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Output formats of the layout command
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Full diagram geometry as JSON
    #[default]
    Json,
    /// Short human-readable summary
    Summary,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the swimlane layout of a process document
    Layout {
        /// Input JSON process document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Base URL for element icons
        #[arg(long)]
        icon_base_url: Option<String>,
    },

    /// Report validation errors and warnings
    Validate {
        /// Input JSON process document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the lane order and lane contents
    Lanes {
        /// Input JSON process document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Dry-run publishing and print the remote call log as JSON
    Plan {
        /// Input JSON process document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Lay out the value chain board of a hierarchy document
    ValueChain {
        /// Input JSON hierarchy document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the dry-run call log instead of the board geometry
        #[arg(long)]
        plan: bool,
    },

    /// Lay out the SIPOC board of one macroprocess
    Sipoc {
        /// Input JSON hierarchy document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Macroprocess ID
        #[arg(short, long)]
        macroprocess: String,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the dry-run call log instead of the board geometry
        #[arg(long)]
        plan: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Clock that never waits; dry runs have nothing to wait for
struct DryRunClock;

impl Clock for DryRunClock {
    fn sleep(&self, _duration: Duration) {}
}

/// Main CLI application
#[derive(Default)]
pub struct LanewrightApp {
    pipeline: Pipeline,
}

impl LanewrightApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new application instance with an explicit configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            pipeline: Pipeline::new(config),
        }
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over CLI flags
        let log_level_str = std::env::var("LANEWRIGHT_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("LANEWRIGHT_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Lanewright v{}", env!("CARGO_PKG_VERSION"));
        }

        let config = load_config(cli.config.as_deref())?;
        self.pipeline = Pipeline::new(config);

        match cli.command {
            Commands::Layout {
                input,
                output,
                format,
                icon_base_url,
            } => self.layout_command(input, output, format, icon_base_url, cli.verbose),
            Commands::Validate { input } => self.validate_command(input, cli.verbose),
            Commands::Lanes { input, json } => self.lanes_command(input, json, cli.verbose),
            Commands::Plan { input, output } => self.plan_command(input, output, cli.verbose),
            Commands::ValueChain {
                input,
                output,
                plan,
            } => {
                let hierarchy = self.read_hierarchy(input, cli.verbose)?;
                let board = self.pipeline.value_chain(&hierarchy)?;
                self.board_command(&board, output, plan)
            }
            Commands::Sipoc {
                input,
                macroprocess,
                output,
                plan,
            } => {
                let hierarchy = self.read_hierarchy(input, cli.verbose)?;
                let board = self.pipeline.sipoc(&hierarchy, &macroprocess)?;
                self.board_command(&board, output, plan)
            }
            Commands::Config => self.config_command(),
        }
    }

    /// Handle the layout command
    fn layout_command(
        &mut self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        format: OutputFormat,
        icon_base_url: Option<String>,
        verbose: bool,
    ) -> Result<()> {
        let process = self.read_process(input, verbose)?;

        if let Some(url) = icon_base_url {
            let mut config = self.pipeline.config().clone();
            config.layout.icon_base_url = Some(url);
            self.pipeline = Pipeline::new(config);
        }

        let diagram = self.pipeline.layout(&process)?;
        if verbose {
            eprintln!(
                "Laid out {} elements in {} lanes",
                diagram.elements.len(),
                diagram.lanes.len()
            );
        }

        let rendered = match format {
            OutputFormat::Json => serde_json::to_string_pretty(&diagram)?,
            OutputFormat::Summary => summarize(&diagram),
        };
        self.write_output(output, &rendered)
    }

    /// Handle the validate command
    fn validate_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let process = self.read_process(input, verbose)?;
        let report = self.pipeline.validate(&process);

        for warning in &report.warnings {
            println!("warning: {}", warning);
        }
        for error in &report.errors {
            println!("error: {}", error);
        }

        if report.is_valid() {
            println!(
                "✓ Valid process '{}' ({} warnings)",
                process.name,
                report.warnings.len()
            );
            Ok(())
        } else {
            println!(
                "✗ Invalid process '{}' ({} errors)",
                process.name,
                report.errors.len()
            );
            Err(anyhow!("{} validation errors", report.errors.len()))
        }
    }

    /// Handle the lanes command
    fn lanes_command(&self, input: Option<PathBuf>, json: bool, verbose: bool) -> Result<()> {
        let process = self.read_process(input, verbose)?;
        let lanes = self.pipeline.lanes(&process)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&lanes)?);
        } else {
            for lane in &lanes {
                println!("{}. {}: {}", lane.index + 1, lane.actor, lane.elements.join(", "));
            }
        }
        Ok(())
    }

    /// Handle the plan command
    fn plan_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        verbose: bool,
    ) -> Result<()> {
        let process = self.read_process(input, verbose)?;
        let plan = self.plan(&process)?;
        self.write_output(output, &serde_json::to_string_pretty(&plan)?)
    }

    /// Publish into recording clients and return their call logs
    pub fn plan(&self, process: &Process) -> Result<serde_json::Value> {
        let mut publisher = self
            .pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(DryRunClock)
            .with_jitter(NoJitter);

        let report = self.pipeline.run(process, &mut publisher)?;
        let (canvas, tasks) = publisher.into_clients();

        Ok(serde_json::json!({
            "process": process.name,
            "report": report,
            "canvas_calls": canvas.calls(),
            "task_calls": tasks.calls(),
        }))
    }

    /// Write a laid out board, or its dry-run call log
    fn board_command(
        &self,
        board: &BoardDiagram,
        output: Option<PathBuf>,
        plan: bool,
    ) -> Result<()> {
        let rendered = if plan {
            serde_json::to_string_pretty(&self.plan_board(board)?)?
        } else {
            serde_json::to_string_pretty(board)?
        };
        self.write_output(output, &rendered)
    }

    /// Publish a board into a recording canvas and return its call log
    pub fn plan_board(&self, board: &BoardDiagram) -> Result<serde_json::Value> {
        let mut publisher = self
            .pipeline
            .publisher(RecordingCanvas::new(), RecordingTaskClient::new())
            .with_clock(DryRunClock)
            .with_jitter(NoJitter);

        let report = publisher.publish_board(board)?;
        let (canvas, _) = publisher.into_clients();

        Ok(serde_json::json!({
            "board": board.name,
            "report": report,
            "canvas_calls": canvas.calls(),
        }))
    }

    /// Handle the config command
    fn config_command(&self) -> Result<()> {
        print!("{}", self.pipeline.config().to_toml_string()?);
        io::stdout().flush()?;
        Ok(())
    }

    fn read_process(&self, input: Option<PathBuf>, verbose: bool) -> Result<Process> {
        let content = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }
        Process::from_json(&content).map_err(|e| anyhow!("Invalid process document: {}", e))
    }

    fn read_hierarchy(&self, input: Option<PathBuf>, verbose: bool) -> Result<OrganizationHierarchy> {
        let content = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }
        OrganizationHierarchy::from_json(&content)
            .map_err(|e| anyhow!("Invalid hierarchy document: {}", e))
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                if content.is_empty() || content.ends_with('\n') {
                    print!("{}", content);
                } else {
                    println!("{}", content);
                }
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Get a reference to the pipeline (for testing)
    #[cfg(test)]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Human-readable summary of a laid out diagram
pub fn summarize(diagram: &Diagram) -> String {
    let mut out = String::new();
    let reversed = diagram.connectors.iter().filter(|c| c.reverse).count();

    let _ = writeln!(out, "Process: {}", diagram.name);
    let _ = writeln!(out, "Canvas: {} x {}", diagram.width, diagram.height);
    let _ = writeln!(out, "Lanes:");
    for lane in &diagram.lanes {
        let mut members: Vec<_> = diagram
            .elements
            .iter()
            .filter(|e| e.lane == lane.index)
            .collect();
        members.sort_by_key(|e| (e.column, e.row));
        let ids: Vec<&str> = members.iter().map(|e| e.element_id.as_str()).collect();
        let _ = writeln!(out, "  {} {}: {}", lane.index + 1, lane.actor, ids.join(", "));
    }
    let _ = writeln!(
        out,
        "Connectors: {} ({} reversed)",
        diagram.connectors.len(),
        reversed
    );
    out
}
