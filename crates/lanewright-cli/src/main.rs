//! Lanewright CLI - Lay out business processes as swimlane diagrams

mod cli;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    // Logging is initialized inside run() once flags and environment are known
    let mut app = cli::LanewrightApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
