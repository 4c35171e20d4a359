//! Hub Latency Tester - Main CLI Application
//!
//! Drives producers and consumers against a broadcast hub and prints
//! per-worker counts and latency statistics when the run ends.

use clap::Parser;
use hub_latency_tester::{
    app::{interrupt_signal, App},
    cli::Cli,
    error::{AppError, Result},
};
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if cli.should_show_topic_help() {
        println!("{}", cli.display_help());
        return;
    }

    let use_colors = cli.use_colors();
    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_colors));

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }

    // The Ctrl-C listener and the stdin thread must not outlive the report
    process::exit(0);
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let app = App::new(cli)?;
    let config = app.config();

    if config.debug {
        eprintln!("{}", app.debug_banner());
        eprintln!();
    }

    let warnings = app.warnings()?;
    if !warnings.is_empty() {
        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }
        eprintln!();
    }

    if !config.json_output && config.target_count.is_none() && config.duration_secs.is_none() {
        eprintln!("Running against {}; press Enter or Ctrl-C to stop.", config.endpoint);
    }

    let results = app.execute(interrupt_signal()).await?;
    println!("{}", app.render(&results)?);

    app.check_outcome(&results)
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Transport must be auto, long-poll, server-push-stream or full-duplex-socket");
            eprintln!("  - Display unit must be ticks, seconds, milliseconds or microseconds");
            eprintln!("  - Endpoint must be 'local' or an http(s):// or ws(s):// URL");
            eprintln!("  - Check HUB_* variables and your .env file (hlt --help-topic env)");
        }
        AppError::Connection(_) | AppError::Protocol(_) => {
            eprintln!();
            eprintln!("Connection troubleshooting:");
            eprintln!("  - Check that the hub is running and reachable at the endpoint");
            eprintln!("  - Try a different transport with --transport");
            eprintln!("  - Use --endpoint local to test the harness without a hub");
        }
        AppError::Execution(_) | AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Execution troubleshooting:");
            eprintln!("  - Increase the send timeout with --send-timeout");
            eprintln!("  - Reduce --producers, --consumers or --frequency");
            eprintln!("  - Run with --verbose to see per-worker logs");
        }
        _ => {}
    }
}
