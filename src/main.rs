//! Network Speed Tester - Main CLI Application
//!
//! Runs the latency, download and upload trials against a speed test
//! endpoint and prints one metric per line.

use clap::Parser;
use network_speed_tester::{app::App, cli::Cli, error::ErrorReporter};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}
