mod cli;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // An interrupt ends the run cleanly with success status.
    if let Err(err) = ctrlc::set_handler(|| std::process::exit(0)) {
        debug!(%err, "could not install interrupt handler");
    }

    let options = cli::Cli::parse().into_options();
    match track_extract_lib::pipeline::run(&options) {
        Ok(outcome) => {
            for label in &outcome.listed {
                println!("{label}");
            }
            if let Some(path) = &outcome.output {
                println!("output file: {}", path.display());
            }
            if let Some(path) = &outcome.kml {
                println!("visualization file: {}", path.display());
            }
            0
        }
        Err(err) => {
            eprintln!("track-extract: {err}");
            2
        }
    }
}
