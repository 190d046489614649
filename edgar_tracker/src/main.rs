//! edgar_tracker — command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use edgar_tracker::app::run;
use edgar_tracker::output::list_output_ports;
use edgar_tracker::Cli;

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    // Already set only if an embedder installed a logger first.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn banner() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        EDGAR Tracker — motion to music over MIDI             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_ports {
        return match list_output_ports() {
            Ok(ports) if ports.is_empty() => {
                println!("No MIDI output ports found.");
                ExitCode::SUCCESS
            }
            Ok(ports) => {
                for (i, name) in ports.iter().enumerate() {
                    println!("  {}: {}", i, name);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let cfg = cli.to_config();
    let scale = match cfg.validate() {
        Ok(scale) => scale,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    banner();
    println!("  Scale: {}", scale);
    println!("  Keys:  {:?}", scale.pitches());
    println!();

    match run(&cfg, scale) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
