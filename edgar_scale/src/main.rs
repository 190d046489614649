//! Print the pitch array a tracker session would play, column by column.

use clap::Parser;
use edgar_scale::{note_name, ScaleBuilder, NAMED_PATTERNS};
use std::process::ExitCode;

/// Show the scale built from a keynote, an octave count and a pattern.
#[derive(Parser)]
#[command(name = "scale_print", version, about)]
struct Args {
    /// Central keynote, e.g. C4, F#3, Bb2
    #[arg(short, long, default_value = "C4")]
    keynote: String,

    /// Number of octaves to span
    #[arg(short, long, default_value_t = 3)]
    octaves: u32,

    /// Scale name or literal T/S pattern (e.g. 'TTSTTTS')
    #[arg(short, long, default_value = "superlocrian")]
    scale: String,

    /// List the known scale names and exit
    #[arg(long)]
    names: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.names {
        for (name, literal) in NAMED_PATTERNS {
            println!("  {:<14} {}", name, literal);
        }
        return ExitCode::SUCCESS;
    }

    let scale = match ScaleBuilder::new()
        .keynote(&args.keynote)
        .octaves(args.octaves)
        .pattern(&args.scale)
        .build()
    {
        Ok(s)  => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!();
    println!("  ┌─ {}", scale);
    println!("  │");
    println!("  │  index  midi  note");
    for (i, &p) in scale.pitches().iter().enumerate() {
        let flag = if (0..=edgar_scale::MIDI_MAX).contains(&p) { "" } else { "  (outside MIDI range)" };
        println!("  │  {:>5}  {:>4}  {:<4}{}", i, p, note_name(p), flag);
    }
    println!("  └─");
    println!();

    ExitCode::SUCCESS
}
