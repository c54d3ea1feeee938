//! CLI argument definitions for `rawmix`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("Rawmix")
        .version("0.1")
        .about("Mix and interleave headerless PCM audio")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Show debug output"),
        )
        .subcommand(
            Command::new("mix")
                .about("Mix the plan's inputs into a single output file")
                .arg(
                    Arg::new("PLAN")
                        .help("Path to a JSON mix plan")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("PATH")
                        .default_value("out.raw")
                        .help("Output path; .wav writes a WAV header, anything else raw frames"),
                )
                .arg(
                    Arg::new("live")
                        .long("live")
                        .action(ArgAction::SetTrue)
                        .help("Simulate a live session that pads missing audio with silence"),
                )
                .arg(
                    Arg::new("chunk-ms")
                        .long("chunk-ms")
                        .value_name("MS")
                        .help("Override the plan's chunk duration"),
                )
                .arg(
                    Arg::new("prevent-clipping")
                        .long("prevent-clipping")
                        .action(ArgAction::SetTrue)
                        .help("Scale overflowing waves into range instead of clamping"),
                ),
        )
        .subcommand(
            Command::new("interleave")
                .about("Interleave the plan's inputs as one channel each")
                .arg(
                    Arg::new("PLAN")
                        .help("Path to a JSON mix plan with one input per output channel")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("PATH")
                        .default_value("out.raw")
                        .help("Output path; .wav writes a WAV header, anything else raw frames"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand(Command::new("plan").about("Print a default mix plan JSON payload")),
        )
}
