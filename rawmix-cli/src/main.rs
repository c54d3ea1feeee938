//! # Rawmix
//!
//! A command-line mixer and interleaver for headerless PCM audio.

use log::error;

mod cli;
mod error;
mod plan;
mod runner;

fn main() {
    let args = cli::args::build_cli().get_matches();

    let level = if args.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::builder().filter_level(level).init();

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}
