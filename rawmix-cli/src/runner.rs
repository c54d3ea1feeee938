//! Execution of the CLI subcommands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::ArgMatches;
use log::{debug, info, warn};

use rawmix_lib::clock::ManualClock;
use rawmix_lib::config::MixerConfig;
use rawmix_lib::error::MixError;
use rawmix_lib::format::SampleFormat;
use rawmix_lib::interleave::Interleaver;
use rawmix_lib::mixer::{AudioMixer, LiveAudioMixer};

use crate::error::CliError;
use crate::plan::{self, MixPlan};

/// Primary entry for CLI execution.
pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("mix", sub)) => run_mix(sub),
        Some(("interleave", sub)) => run_interleave(sub),
        Some(("create", sub)) => run_create(sub),
        _ => Ok(-1),
    }
}

fn run_mix(args: &ArgMatches) -> Result<i32, CliError> {
    let plan_path = args.get_one::<String>("PLAN").unwrap();
    let output = args.get_one::<String>("output").unwrap();

    let plan = plan::load_plan(Path::new(plan_path))?;
    let mut config = plan.config.clone();
    if let Some(chunk_ms) = args.get_one::<String>("chunk-ms") {
        config.chunk_duration_ms = chunk_ms
            .parse::<u64>()
            .map_err(|err| CliError::Plan(format!("bad --chunk-ms value: {}", err)))?;
    }
    if args.get_flag("prevent-clipping") {
        config.prevent_clipping = true;
    }
    if config.format.bytes_for(config.chunk_duration()) == 0 {
        return Err(CliError::Plan(
            "chunk duration covers no whole frame at this sample rate".to_string(),
        ));
    }

    let payload = if args.get_flag("live") {
        mix_live(&config, &plan)?
    } else {
        mix_batch(&config, &plan)?
    };
    write_output(Path::new(output), &config.format, &payload)?;
    info!("wrote {} bytes to {}", payload.len(), output);
    Ok(0)
}

/// Mix every input in full.
///
/// The session runs on a manual clock stepped one chunk at a time, so no
/// stream is ever charged for the time spent reading files.
fn mix_batch(config: &MixerConfig, plan: &MixPlan) -> Result<Vec<u8>, CliError> {
    let clock = Arc::new(ManualClock::new());
    let mut mixer = AudioMixer::with_clock(config, clock.clone());

    for input in &plan.inputs {
        let offset = MixerConfig::offset_from_millis(input.offset_ms)?;
        let key = mixer.add_stream(offset);
        let data = fs::read(&input.path)?;
        debug!("read {} bytes from {}", data.len(), input.path);
        mixer.push(key, &data)?;
        mixer.mark_ended(key)?;
    }

    let step = config.chunk_duration();
    let mut out = Vec::new();
    while !mixer.is_finished() {
        clock.advance(step);
        out.extend(mixer.tick()?.payload);
    }
    Ok(out)
}

/// Simulate a live session at the plan's chunk cadence.
///
/// Each tick feeds every input one chunk's worth and emits exactly one
/// chunk, so inputs that start late or end early come out padded with
/// silence.
fn mix_live(config: &MixerConfig, plan: &MixPlan) -> Result<Vec<u8>, CliError> {
    struct Feed {
        key: rawmix_lib::queue::StreamKey,
        data: Vec<u8>,
        at: usize,
    }

    let mut mixer = LiveAudioMixer::new(config);
    let chunk_bytes = config.format.bytes_for(config.chunk_duration());

    let mut feeds = Vec::with_capacity(plan.inputs.len());
    for input in &plan.inputs {
        let offset = MixerConfig::offset_from_millis(input.offset_ms)?;
        let key = mixer.add_queue(offset);
        let data = fs::read(&input.path)?;
        debug!("read {} bytes from {}", data.len(), input.path);
        if data.is_empty() {
            mixer.mark_ended(key)?;
        }
        feeds.push(Feed { key, data, at: 0 });
    }

    let mut out = Vec::new();
    while mixer.queue_count() > 0 {
        for feed in &mut feeds {
            if feed.at >= feed.data.len() {
                continue;
            }
            let end = (feed.at + chunk_bytes).min(feed.data.len());
            mixer.push(feed.key, &feed.data[feed.at..end])?;
            feed.at = end;
            if feed.at == feed.data.len() {
                mixer.mark_ended(feed.key)?;
            }
        }
        out.extend(mixer.tick()?);
    }
    out.extend(mixer.finish()?);
    Ok(out)
}

fn run_interleave(args: &ArgMatches) -> Result<i32, CliError> {
    let plan_path = args.get_one::<String>("PLAN").unwrap();
    let output = args.get_one::<String>("output").unwrap();

    let plan = plan::load_plan(Path::new(plan_path))?;
    let format = plan.config.format;
    if plan.inputs.len() != usize::from(format.channels()) {
        return Err(CliError::Mix(MixError::FormatMismatch {
            expected: format.to_string(),
            actual: format!("{} plan inputs", plan.inputs.len()),
        }));
    }

    let mut session = Interleaver::new(format);
    for input in &plan.inputs {
        if input.offset_ms != 0 {
            warn!(
                "interleave ignores offsets ({} names {} ms)",
                input.path, input.offset_ms
            );
        }
        let key = session.add_channel()?;
        let data = fs::read(&input.path)?;
        debug!("read {} bytes from {}", data.len(), input.path);
        session.push(key, &data)?;
        session.mark_ended(key)?;
    }

    let mut out = Vec::new();
    loop {
        let chunk = session.pull(None)?;
        if chunk.is_empty() {
            break;
        }
        out.extend(chunk);
    }
    write_output(Path::new(output), &format, &out)?;
    info!("wrote {} bytes to {}", out.len(), output);
    Ok(0)
}

fn run_create(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("plan", _)) => {
            let payload = serde_json::to_string_pretty(&MixPlan::template())?;
            println!("{}", payload);
            Ok(0)
        }
        _ => Ok(-1),
    }
}

/// Write frames as headerless PCM, or as WAV when the path ends in `.wav`.
fn write_output(path: &Path, format: &SampleFormat, payload: &[u8]) -> Result<(), CliError> {
    let is_wav = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        write_wav(path, format, payload)
    } else {
        fs::write(path, payload)?;
        Ok(())
    }
}

/// Encode signed PCM frames into a WAV container.
fn write_wav(path: &Path, format: &SampleFormat, payload: &[u8]) -> Result<(), CliError> {
    if !format.signed() {
        return Err(CliError::Mix(MixError::UnsupportedFormat(
            "unsigned samples cannot be written as wav, use a raw output path".to_string(),
        )));
    }
    let spec = hound::WavSpec {
        channels: format.channels(),
        sample_rate: format.sample_rate(),
        bits_per_sample: u16::from(format.sample_width()) * 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let width = usize::from(format.sample_width());
    for sample in payload.chunks_exact(width) {
        let value = format.decode_sample(sample)?;
        match width {
            1 => writer.write_sample(value as i8)?,
            2 => writer.write_sample(value as i16)?,
            _ => writer.write_sample(value as i32)?,
        }
    }
    writer.finalize()?;
    Ok(())
}
