use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn write_plan(dir: &TempDir, plan: serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("plan.json");
    fs::write(&path, plan.to_string()).expect("write plan");
    path
}

fn write_input(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write input");
    path
}

fn mono_u8_plan(inputs: serde_json::Value) -> serde_json::Value {
    json!({
        "format": {"encoding": "u8", "channels": 1, "rate": 1000},
        "inputs": inputs,
    })
}

fn rawmix() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rawmix"))
}

#[test]
fn mixes_two_raw_files_bytewise() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[1, 2, 3]);
    let b = write_input(&dir, "b.raw", &[4, 5, 6]);
    let plan = write_plan(
        &dir,
        mono_u8_plan(json!([
            {"path": a.to_string_lossy()},
            {"path": b.to_string_lossy()},
        ])),
    );
    let out = dir.path().join("out.raw");

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", out.to_string_lossy().as_ref()])
        .assert()
        .success();
    assert_eq!(fs::read(&out).expect("read output"), vec![5, 7, 9]);
}

#[test]
fn offsets_delay_a_stream_with_silence() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[1, 2, 3]);
    let b = write_input(&dir, "b.raw", &[4, 5, 6]);
    let plan = write_plan(
        &dir,
        mono_u8_plan(json!([
            {"path": a.to_string_lossy()},
            {"path": b.to_string_lossy(), "offset_ms": 2},
        ])),
    );
    let out = dir.path().join("out.raw");

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", out.to_string_lossy().as_ref()])
        .assert()
        .success();
    assert_eq!(fs::read(&out).expect("read output"), vec![1, 2, 7, 5, 6]);
}

#[test]
fn clip_handling_follows_the_chosen_strategy() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[200, 100]);
    let b = write_input(&dir, "b.raw", &[100, 50]);
    let plan = write_plan(
        &dir,
        mono_u8_plan(json!([
            {"path": a.to_string_lossy()},
            {"path": b.to_string_lossy()},
        ])),
    );

    // Saturating by default: each overflowing sample clamps on its own.
    let clamped = dir.path().join("clamped.raw");
    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", clamped.to_string_lossy().as_ref()])
        .assert()
        .success();
    assert_eq!(fs::read(&clamped).expect("read output"), vec![255, 150]);

    // Wave scaling keeps the shape: 300 maps to 255, 150 scales along.
    let scaled = dir.path().join("scaled.raw");
    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", scaled.to_string_lossy().as_ref()])
        .arg("--prevent-clipping")
        .assert()
        .success();
    assert_eq!(fs::read(&scaled).expect("read output"), vec![255, 127]);
}

#[test]
fn live_mode_pads_every_chunk_to_full_duration() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[1, 2, 3]);
    let b = write_input(&dir, "b.raw", &[10]);
    let plan = write_plan(
        &dir,
        json!({
            "format": {"encoding": "u8", "channels": 1, "rate": 1000},
            "chunk_duration_ms": 5,
            "inputs": [
                {"path": a.to_string_lossy()},
                {"path": b.to_string_lossy()},
            ],
        }),
    );
    let out = dir.path().join("out.raw");

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref(), "--live"])
        .args(["-o", out.to_string_lossy().as_ref()])
        .assert()
        .success();
    assert_eq!(fs::read(&out).expect("read output"), vec![11, 2, 3, 0, 0]);
}

#[test]
fn misaligned_input_files_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[1, 2, 3]);
    let plan = write_plan(
        &dir,
        json!({
            "format": {"encoding": "s16le", "channels": 1, "rate": 1000},
            "inputs": [{"path": a.to_string_lossy()}],
        }),
    );

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", dir.path().join("out.raw").to_string_lossy().as_ref()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("misaligned payload"));
}

#[test]
fn wav_outputs_carry_a_riff_header() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[1, 0, 2, 0]);
    let plan = write_plan(
        &dir,
        json!({
            "format": {"encoding": "s16le", "channels": 1, "rate": 1000},
            "inputs": [{"path": a.to_string_lossy()}],
        }),
    );
    let out = dir.path().join("out.wav");

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .args(["-o", out.to_string_lossy().as_ref()])
        .assert()
        .success();

    let reader = hound::WavReader::open(&out).expect("open wav");
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 1000);
    assert_eq!(reader.spec().bits_per_sample, 16);
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<_, _>>()
        .expect("samples");
    assert_eq!(samples, vec![1, 2]);
}

#[test]
fn plans_without_inputs_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let plan = write_plan(&dir, mono_u8_plan(json!([])));

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("names no inputs"));
}

#[test]
fn missing_input_files_are_reported() {
    let dir = TempDir::new().expect("tempdir");
    let plan = write_plan(
        &dir,
        mono_u8_plan(json!([
            {"path": dir.path().join("absent.raw").to_string_lossy()},
        ])),
    );

    rawmix()
        .args(["mix", plan.to_string_lossy().as_ref()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("io error"));
}

#[test]
fn output_defaults_to_out_raw_in_the_working_directory() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_input(&dir, "a.raw", &[9]);
    let plan = write_plan(
        &dir,
        mono_u8_plan(json!([{"path": a.to_string_lossy()}])),
    );

    rawmix()
        .current_dir(dir.path())
        .args(["mix", plan.to_string_lossy().as_ref()])
        .assert()
        .success();
    assert_eq!(
        fs::read(Path::new(dir.path()).join("out.raw")).expect("read output"),
        vec![9]
    );
}
