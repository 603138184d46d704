use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn headless_cpu_run_prints_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_crystal-entropy"))
        .args([
            "run",
            "--backend",
            "cpu",
            "--frames",
            "30",
            "--width",
            "48",
            "--height",
            "32",
            "--click-every",
            "0.1",
        ])
        .output()
        .expect("Failed to execute crystal-entropy");

    assert!(output.status.success(), "crystal-entropy exited with error");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("backend=cpu-glow"),
        "Missing backend: {stdout}"
    );
    assert!(stdout.contains("particles=512"), "Missing particle count");
    assert!(stdout.contains("frames=30"), "Missing frame count");
    assert!(stdout.contains("dropped=0"), "Unexpected dropped frames");
    assert!(stdout.contains("clicks=1"), "Expected exactly one click");
    assert!(stdout.contains("phase=shattering"), "Missing phase");
}

#[test]
fn json_summary_is_machine_readable() {
    let output = Command::new(env!("CARGO_BIN_EXE_crystal-entropy"))
        .args([
            "run",
            "--backend",
            "cpu",
            "--frames",
            "5",
            "--width",
            "16",
            "--height",
            "16",
            "--json",
        ])
        .output()
        .expect("Failed to execute crystal-entropy");
    assert!(output.status.success());

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is valid JSON");
    assert_eq!(summary["backend"], "cpu-glow");
    assert_eq!(summary["frames"], 5);
    assert_eq!(summary["phase"], "ordered");
    assert_eq!(summary["t_order"], 1.0);
    assert!(summary["entropy"]["normalized"].as_f64().is_some());
}

#[test]
fn config_file_overrides_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("sim.yaml");
    fs::write(
        &config_path,
        "render:\n  backend: cpu\n  width: 24\n  height: 24\n  cpu_particles: 128\n",
    )
    .expect("Failed to write config");

    let output = Command::new(env!("CARGO_BIN_EXE_crystal-entropy"))
        .args(["run", "--frames", "3", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to execute crystal-entropy");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backend=cpu-glow"));
    assert!(stdout.contains("particles=128"));
}

#[test]
fn invalid_config_fails_cleanly() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.json");
    fs::write(&config_path, r#"{ "render": { "width": 0 } }"#).expect("Failed to write config");

    let output = Command::new(env!("CARGO_BIN_EXE_crystal-entropy"))
        .args(["run", "--backend", "cpu", "--frames", "1", "--config"])
        .arg(&config_path)
        .output()
        .expect("Failed to execute crystal-entropy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "stderr: {stderr}");
}

#[test]
fn config_subcommand_prints_parseable_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_crystal-entropy"))
        .args(["config", "--format", "json"])
        .output()
        .expect("Failed to execute crystal-entropy");
    assert!(output.status.success());

    let config: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config is valid JSON");
    assert_eq!(config["integrator"]["max_speed"], 8.0);
    assert_eq!(config["render"]["backend"], "auto");
    assert_eq!(config["density"]["resolution"], 64);
}
