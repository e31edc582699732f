use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "cbrsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}

const SHORT_RUN: [&str; 10] = [
    "--unit-bytes",
    "1000",
    "--rate",
    "8Mb/s",
    "--app-start-s",
    "0.1",
    "--app-stop-s",
    "0.2",
    "--sim-stop-s",
    "0.25",
];

#[test]
fn uplink_cbr_prints_throughput_and_writes_traces_and_summary() {
    let dir = unique_temp_dir("uplink-cbr");
    let out_dir = dir.join("traces");
    let summary = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args(SHORT_RUN)
        .args([
            "--out-dir",
            out_dir.to_str().unwrap(),
            "--summary-json",
            summary.to_str().unwrap(),
        ])
        .output()
        .expect("run uplink_cbr");
    assert!(
        output.status.success(),
        "uplink_cbr failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    // stdout 只有吞吐量行
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout={stdout}");
    assert_eq!(lines[0], "0.1s: \t0 Mbit/s");
    assert!(lines[1].starts_with("0.2s: \t"), "{}", lines[1]);
    assert!(lines[1].ends_with(" Mbit/s"), "{}", lines[1]);

    for name in [
        "mmWave-tcp-window.txt",
        "mmWave-tcp-data.txt",
        "mmWave-tcp-rtt.txt",
        "rto.txt",
        "segnum.txt",
        "throughput.txt",
    ] {
        let lines = read_lines(&out_dir.join(name));
        assert!(!lines.is_empty(), "{name} should not be empty");
        for line in &lines {
            let cols: Vec<&str> = line.split('\t').collect();
            assert!(cols.len() >= 2, "{name}: {line}");
            for c in cols {
                c.parse::<f64>()
                    .unwrap_or_else(|_| panic!("{name}: non-numeric column in {line:?}"));
            }
        }
    }

    let raw = fs::read_to_string(&summary).expect("read summary.json");
    let v: Value = serde_json::from_str(&raw).expect("parse summary.json");
    assert_eq!(v["units_sent"].as_u64(), Some(100));
    assert_eq!(v["sink_total_rx"].as_u64(), Some(100_000));
    assert_eq!(v["app_state"].as_str(), Some("stopped"));
    assert_eq!(v["throughput"].as_array().map(Vec::len), Some(2));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn uplink_cbr_quiet_mode_keeps_stdout_empty() {
    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args(SHORT_RUN)
        .arg("--quiet")
        .output()
        .expect("run uplink_cbr");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn uplink_cbr_reads_config_file_and_cli_overrides_it() {
    let dir = unique_temp_dir("uplink-cbr-config");
    let cfg = dir.join("cfg.json");
    fs::write(
        &cfg,
        r#"{ "unit_bytes": 1000, "rate": "8Mb/s", "app_start_s": 0.0, "app_stop_s": 1.0, "sim_stop_s": 0.05 }"#,
    )
    .expect("write config");
    let summary = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args([
            "--config",
            cfg.to_str().unwrap(),
            "--quota",
            "5",
            "--quiet",
            "--summary-json",
            summary.to_str().unwrap(),
        ])
        .output()
        .expect("run uplink_cbr");
    assert!(
        output.status.success(),
        "uplink_cbr failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: Value =
        serde_json::from_str(&fs::read_to_string(&summary).expect("read")).expect("parse");
    assert_eq!(v["units_sent"].as_u64(), Some(5));
    assert_eq!(v["app_state"].as_str(), Some("running"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn uplink_cbr_rejects_unknown_config_fields() {
    let dir = unique_temp_dir("uplink-cbr-bad-config");
    let cfg = dir.join("cfg.json");
    fs::write(&cfg, r#"{ "not_a_field": 1 }"#).expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args(["--config", cfg.to_str().unwrap(), "--quiet"])
        .output()
        .expect("run uplink_cbr");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not_a_field"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn uplink_cbr_rejects_malformed_rate() {
    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args(["--rate", "fast", "--quiet"])
        .output()
        .expect("run uplink_cbr");
    assert!(!output.status.success());
}

#[test]
fn uplink_cbr_rejects_nan_stop_time() {
    let output = Command::new(env!("CARGO_BIN_EXE_uplink_cbr"))
        .args(["--app-stop-s", "NaN", "--quiet"])
        .output()
        .expect("run uplink_cbr");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("app_stop_s"));
}
