use std::fs;

use crate::app::AppState;
use crate::experiment::{ExperimentConfig, ExperimentError, run};
use crate::net::DataRate;
use crate::sim::SimTime;
use crate::trace::TraceStream;

fn short_config() -> ExperimentConfig {
    ExperimentConfig {
        unit_bytes: 1_000,
        rate: DataRate::from_mbps(8),
        app_start_s: 0.1,
        app_stop_s: 0.2,
        sim_stop_s: 0.25,
        ..ExperimentConfig::default()
    }
}

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cbrsim-rs-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn short_run_sends_paced_units_and_counts_them_at_the_sink() {
    let summary = run(&short_config(), None, false).expect("run");

    // 0.1s..0.2s 每 1ms 一个单元；0.2s 处的停止先于同一时刻的发送
    assert_eq!(summary.units_sent, 100);
    assert_eq!(summary.app_state, AppState::Stopped);
    assert_eq!(summary.accepted_bytes, 100_000);
    assert_eq!(summary.rejected_sends, 0);
    assert_eq!(summary.sink_total_rx, 100_000);
    assert_eq!(summary.bytes_acked, 100_000);
    assert_eq!(summary.net.dropped_pkts, 0);
    assert!(summary.access_queue_peak_bytes >= 1_040);

    let times: Vec<f64> = summary
        .throughput
        .iter()
        .map(|s| s.time.as_secs_f64())
        .collect();
    assert_eq!(times, vec![0.1, 0.2]);
    assert_eq!(summary.throughput[0].rate, 0.0);
    assert!(summary.throughput[1].rate > 7.0 && summary.throughput[1].rate <= 8.0);
}

#[test]
fn run_writes_one_file_per_stream() {
    let dir = temp_dir("traces");
    run(&short_config(), Some(dir.as_path()), false).expect("run");

    for stream in [
        TraceStream::CongestionWindow,
        TraceStream::Rtt,
        TraceStream::Rto,
        TraceStream::NextTxSequence,
        TraceStream::Rx,
    ] {
        let body = fs::read_to_string(dir.join(stream.file_name())).expect("trace file");
        assert!(!body.is_empty(), "{} is empty", stream.name());
        for line in body.lines() {
            let first = line.split('\t').next().expect("time column");
            let t: f64 = first.parse().expect("time parses");
            assert!((0.1..=0.25).contains(&t), "{line}");
        }
    }

    let rx = fs::read_to_string(dir.join(TraceStream::Rx.file_name())).expect("rx");
    let total: u64 = rx
        .lines()
        .map(|l| l.split('\t').nth(1).expect("size").parse::<u64>().expect("u64"))
        .sum();
    assert_eq!(total, 100_000);

    let tput = fs::read_to_string(dir.join("throughput.txt")).expect("throughput");
    assert_eq!(tput.lines().count(), 2);
    // 没有丢包时 drop 文件为空
    assert_eq!(
        fs::read_to_string(dir.join(TraceStream::Drop.file_name())).expect("drop"),
        ""
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stop_before_start_is_rejected() {
    let cfg = ExperimentConfig {
        app_start_s: 1.0,
        app_stop_s: 0.5,
        ..ExperimentConfig::default()
    };
    assert!(matches!(
        run(&cfg, None, false),
        Err(ExperimentError::StopBeforeStart { .. })
    ));
}

#[test]
fn non_finite_or_negative_times_are_rejected() {
    let cases = [
        ("app_start_s", ExperimentConfig { app_start_s: -0.1, ..short_config() }),
        ("app_stop_s", ExperimentConfig { app_stop_s: f64::NAN, ..short_config() }),
        ("sim_stop_s", ExperimentConfig { sim_stop_s: f64::INFINITY, ..short_config() }),
        ("sample_start_s", ExperimentConfig { sample_start_s: f64::NAN, ..short_config() }),
    ];
    for (name, cfg) in cases {
        match run(&cfg, None, false) {
            Err(ExperimentError::InvalidTime { field, .. }) => assert_eq!(field, name),
            other => panic!("{name}: expected InvalidTime, got {other:?}"),
        }
    }
}

#[test]
fn first_sample_covers_one_interval_when_start_is_not_one_interval() {
    // 从 0 起持续发送；50ms 采样、0.1s 起输出，第一个窗口只应覆盖 [0.05, 0.1]
    let cfg = ExperimentConfig {
        unit_bytes: 1_000,
        rate: DataRate::from_mbps(8),
        app_start_s: 0.0,
        app_stop_s: 0.3,
        sim_stop_s: 0.28,
        sample_start_s: 0.1,
        sample_interval_ms: 50,
        ..ExperimentConfig::default()
    };
    let summary = run(&cfg, None, false).expect("run");

    let times: Vec<SimTime> = summary.throughput.iter().map(|s| s.time).collect();
    assert_eq!(
        times,
        vec![
            SimTime::from_millis(100),
            SimTime::from_millis(150),
            SimTime::from_millis(200),
            SimTime::from_millis(250),
        ]
    );
    for s in &summary.throughput {
        assert!(s.rate > 7.0 && s.rate <= 8.5, "{s:?}");
    }
}

#[test]
fn sample_start_earlier_than_one_interval_defers_first_output() {
    let cfg = ExperimentConfig {
        sample_start_s: 0.02,
        sample_interval_ms: 50,
        ..short_config()
    };
    let summary = run(&cfg, None, false).expect("run");
    assert_eq!(summary.throughput[0].time, SimTime::from_millis(70));
    assert_eq!(summary.throughput[0].rate, 0.0);
}

#[test]
fn zero_unit_size_surfaces_as_config_error() {
    let cfg = ExperimentConfig {
        unit_bytes: 0,
        ..short_config()
    };
    assert!(matches!(run(&cfg, None, false), Err(ExperimentError::Config(_))));
}

#[test]
fn config_file_fills_missing_fields_with_defaults() {
    let dir = temp_dir("config");
    let path = dir.join("cfg.json");
    fs::write(&path, r#"{ "rate": "8Mb/s", "unit_bytes": 1000 }"#).expect("write");
    let cfg = ExperimentConfig::load(&path).expect("load");
    assert_eq!(cfg.rate, DataRate::from_mbps(8));
    assert_eq!(cfg.unit_bytes, 1_000);
    assert_eq!(cfg.unit_quota, ExperimentConfig::default().unit_quota);

    fs::write(&path, r#"{ "bogus": 1 }"#).expect("write");
    assert!(matches!(
        ExperimentConfig::load(&path),
        Err(ExperimentError::ParseConfig { .. })
    ));
    assert!(matches!(
        ExperimentConfig::load(&dir.join("missing.json")),
        Err(ExperimentError::ReadConfig { .. })
    ));
    let _ = fs::remove_dir_all(&dir);
}
