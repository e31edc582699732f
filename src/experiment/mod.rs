//! 上行 CBR 实验
//!
//! 一次性搭好拓扑、传输端点、收包应用、流量源、吞吐量采样器与追踪输出，
//! 然后运行到停止时间并汇总结果。

mod config;

pub use config::ExperimentConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::{AppState, CbrApp, ConfigError, ThroughputSample, ThroughputSampler};
use crate::app::{schedule_app, schedule_sampler};
use crate::net::{Address, DropEvent, NetWorld, Stats};
use crate::proto::tcp::TcpConfig;
use crate::queue::PacketQueue;
use crate::sim::{SimTime, Simulator};
use crate::topo::uplink::{UplinkOpts, build_uplink};
use crate::trace::{
    AsciiTraceSink, SharedTraceSink, TraceError, TraceStream, drop_observer, shared,
};

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("create output dir {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("stop time {stop_s}s precedes start time {start_s}s")]
    StopBeforeStart { start_s: f64, stop_s: f64 },
    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidTime { field: &'static str, value: f64 },
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ExperimentError> {
        let raw = fs::read_to_string(path).map_err(|source| ExperimentError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ExperimentError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            segment_size: self.segment_size,
            snd_buf_bytes: self.snd_buf_bytes,
            init_cwnd_segments: self.init_cwnd_segments,
            min_rto: SimTime::from_millis(self.min_rto_ms),
            ..TcpConfig::default()
        }
    }

    fn uplink_opts(&self) -> UplinkOpts {
        UplinkOpts {
            access_rate: self.access_rate,
            access_latency: SimTime::from_micros(self.access_latency_us),
            access_queue_bytes: self.access_queue_bytes,
            core_rate: self.core_rate,
            core_latency: SimTime::from_micros(self.core_latency_us),
        }
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub final_time: SimTime,
    pub executed_events: u64,
    pub app_state: AppState,
    pub units_sent: u64,
    pub accepted_bytes: u64,
    pub rejected_sends: u64,
    pub bytes_acked: u64,
    pub retransmits: u64,
    pub sink_total_rx: u64,
    /// ue -> gw 出口队列的最高占用
    pub access_queue_peak_bytes: u64,
    pub net: Stats,
    pub throughput: Vec<ThroughputSample>,
}

/// 追踪输出：写文件，或（未指定目录时）不输出
struct TraceOutputs {
    dir: Option<PathBuf>,
    sinks: Vec<SharedTraceSink>,
}

impl TraceOutputs {
    fn open(&mut self, file_name: &str) -> Result<Option<SharedTraceSink>, ExperimentError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let sink = shared(AsciiTraceSink::create(dir.join(file_name))?);
        self.sinks.push(Arc::clone(&sink));
        Ok(Some(sink))
    }

    fn flush(&self) {
        for sink in &self.sinks {
            match sink.lock() {
                Ok(mut s) => {
                    if let Err(e) = s.flush() {
                        warn!(error = %e, "flush trace sink");
                    }
                }
                Err(_) => warn!("trace sink lock poisoned"),
            }
        }
    }
}

#[tracing::instrument(skip(cfg))]
pub fn run(cfg: &ExperimentConfig, out_dir: Option<&Path>, console: bool) -> Result<RunSummary, ExperimentError> {
    for (field, value) in [
        ("app_start_s", cfg.app_start_s),
        ("app_stop_s", cfg.app_stop_s),
        ("sim_stop_s", cfg.sim_stop_s),
        ("sample_start_s", cfg.sample_start_s),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ExperimentError::InvalidTime { field, value });
        }
    }
    if cfg.app_stop_s < cfg.app_start_s {
        return Err(ExperimentError::StopBeforeStart {
            start_s: cfg.app_start_s,
            stop_s: cfg.app_stop_s,
        });
    }
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).map_err(|source| ExperimentError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let mut outputs = TraceOutputs {
        dir: out_dir.map(Path::to_path_buf),
        sinks: Vec::new(),
    };

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let (ue, gw, remote) = build_uplink(&mut world.net, &cfg.uplink_opts());

    // 收包端 + 发送端套接字
    let sink_addr = Address::new(remote, cfg.sink_port);
    let sink_id = world.net.tcp.install_sink(sink_addr);
    let sock_id = world.net.tcp.create_socket(ue, cfg.tcp_config());

    // 追踪：每个通知流一个输出
    if let Some(sock) = world.net.tcp.socket_mut(sock_id) {
        for stream in [
            TraceStream::CongestionWindow,
            TraceStream::Rtt,
            TraceStream::Rto,
            TraceStream::NextTxSequence,
        ] {
            if let Some(sink) = outputs.open(stream.file_name())? {
                sock.trace_connect(stream, sink);
            }
        }
    }
    if let Some(sink) = outputs.open(TraceStream::Rx.file_name())? {
        if let Some(s) = world.net.tcp.sink_mut(sink_id) {
            s.trace_rx(sink);
        }
    }
    let drop_sink = outputs.open(TraceStream::Drop.file_name())?;
    world.net.connect_drop(drop_observer::<DropEvent>(drop_sink));

    // 流量源
    let mut app = CbrApp::new(0);
    app.configure(sock_id, sink_addr, cfg.unit_bytes, cfg.unit_quota, cfg.rate)?;
    world.apps.push(app);
    schedule_app(
        &mut sim,
        0,
        SimTime::from_secs_f64(cfg.app_start_s),
        Some(SimTime::from_secs_f64(cfg.app_stop_s)),
    );

    // 吞吐量采样
    let mut sampler = ThroughputSampler::new(sink_id, SimTime::from_millis(cfg.sample_interval_ms))?
        .with_console(console);
    if let Some(sink) = outputs.open("throughput.txt")? {
        sampler = sampler.with_output(sink);
    }
    let interval = sampler.interval();
    world.samplers.push(sampler);
    schedule_sampler(&mut sim, interval, 0, SimTime::from_secs_f64(cfg.sample_start_s));

    info!(
        unit_bytes = cfg.unit_bytes,
        rate = %cfg.rate,
        stop_s = cfg.sim_stop_s,
        "▶️  running uplink CBR experiment"
    );
    sim.run_until(SimTime::from_secs_f64(cfg.sim_stop_s), &mut world);
    outputs.flush();

    let app = &world.apps[0];
    let sock = world.net.tcp.socket(sock_id);
    let summary = RunSummary {
        final_time: sim.now(),
        executed_events: sim.executed_events(),
        app_state: app.state(),
        units_sent: app.units_sent(),
        accepted_bytes: sock.map_or(0, |s| s.accepted_bytes()),
        rejected_sends: sock.map_or(0, |s| s.rejected_sends()),
        bytes_acked: sock.map_or(0, |s| s.bytes_acked()),
        retransmits: sock.map_or(0, |s| s.retransmits()),
        sink_total_rx: world.net.tcp.sink(sink_id).map_or(0, |s| s.total_rx()),
        access_queue_peak_bytes: world
            .net
            .link_between(ue, gw)
            .and_then(|l| world.net.link(l))
            .map_or(0, |l| l.queue.peak_bytes()),
        net: world.net.stats.clone(),
        throughput: world.samplers[0].history().to_vec(),
    };
    info!(
        units_sent = summary.units_sent,
        sink_total_rx = summary.sink_total_rx,
        dropped_pkts = summary.net.dropped_pkts,
        "✅ experiment finished"
    );
    Ok(summary)
}
