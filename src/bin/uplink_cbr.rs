//! 上行 CBR 实验
//!
//! ue 上的恒定比特率应用经 TCP 向 remote 上的收包应用发送数据；
//! 每 100ms 打印一次吞吐量，并把 cwnd/RTT/RTO/发送序号/收包/丢包写成文本追踪文件。

use clap::Parser;
use cbrsim_rs::experiment::{self, ExperimentConfig};
use cbrsim_rs::net::DataRate;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "uplink-cbr", about = "上行仿真：ue->remote 恒定比特率应用 + TCP")]
struct Args {
    /// JSON 配置文件；命令行参数覆盖其中的值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 追踪文件输出目录；不填则不写追踪文件
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// 输出运行汇总 JSON；不填则不生成
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// 不在 stdout 打印每个采样区间的吞吐量
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// 应用数据单元大小（字节）[默认 900]
    #[arg(long)]
    unit_bytes: Option<u32>,

    /// 最多发送的单元数 [默认 500000000]
    #[arg(long)]
    quota: Option<u64>,

    /// 应用层目标速率，例如 1000Mb/s [默认 1000Mb/s]
    #[arg(long)]
    rate: Option<DataRate>,

    /// 应用启动时间（秒）[默认 0.1]
    #[arg(long)]
    app_start_s: Option<f64>,

    /// 应用停止时间（秒）[默认 4.5]
    #[arg(long)]
    app_stop_s: Option<f64>,

    /// 仿真停止时间（秒）[默认 4.5]
    #[arg(long)]
    sim_stop_s: Option<f64>,

    /// 吞吐量采样间隔（毫秒）[默认 100]
    #[arg(long)]
    sample_interval_ms: Option<u64>,

    /// TCP 段大小（字节）[默认 1000]
    #[arg(long)]
    segment_size: Option<u32>,

    /// 接入链路速率 [默认 800Mb/s]
    #[arg(long)]
    access_rate: Option<DataRate>,

    /// 接入链路队列容量（字节）[默认 1048576]
    #[arg(long)]
    access_queue_bytes: Option<u64>,
}

impl Args {
    fn apply(&self, cfg: &mut ExperimentConfig) {
        if let Some(v) = self.unit_bytes {
            cfg.unit_bytes = v;
        }
        if let Some(v) = self.quota {
            cfg.unit_quota = v;
        }
        if let Some(v) = self.rate {
            cfg.rate = v;
        }
        if let Some(v) = self.app_start_s {
            cfg.app_start_s = v;
        }
        if let Some(v) = self.app_stop_s {
            cfg.app_stop_s = v;
        }
        if let Some(v) = self.sim_stop_s {
            cfg.sim_stop_s = v;
        }
        if let Some(v) = self.sample_interval_ms {
            cfg.sample_interval_ms = v;
        }
        if let Some(v) = self.segment_size {
            cfg.segment_size = v;
        }
        if let Some(v) = self.access_rate {
            cfg.access_rate = v;
        }
        if let Some(v) = self.access_queue_bytes {
            cfg.access_queue_bytes = v;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => ExperimentConfig::load(path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(2);
        }),
        None => ExperimentConfig::default(),
    };
    args.apply(&mut cfg);

    let summary = experiment::run(&cfg, args.out_dir.as_deref(), !args.quiet).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if let Some(path) = args.summary_json {
        let json = serde_json::to_string_pretty(&summary).expect("serialize run summary");
        if let Err(e) = fs::write(&path, json) {
            eprintln!("error: write {}: {e}", path.display());
            std::process::exit(1);
        }
        eprintln!("wrote run summary to {}", path.display());
    }

    eprintln!(
        "done @ {:?}\n  app: state={:?}, units_sent={}, accepted_bytes={}, rejected_sends={}\n  tcp: bytes_acked={}, retransmits={}\n  sink: total_rx={}\n  net: delivered_pkts={}, dropped_pkts={}",
        summary.final_time,
        summary.app_state,
        summary.units_sent,
        summary.accepted_bytes,
        summary.rejected_sends,
        summary.bytes_acked,
        summary.retransmits,
        summary.sink_total_rx,
        summary.net.delivered_pkts,
        summary.net.dropped_pkts,
    );
}
