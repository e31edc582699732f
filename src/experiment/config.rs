use serde::{Deserialize, Serialize};

use crate::net::DataRate;

/// 一次上行 CBR 实验的全部参数；JSON 中缺省的字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// 每个应用数据单元的大小（字节）
    pub unit_bytes: u32,
    /// 最多发送的单元数
    pub unit_quota: u64,
    /// 应用层目标速率
    pub rate: DataRate,
    pub app_start_s: f64,
    pub app_stop_s: f64,
    pub sim_stop_s: f64,
    /// 第一次吞吐量采样的时间
    pub sample_start_s: f64,
    pub sample_interval_ms: u64,
    /// 收包应用端口
    pub sink_port: u16,

    pub segment_size: u32,
    pub snd_buf_bytes: u64,
    pub init_cwnd_segments: u64,
    pub min_rto_ms: u64,

    pub access_rate: DataRate,
    pub access_latency_us: u64,
    pub access_queue_bytes: u64,
    pub core_rate: DataRate,
    pub core_latency_us: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            unit_bytes: 900,
            unit_quota: 500_000_000,
            rate: DataRate::from_mbps(1000),
            app_start_s: 0.1,
            app_stop_s: 4.5,
            sim_stop_s: 4.5,
            sample_start_s: 0.1,
            sample_interval_ms: 100,
            sink_port: 20000,
            segment_size: 1000,
            snd_buf_bytes: 131_072 * 40,
            init_cwnd_segments: 10,
            min_rto_ms: 200,
            access_rate: DataRate::from_mbps(800),
            access_latency_us: 1000,
            access_queue_bytes: 1024 * 1024,
            core_rate: DataRate::from_gbps(100),
            core_latency_us: 1,
        }
    }
}
