//! 应用层
//!
//! - `CbrApp`：按目标比特率自定时发送固定大小数据单元的流量源
//! - `PacketSink`：统计累计收包字节数的接收端
//! - `ThroughputSampler`：周期读取累计字节数并换算瞬时吞吐量

mod cbr;
mod events;
mod sink;
mod throughput;

pub use cbr::{AppId, AppState, CbrApp};
pub use events::{AppSend, AppStart, AppStop, SampleBaseline, SampleThroughput, schedule_app, schedule_sampler};
pub use sink::{PacketSink, RxEvent, SinkId};
pub use throughput::{ByteCounter, RateUnit, SamplerId, ThroughputSample, ThroughputSampler};

/// 配置参数非法（在调用时同步报告）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unit size must be greater than zero")]
    ZeroUnitSize,

    #[error("unit quota must be greater than zero")]
    ZeroQuota,

    #[error("target data rate must be greater than zero")]
    ZeroRate,

    #[error("sampling interval must be greater than zero")]
    ZeroInterval,
}
