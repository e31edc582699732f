//! 吞吐量采样器
//!
//! 每隔固定间隔读取一次累计收包字节数，`Δbytes * 8 / (interval_s * unit)` 即该区间的平均速率。
//! 以 100ms、Mbit/s 为例，缩放常数为 `0.1 * 1e6 = 1e5`。

use serde::Serialize;

use super::ConfigError;
use super::sink::SinkId;
use crate::sim::SimTime;
use crate::trace::{SharedTraceSink, TraceField, TraceRecord, append};

pub type SamplerId = usize;

/// 单调不减的累计字节计数器（只读）
pub trait ByteCounter {
    fn total_rx(&self) -> u64;
}

/// 速率显示单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RateUnit {
    Bps,
    Kbps,
    #[default]
    Mbps,
    Gbps,
}

impl RateUnit {
    pub fn bits_per_unit(&self) -> u64 {
        match self {
            RateUnit::Bps => 1,
            RateUnit::Kbps => 1_000,
            RateUnit::Mbps => 1_000_000,
            RateUnit::Gbps => 1_000_000_000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateUnit::Bps => "bit/s",
            RateUnit::Kbps => "kbit/s",
            RateUnit::Mbps => "Mbit/s",
            RateUnit::Gbps => "Gbit/s",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThroughputSample {
    pub time: SimTime,
    pub rate: f64,
}

pub struct ThroughputSampler {
    source: SinkId,
    interval: SimTime,
    unit: RateUnit,
    last_total_rx: u64,
    last_sample: SimTime,
    console: bool,
    output: Option<SharedTraceSink>,
    history: Vec<ThroughputSample>,
}

impl std::fmt::Debug for ThroughputSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThroughputSampler")
            .field("source", &self.source)
            .field("interval", &self.interval)
            .field("unit", &self.unit)
            .field("last_total_rx", &self.last_total_rx)
            .field("last_sample", &self.last_sample)
            .field("samples", &self.history.len())
            .finish()
    }
}

impl ThroughputSampler {
    pub fn new(source: SinkId, interval: SimTime) -> Result<Self, ConfigError> {
        if interval == SimTime::ZERO {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            source,
            interval,
            unit: RateUnit::default(),
            last_total_rx: 0,
            last_sample: SimTime::ZERO,
            console: false,
            output: None,
            history: Vec::new(),
        })
    }

    pub fn with_unit(mut self, unit: RateUnit) -> Self {
        self.unit = unit;
        self
    }

    /// 每个区间在 stdout 打印 `"<t>s: \t<rate> Mbit/s"`
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// 每个区间追加一行 `time rate`
    pub fn with_output(mut self, sink: SharedTraceSink) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn source(&self) -> SinkId {
        self.source
    }

    pub fn interval(&self) -> SimTime {
        self.interval
    }

    pub fn unit(&self) -> RateUnit {
        self.unit
    }

    pub fn last_sample_time(&self) -> SimTime {
        self.last_sample
    }

    pub fn history(&self) -> &[ThroughputSample] {
        &self.history
    }

    /// `interval_s * bits_per_unit`：区间字节差 * 8 除以它即得到显示单位下的速率
    pub fn scaling_constant(&self) -> f64 {
        self.interval.0 as f64 * self.unit.bits_per_unit() as f64 / 1e9
    }

    /// 回到零基线
    pub fn reset(&mut self) {
        self.last_total_rx = 0;
        self.last_sample = SimTime::ZERO;
        self.history.clear();
    }

    /// 只记录计数器当前值作为下一窗口的起点，不产生输出
    pub fn baseline(&mut self, now: SimTime, counter: &dyn ByteCounter) {
        self.last_total_rx = counter.total_rx();
        self.last_sample = now;
    }

    pub fn sample(&mut self, now: SimTime, counter: &dyn ByteCounter) -> ThroughputSample {
        let total = counter.total_rx();
        let delta = total.saturating_sub(self.last_total_rx);
        let rate = delta as f64 * 8.0 / self.scaling_constant();
        self.last_total_rx = total;
        self.last_sample = now;

        let s = ThroughputSample { time: now, rate };
        if self.console {
            println!("{}s: \t{} {}", now.as_secs_f64(), rate, self.unit.label());
        }
        if let Some(out) = &self.output {
            append(out, TraceRecord::new(now, vec![TraceField::Float(rate)]));
        }
        self.history.push(s);
        s
    }
}
