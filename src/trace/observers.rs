//! 追踪观察者
//!
//! 每个观察者只绑定一个通知源，每收到一次通知就向自己的 sink 追加一条
//! `(当前仿真时间, 值...)` 记录：不过滤、不变换、不重试。

use tracing::{info, warn};

use super::record::{TraceField, TraceRecord};
use super::sink::SharedTraceSink;
use crate::sim::SimTime;

/// 被观察的通知流。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceStream {
    CongestionWindow,
    Rtt,
    Rto,
    NextTxSequence,
    Rx,
    Drop,
}

impl TraceStream {
    pub const ALL: [TraceStream; 6] = [
        TraceStream::CongestionWindow,
        TraceStream::Rtt,
        TraceStream::Rto,
        TraceStream::NextTxSequence,
        TraceStream::Rx,
        TraceStream::Drop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TraceStream::CongestionWindow => "CongestionWindow",
            TraceStream::Rtt => "RTT",
            TraceStream::Rto => "RTO",
            TraceStream::NextTxSequence => "NextTxSequence",
            TraceStream::Rx => "Rx",
            TraceStream::Drop => "Drop",
        }
    }

    /// 实验默认使用的输出文件名
    pub fn file_name(&self) -> &'static str {
        match self {
            TraceStream::CongestionWindow => "mmWave-tcp-window.txt",
            TraceStream::Rtt => "mmWave-tcp-rtt.txt",
            TraceStream::Rto => "rto.txt",
            TraceStream::NextTxSequence => "segnum.txt",
            TraceStream::Rx => "mmWave-tcp-data.txt",
            TraceStream::Drop => "drop.txt",
        }
    }
}

pub(crate) fn append(sink: &SharedTraceSink, record: TraceRecord) {
    let Ok(mut s) = sink.lock() else {
        warn!("trace sink lock poisoned; record lost");
        return;
    };
    if let Err(e) = s.append(record) {
        warn!(error = %e, "failed to append trace record");
    }
}

/// cwnd 变化：`time old new`
pub fn window_observer(sink: SharedTraceSink) -> impl FnMut(SimTime, &u64, &u64) + Send + 'static {
    move |now, old, new| {
        append(
            &sink,
            TraceRecord::new(now, vec![TraceField::Uint(*old), TraceField::Uint(*new)]),
        )
    }
}

/// RTT / RTO 变化：`time old_s new_s`
pub fn time_observer(sink: SharedTraceSink) -> impl FnMut(SimTime, &SimTime, &SimTime) + Send + 'static {
    move |now, old, new| {
        append(
            &sink,
            TraceRecord::new(now, vec![TraceField::Time(*old), TraceField::Time(*new)]),
        )
    }
}

/// 发送序号推进：`time next_tx`（只记录新值）
pub fn sequence_observer(sink: SharedTraceSink) -> impl FnMut(SimTime, &u64, &u64) + Send + 'static {
    move |now, _old, new| append(&sink, TraceRecord::new(now, vec![TraceField::Uint(*new)]))
}

/// 收包：`time size`
pub fn rx_observer<A: RxSize + 'static>(sink: SharedTraceSink) -> impl FnMut(SimTime, &A) + Send + 'static {
    move |now, ev| {
        append(
            &sink,
            TraceRecord::new(now, vec![TraceField::Uint(ev.size_bytes())]),
        )
    }
}

/// 丢包：只有时间，没有负载。同时在日志里输出一行。
pub fn drop_observer<A: 'static>(sink: Option<SharedTraceSink>) -> impl FnMut(SimTime, &A) + Send + 'static {
    move |now, _ev| {
        info!("RxDrop at {}", now.as_secs_f64());
        if let Some(sink) = &sink {
            append(sink, TraceRecord::new(now, Vec::new()));
        }
    }
}

/// 收包事件中可被记录的大小。
pub trait RxSize {
    fn size_bytes(&self) -> u64;
}
