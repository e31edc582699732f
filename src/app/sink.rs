//! 收包应用

use crate::net::Address;
use crate::sim::SimTime;
use crate::trace::{RxSize, SharedTraceSink, TracedCallback, rx_observer};

use super::throughput::ByteCounter;

pub type SinkId = usize;

/// 一次按序交付给应用的数据
#[derive(Debug, Clone, Copy)]
pub struct RxEvent {
    pub size_bytes: u64,
    pub from: Address,
}

impl RxSize for RxEvent {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// 监听某地址的收包应用：只计数，不回应（ACK 由传输层负责）。
#[derive(Debug)]
pub struct PacketSink {
    local: Address,
    total_rx: u64,
    rx: TracedCallback<RxEvent>,
}

impl PacketSink {
    pub fn new(local: Address) -> Self {
        Self {
            local,
            total_rx: 0,
            rx: TracedCallback::default(),
        }
    }

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn total_rx(&self) -> u64 {
        self.total_rx
    }

    pub fn connect_rx(&mut self, f: impl FnMut(SimTime, &RxEvent) + Send + 'static) {
        self.rx.connect(f);
    }

    /// 把 `Rx` 通知写成 `time size` 行
    pub fn trace_rx(&mut self, sink: SharedTraceSink) {
        self.rx.connect(rx_observer(sink));
    }

    pub(crate) fn on_rx(&mut self, now: SimTime, size_bytes: u64, from: Address) {
        self.total_rx += size_bytes;
        self.rx.invoke(now, &RxEvent { size_bytes, from });
    }
}

impl ByteCounter for PacketSink {
    fn total_rx(&self) -> u64 {
        self.total_rx
    }
}
