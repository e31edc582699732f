//! 单向链路：固定传播时延 + 串行发送 + 出口队列

use super::data_rate::DataRate;
use super::id::NodeId;
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::SimTime;

#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub rate: DataRate,
    /// 是否正在序列化发送一个 packet
    pub busy: bool,
    /// 出口队列（默认 DropTail，容量不限）
    pub queue: Box<dyn PacketQueue>,
}

impl Link {
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> Self {
        Self {
            from,
            to,
            latency,
            rate,
            busy: false,
            queue: Box::new(DropTailQueue::new(u64::MAX)),
        }
    }

    /// 把 `bytes` 字节推上线路所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes as u64)
    }
}
