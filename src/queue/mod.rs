//! 队列策略（Queue disciplines）
//!
//! 链路出口只需要 DropTail（尾丢弃）；丢包会通过网络层的 `Drop` 通知源上报。

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn capacity_bytes(&self) -> u64;
    /// 运行以来的最高占用字节数
    fn peak_bytes(&self) -> u64;
    /// 累计被拒绝入队的 packet 数
    fn dropped(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
