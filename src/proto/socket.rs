//! 传输端点接口
//!
//! 应用只通过这组操作使用传输层；发送结果只表示“是否被传输层缓冲区接受”。

use crate::net::Address;
use crate::sim::Scheduler;

/// `send` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    /// 发送缓冲区已满或端点未连接
    Rejected,
}

pub trait Socket {
    fn bind(&mut self);
    fn connect(&mut self, peer: Address);
    fn send(&mut self, size_bytes: u32, sched: &mut dyn Scheduler) -> SendOutcome;
    fn close(&mut self);
}
