//! 上行拓扑构建
//!
//! 拓扑结构：ue <-> gw <-> remote
//! - ue <-> gw：接入链路（瓶颈，带有限 DropTail 缓冲）
//! - gw <-> remote：核心链路（高带宽、低时延）

use crate::net::{DataRate, Network, NodeId};
use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct UplinkOpts {
    pub access_rate: DataRate,
    pub access_latency: SimTime,
    /// 接入链路（ue -> gw）队列容量（字节）
    pub access_queue_bytes: u64,
    pub core_rate: DataRate,
    pub core_latency: SimTime,
}

impl Default for UplinkOpts {
    fn default() -> Self {
        Self {
            access_rate: DataRate::from_mbps(800),
            access_latency: SimTime::from_millis(1),
            access_queue_bytes: 1024 * 1024,
            core_rate: DataRate::from_gbps(100),
            core_latency: SimTime::from_micros(1),
        }
    }
}

/// 返回：(ue, gw, remote)
pub fn build_uplink(net: &mut Network, opts: &UplinkOpts) -> (NodeId, NodeId, NodeId) {
    let ue = net.add_host("ue");
    let gw = net.add_host("gw");
    let remote = net.add_host("remote");

    // ue <-> gw (access)
    net.connect(ue, gw, opts.access_latency, opts.access_rate);
    net.connect(gw, ue, opts.access_latency, opts.access_rate);
    net.set_link_queue_capacity_bytes(ue, gw, opts.access_queue_bytes);
    // gw <-> remote (core)
    net.connect(gw, remote, opts.core_latency, opts.core_rate);
    net.connect(remote, gw, opts.core_latency, opts.core_rate);

    (ue, gw, remote)
}
