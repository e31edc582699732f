//! Protocol dispatch hooks for the network.

use crate::sim::Scheduler;
use tracing::debug;

use super::{Network, NodeId, Packet, Transport};

impl Network {
    /// 数据包送达目的地时的处理
    #[tracing::instrument(skip(self, sched), fields(pkt_id = pkt.id, flow_id = pkt.flow_id))]
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sched: &mut dyn Scheduler) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;

        debug!(
            size_bytes = pkt.size_bytes,
            delivered_pkts = self.stats.delivered_pkts,
            delivered_bytes = self.stats.delivered_bytes,
            "✅ 数据包送达目的地"
        );

        // 传输层处理：目的端产生 ACK、源端处理 ACK 驱动继续发送
        if let Transport::Tcp(seg) = pkt.transport {
            let mut tcp = std::mem::take(&mut self.tcp);
            tcp.on_tcp_segment(pkt.flow_id, at, seg, sched, self);
            self.tcp = tcp;
        }
    }
}
