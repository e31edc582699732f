//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、数据包转发和统计信息。

use std::collections::HashMap;

use super::data_rate::DataRate;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_events::{DeliverPacket, LinkReady};
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use crate::proto::tcp::TcpStack;
use crate::queue::DropTailQueue;
use crate::sim::{Scheduler, SchedulerExt, SimTime};
use crate::trace::TracedCallback;
use tracing::{debug, trace, warn};

/// 链路队列溢出时上报的丢包事件
#[derive(Debug, Clone, Copy)]
pub struct DropEvent {
    pub link: LinkId,
    pub pkt_id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
}

/// 网络拓扑
#[derive(Debug, Default)]
pub struct Network {
    node_names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    adj: Vec<Vec<NodeId>>,
    rev_adj: Vec<Vec<NodeId>>,
    routing: RoutingTable,
    next_pkt_id: u64,
    pub stats: Stats,
    pub tcp: TcpStack,
    drops: TracedCallback<DropEvent>,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.node_names.len());
        self.node_names.push(name.into());
        self.adj.push(Vec::new());
        self.rev_adj.push(Vec::new());
        self.routing.mark_dirty();
        id
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        rate: DataRate,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, rate));
        self.edges.insert((from, to), id);
        self.adj[from.0].push(to);
        self.rev_adj[to.0].push(from);
        self.routing.mark_dirty();
        id
    }

    /// 设置某条单向链路的 DropTail 队列容量
    pub fn set_link_queue_capacity_bytes(&mut self, from: NodeId, to: NodeId, cap_bytes: u64) {
        let Some(&id) = self.edges.get(&(from, to)) else {
            warn!(?from, ?to, "no such link; queue capacity unchanged");
            return;
        };
        self.links[id.0].queue = Box::new(DropTailQueue::new(cap_bytes));
    }

    /// 订阅丢包通知
    pub fn connect_drop(&mut self, f: impl FnMut(SimTime, &DropEvent) + Send + 'static) {
        self.drops.connect(f);
    }

    /// 创建数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, src: NodeId, dst: NodeId) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, flow_id, size_bytes, src, dst)
    }

    fn next_hop(&mut self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.routing.ensure_built(&self.adj, &self.rev_adj);
        self.routing.next_hop(from, dst)
    }

    /// 将到达的数据包交给节点：到达目的地则上交传输层，否则继续转发
    #[tracing::instrument(skip(self, sched), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sched: &mut dyn Scheduler) {
        if to == pkt.dst {
            self.on_delivered(to, pkt, sched);
        } else {
            trace!("未到达目的地，继续转发");
            self.forward_from(to, pkt, sched);
        }
    }

    /// 从指定节点转发数据包（入队到出口链路）
    #[tracing::instrument(skip(self, sched), fields(pkt_id = pkt.id, from = ?from, hops = pkt.hops_taken))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sched: &mut dyn Scheduler) {
        let Some(next) = self.next_hop(from, pkt.dst) else {
            warn!(dst = ?pkt.dst, "no route; packet discarded");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let Some(&link_id) = self.edges.get(&(from, next)) else {
            warn!(?next, "routing table points at a missing link");
            self.stats.unroutable_pkts += 1;
            return;
        };

        let link = &mut self.links[link_id.0];
        match link.queue.enqueue(pkt) {
            Ok(()) => {
                trace!(q_bytes = link.queue.bytes(), "入队");
                if !link.busy {
                    self.start_tx(link_id, sched);
                }
            }
            Err(pkt) => {
                debug!(
                    link_id = ?link_id,
                    q_cap_bytes = link.queue.capacity_bytes(),
                    "🗑️  队列已满，丢包"
                );
                self.stats.dropped_pkts += 1;
                self.stats.dropped_bytes += pkt.size_bytes as u64;
                let ev = DropEvent {
                    link: link_id,
                    pkt_id: pkt.id,
                    flow_id: pkt.flow_id,
                    size_bytes: pkt.size_bytes,
                };
                self.drops.invoke(sched.now(), &ev);
            }
        }
    }

    /// 出队并开始序列化；在 depart 时刻调度 `LinkReady`，在 arrive 时刻调度 `DeliverPacket`
    fn start_tx(&mut self, link_id: LinkId, sched: &mut dyn Scheduler) {
        let link = &mut self.links[link_id.0];
        let Some(pkt) = link.queue.dequeue() else {
            link.busy = false;
            return;
        };
        link.busy = true;

        let now = sched.now();
        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(link.latency);
        let to = link.to;

        trace!(?now, ?tx_time, ?depart, ?arrive, "计算传输时间");

        sched.schedule_at(arrive, DeliverPacket { to, pkt: pkt.advance() });
        sched.schedule_at(depart, LinkReady { link_id });
    }

    /// 链路完成一次发送：继续发送队列中的下一个 packet
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sched: &mut dyn Scheduler) {
        let Some(link) = self.links.get_mut(link_id.0) else {
            return;
        };
        link.busy = false;
        if !link.queue.is_empty() {
            self.start_tx(link_id, sched);
        }
    }
}
