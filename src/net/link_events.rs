//! 链路上的两类事件：数据包到达下一跳、链路空闲可以发送下一个 packet

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::trace;

/// 在 arrive 时刻把 packet 交给链路对端节点
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        trace!(pkt_id = pkt.id, ?to, now = ?sim.now(), "📨 数据包到达节点");
        NetWorld::downcast(world).net.deliver(to, pkt, sim);
    }
}

/// 在 depart 时刻触发：上一个 packet 序列化完毕，尝试出队下一个
#[derive(Debug)]
pub struct LinkReady {
    pub link_id: LinkId,
}

impl Event for LinkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        NetWorld::downcast(world).net.on_link_ready(self.link_id, sim);
    }
}
