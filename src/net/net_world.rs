//! 仿真世界：网络（含 TCP 栈与收包应用）、发包应用、吞吐量采样器。

use super::network::Network;
use crate::app::{CbrApp, ThroughputSampler};
use crate::proto::tcp::TcpStack;
use crate::sim::World;
use std::any::Any;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: Vec<CbrApp>,
    pub samplers: Vec<ThroughputSampler>,
}

impl NetWorld {
    /// 本 crate 的所有事件都运行在 `NetWorld` 上
    pub(crate) fn downcast(world: &mut dyn World) -> &mut NetWorld {
        world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld")
    }

    /// 暂时把 TCP 栈从网络中取出，规避同时借用 `net` 与 `net.tcp`。
    pub(crate) fn with_tcp_stack<R>(
        world: &mut dyn World,
        f: impl FnOnce(&mut Network, &mut TcpStack) -> R,
    ) -> R {
        let net = &mut Self::downcast(world).net;
        let mut tcp = std::mem::take(&mut net.tcp);
        let out = f(net, &mut tcp);
        net.tcp = tcp;
        out
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
