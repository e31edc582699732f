//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：链路、数据包、路由、拓扑与仿真世界。

// 子模块声明
mod data_rate;
mod id;
mod link;
mod link_events;
mod net_world;
mod network;
mod network_proto;
mod packet;
mod routing;
mod stats;

// 重新导出公共接口
pub use data_rate::{DataRate, DataRateError};
pub use id::{Address, LinkId, NodeId};
pub use link::Link;
pub use link_events::{DeliverPacket, LinkReady};
pub use net_world::NetWorld;
pub use network::{DropEvent, Network};
pub use packet::{Packet, TcpSegment, Transport};
pub use routing::RoutingTable;
pub use stats::Stats;
