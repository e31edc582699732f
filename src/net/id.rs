//! 标识符类型
//!
//! 定义节点、链路与传输层端点地址。

use serde::{Deserialize, Serialize};

/// 节点标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// 链路标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 传输层端点：节点 + 端口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub node: NodeId,
    pub port: u16,
}

impl Address {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self { node, port }
    }
}
