//! 数据包与其携带的传输层标签

use super::id::NodeId;

/// 网络数据包（逐跳按路由表转发）
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    /// 所属连接（TCP 套接字 id）
    pub flow_id: u64,
    /// 线上大小：载荷 + 头部
    pub size_bytes: u32,
    pub src: NodeId,
    pub dst: NodeId,
    /// 已经走过的跳数
    pub hops_taken: usize,
    pub transport: Transport,
}

impl Packet {
    pub fn new(id: u64, flow_id: u64, size_bytes: u32, src: NodeId, dst: NodeId) -> Self {
        Self {
            id,
            flow_id,
            size_bytes,
            src,
            dst,
            hops_taken: 0,
            transport: Transport::None,
        }
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hops_taken += 1;
        self
    }
}

/// 网络层只负责搬运，协议语义由传输层解释。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// 裸数据包，送达后只计入统计
    #[default]
    None,
    Tcp(TcpSegment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSegment {
    /// `seq` 为字节序号，`len` 为载荷字节数
    Data { seq: u64, len: u32 },
    /// 累计确认：期望收到的下一个字节
    Ack { ack: u64 },
}
