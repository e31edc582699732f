//! TCP（简化版）协议实现
//!
//! 面向单向批量传输实验的极简 TCP：
//! - 有界发送缓冲区（满则拒绝应用写入）
//! - Reno/NewReno 风格拥塞控制（慢启动 + AIMD，3 dupACK 快速重传，部分 ACK 继续重传）
//! - RFC 6298 RTT 估计与指数退避 RTO（可取消的定时器）
//! - 接收端乱序重组，按序交付给收包应用
//!
//! 不实现握手/窗口通告/选择确认。连接在 `connect` 时即视为建立。
//!
//! 对外暴露四个通知源：`CongestionWindow`、`RTT`、`RTO`、`NextTxSequence`。

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace, warn};

use crate::app::{PacketSink, SinkId};
use crate::net::{Address, NetWorld, Network, NodeId, TcpSegment, Transport};
use crate::proto::socket::{SendOutcome, Socket};
use crate::sim::{Event, EventId, Scheduler, SchedulerExt, SimTime, Simulator, World};
use crate::trace::{
    SharedTraceSink, TraceStream, TracedValue, sequence_observer, time_observer, window_observer,
};

/// 套接字标识（同时作为数据包的 `flow_id`）。
pub type SocketId = usize;

const EPHEMERAL_PORT_START: u16 = 49153;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// 数据段载荷大小（字节）
    pub segment_size: u32,
    /// 每个数据段附加的头部开销（字节）
    pub header_bytes: u32,
    /// ACK 包大小（字节）
    pub ack_bytes: u32,
    /// 发送缓冲区（已写入但尚未确认的字节上限）
    pub snd_buf_bytes: u64,
    /// 初始 cwnd（单位：段）
    pub init_cwnd_segments: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO
    pub init_rto: SimTime,
    pub min_rto: SimTime,
    pub max_rto: SimTime,
    /// RTO 计算中的时钟粒度 G
    pub clock_granularity: SimTime,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            segment_size: 1000,
            header_bytes: 40,
            ack_bytes: 40,
            snd_buf_bytes: 131_072 * 40,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX as u64,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            clock_granularity: SimTime::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Unbound,
    Bound,
    Established,
    /// 应用已关闭：不再接受写入，已缓冲的数据继续发完
    Closed,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retransmitted: bool,
}

/// 丢包恢复阶段：`high` 为进入时的 snd_nxt
#[derive(Debug, Clone, Copy)]
enum Recovery {
    Fast { high: u64 },
    Timeout { high: u64 },
}

#[derive(Debug)]
pub struct TcpSocket {
    id: SocketId,
    node: NodeId,
    local_port: Option<u16>,
    peer: Option<Address>,
    sink: Option<SinkId>,
    state: TcpState,
    cfg: TcpConfig,

    // sender
    snd_end: u64,
    snd_una: u64,
    next_tx: TracedValue<u64>,
    cwnd: TracedValue<u64>,
    ssthresh: u64,
    dup_acks: u32,
    recovery: Option<Recovery>,
    inflight: BTreeMap<u64, SentSeg>, // seq -> segment
    srtt: Option<SimTime>,
    rttvar: SimTime,
    rtt: TracedValue<SimTime>,
    rto: TracedValue<SimTime>,
    rto_event: Option<EventId>,

    // receiver（对端的接收状态也放在连接里）
    rcv_nxt: u64,
    out_of_order: BTreeMap<u64, u32>,

    // stats
    accepted_bytes: u64,
    rejected_sends: u64,
    retransmits: u64,
}

impl TcpSocket {
    fn new(id: SocketId, node: NodeId, cfg: TcpConfig) -> Self {
        let mss = cfg.segment_size.max(1) as u64;
        let cwnd = cfg.init_cwnd_segments.max(1).saturating_mul(mss);
        let ssthresh = cfg.init_ssthresh_bytes.max(2 * mss);
        let init_rto = cfg.init_rto;
        Self {
            id,
            node,
            local_port: None,
            peer: None,
            sink: None,
            state: TcpState::Unbound,
            cfg,
            snd_end: 0,
            snd_una: 0,
            next_tx: TracedValue::new(0),
            cwnd: TracedValue::new(cwnd),
            ssthresh,
            dup_acks: 0,
            recovery: None,
            inflight: BTreeMap::new(),
            srtt: None,
            rttvar: SimTime::ZERO,
            rtt: TracedValue::new(SimTime::ZERO),
            rto: TracedValue::new(init_rto),
            rto_event: None,
            rcv_nxt: 0,
            out_of_order: BTreeMap::new(),
            accepted_bytes: 0,
            rejected_sends: 0,
            retransmits: 0,
        }
    }

    pub fn id(&self) -> SocketId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn local_address(&self) -> Option<Address> {
        self.local_port.map(|port| Address::new(self.node, port))
    }

    pub fn peer(&self) -> Option<Address> {
        self.peer
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd.get()
    }

    pub fn rto(&self) -> SimTime {
        self.rto.get()
    }

    pub fn last_rtt(&self) -> SimTime {
        self.rtt.get()
    }

    pub fn next_tx_seq(&self) -> u64 {
        self.next_tx.get()
    }

    /// 已被累计确认的字节数
    pub fn bytes_acked(&self) -> u64 {
        self.snd_una
    }

    pub fn accepted_bytes(&self) -> u64 {
        self.accepted_bytes
    }

    pub fn rejected_sends(&self) -> u64 {
        self.rejected_sends
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    /// 把某个通知源绑定到一个输出（按通知到达顺序逐条追加）。
    /// `Rx`/`Drop` 不属于套接字，返回 false。
    pub fn trace_connect(&mut self, stream: TraceStream, sink: SharedTraceSink) -> bool {
        match stream {
            TraceStream::CongestionWindow => self.cwnd.connect(window_observer(sink)),
            TraceStream::Rtt => self.rtt.connect(time_observer(sink)),
            TraceStream::Rto => self.rto.connect(time_observer(sink)),
            TraceStream::NextTxSequence => self.next_tx.connect(sequence_observer(sink)),
            TraceStream::Rx | TraceStream::Drop => return false,
        }
        true
    }

    /// 直接订阅 cwnd 变化（old, new）
    pub fn on_cwnd_change(&mut self, f: impl FnMut(SimTime, &u64, &u64) + Send + 'static) {
        self.cwnd.connect(f);
    }

    fn mss(&self) -> u64 {
        self.cfg.segment_size.max(1) as u64
    }

    fn flight_size(&self) -> u64 {
        self.next_tx.get().saturating_sub(self.snd_una)
    }

    /// RFC 6298
    fn update_rtt(&mut self, now: SimTime, r: SimTime) {
        match self.srtt {
            None => {
                self.srtt = Some(r);
                self.rttvar = SimTime(r.0 / 2);
            }
            Some(srtt) => {
                let diff = srtt.0.abs_diff(r.0);
                self.rttvar = SimTime((3 * self.rttvar.0 + diff) / 4);
                self.srtt = Some(SimTime((7 * srtt.0 + r.0) / 8));
            }
        }
        let srtt = self.srtt.unwrap_or(r);
        let k = self.cfg.clock_granularity.max(SimTime(4 * self.rttvar.0));
        let rto = srtt
            .saturating_add(k)
            .max(self.cfg.min_rto)
            .min(self.cfg.max_rto);
        self.rtt.set(now, r);
        self.rto.set(now, rto);
    }

    /// 接收端：返回新的按序可交付字节数
    fn receive(&mut self, seq: u64, len: u32) -> u64 {
        let before = self.rcv_nxt;
        if seq == self.rcv_nxt {
            self.rcv_nxt = self.rcv_nxt.saturating_add(len as u64);
            while let Some((&s, &l)) = self.out_of_order.first_key_value() {
                if s > self.rcv_nxt {
                    break;
                }
                self.out_of_order.remove(&s);
                self.rcv_nxt = self.rcv_nxt.max(s.saturating_add(l as u64));
            }
        } else if seq > self.rcv_nxt {
            self.out_of_order.insert(seq, len);
        }
        self.rcv_nxt - before
    }
}

#[derive(Debug)]
pub struct TcpStack {
    sockets: Vec<TcpSocket>,
    sinks: Vec<PacketSink>,
    listeners: HashMap<Address, SinkId>,
    next_port: u16,
}

impl Default for TcpStack {
    fn default() -> Self {
        Self {
            sockets: Vec::new(),
            sinks: Vec::new(),
            listeners: HashMap::new(),
            next_port: EPHEMERAL_PORT_START,
        }
    }
}

impl TcpStack {
    /// 在某节点上创建一个未绑定的套接字
    pub fn create_socket(&mut self, node: NodeId, cfg: TcpConfig) -> SocketId {
        let id = self.sockets.len();
        self.sockets.push(TcpSocket::new(id, node, cfg));
        id
    }

    /// 在 `local` 上安装收包应用，之后连接到该地址的数据会交付给它
    pub fn install_sink(&mut self, local: Address) -> SinkId {
        let id = self.sinks.len();
        self.sinks.push(PacketSink::new(local));
        self.listeners.insert(local, id);
        id
    }

    pub fn socket(&self, id: SocketId) -> Option<&TcpSocket> {
        self.sockets.get(id)
    }

    pub fn socket_mut(&mut self, id: SocketId) -> Option<&mut TcpSocket> {
        self.sockets.get_mut(id)
    }

    pub fn sink(&self, id: SinkId) -> Option<&PacketSink> {
        self.sinks.get(id)
    }

    pub fn sink_mut(&mut self, id: SinkId) -> Option<&mut PacketSink> {
        self.sinks.get_mut(id)
    }

    /// 借出一个实现 `Socket` 接口的句柄
    pub fn handle<'a>(&'a mut self, id: SocketId, net: &'a mut Network) -> SocketHandle<'a> {
        SocketHandle {
            stack: self,
            net,
            id,
        }
    }

    pub fn bind(&mut self, id: SocketId) {
        let port = self.next_port;
        let Some(sock) = self.sockets.get_mut(id) else {
            warn!(id, "bind on unknown socket");
            return;
        };
        if sock.state != TcpState::Unbound {
            return;
        }
        self.next_port = self.next_port.wrapping_add(1).max(EPHEMERAL_PORT_START);
        sock.local_port = Some(port);
        sock.state = TcpState::Bound;
        debug!(id, port, "socket bound");
    }

    pub fn connect(&mut self, id: SocketId, peer: Address) {
        if self.sockets.get(id).is_some_and(|s| s.state == TcpState::Unbound) {
            self.bind(id);
        }
        let sink = self.listeners.get(&peer).copied();
        let Some(sock) = self.sockets.get_mut(id) else {
            warn!(id, "connect on unknown socket");
            return;
        };
        if sink.is_none() {
            warn!(id, ?peer, "no listener at peer; received data will not be counted");
        }
        sock.peer = Some(peer);
        sock.sink = sink;
        sock.state = TcpState::Established;
        debug!(id, ?peer, "socket connected");
    }

    pub fn close(&mut self, id: SocketId) {
        if let Some(sock) = self.sockets.get_mut(id) {
            sock.state = TcpState::Closed;
            debug!(id, "socket closed by application");
        }
    }

    /// 应用写入：放入发送缓冲区并尽可能发送
    pub fn send(
        &mut self,
        id: SocketId,
        size_bytes: u32,
        sched: &mut dyn Scheduler,
        net: &mut Network,
    ) -> SendOutcome {
        let Some(sock) = self.sockets.get_mut(id) else {
            return SendOutcome::Rejected;
        };
        let buffered = sock.snd_end - sock.snd_una;
        if sock.state != TcpState::Established
            || buffered.saturating_add(size_bytes as u64) > sock.cfg.snd_buf_bytes
        {
            sock.rejected_sends += 1;
            trace!(id, buffered, "send rejected");
            return SendOutcome::Rejected;
        }
        sock.snd_end += size_bytes as u64;
        sock.accepted_bytes += size_bytes as u64;
        self.send_data_if_possible(id, sched, net);
        SendOutcome::Accepted
    }

    pub(crate) fn send_data_if_possible(
        &mut self,
        id: SocketId,
        sched: &mut dyn Scheduler,
        net: &mut Network,
    ) {
        let Some(sock) = self.sockets.get_mut(id) else {
            return;
        };
        let Some(peer) = sock.peer else {
            return;
        };
        let now = sched.now();
        let mss = sock.mss();

        // 发送窗口：flight size < cwnd
        loop {
            let flight = sock.flight_size();
            let cwnd = sock.cwnd.get();
            let next = sock.next_tx.get();
            if flight >= cwnd || next >= sock.snd_end {
                break;
            }
            let len = mss.min(sock.snd_end - next).min(cwnd - flight) as u32;

            emit_data(sock, peer, next, len, sched, net);
            sock.inflight.insert(
                next,
                SentSeg {
                    len,
                    sent_at: now,
                    retransmitted: false,
                },
            );
            sock.next_tx.set(now, next + len as u64);
        }

        if sock.rto_event.is_none() && !sock.inflight.is_empty() {
            arm_rto(sock, sched);
        }
    }

    /// 重传最早的未确认段
    fn retransmit_earliest(sock: &mut TcpSocket, sched: &mut dyn Scheduler, net: &mut Network) {
        let Some(peer) = sock.peer else {
            return;
        };
        let now = sched.now();
        let Some((&seq, seg)) = sock.inflight.iter_mut().next() else {
            return;
        };
        seg.retransmitted = true;
        seg.sent_at = now;
        let len = seg.len;
        sock.retransmits += 1;
        debug!(id = sock.id, seq, len, "retransmit");
        emit_data(sock, peer, seq, len, sched, net);
    }

    pub fn on_tcp_segment(
        &mut self,
        conn_id: u64,
        at: NodeId,
        seg: TcpSegment,
        sched: &mut dyn Scheduler,
        net: &mut Network,
    ) {
        let id = conn_id as SocketId;
        let TcpStack { sockets, sinks, .. } = &mut *self;
        let Some(sock) = sockets.get_mut(id) else {
            return;
        };
        let now = sched.now();

        match seg {
            TcpSegment::Data { seq, len } => {
                let Some(peer) = sock.peer else {
                    return;
                };
                if at != peer.node {
                    return;
                }
                let delivered = sock.receive(seq, len);
                if delivered > 0 {
                    if let Some(sink) = sock.sink.and_then(|s| sinks.get_mut(s)) {
                        let from = sock
                            .local_address()
                            .unwrap_or(Address::new(sock.node, 0));
                        sink.on_rx(now, delivered, from);
                    }
                }
                // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
                let ack = sock.rcv_nxt;
                let mut pkt = net.make_packet(conn_id, sock.cfg.ack_bytes, peer.node, sock.node);
                pkt.transport = Transport::Tcp(TcpSegment::Ack { ack });
                net.forward_from(peer.node, pkt, sched);
            }
            TcpSegment::Ack { ack } => {
                if at != sock.node {
                    return;
                }
                let mss = sock.mss();
                if ack > sock.snd_una {
                    let newly_acked = ack - sock.snd_una;
                    sock.snd_una = ack;
                    sock.dup_acks = 0;

                    // 移除已确认段；按 Karn 规则只用未重传过的段采样 RTT
                    let mut sample = None;
                    while let Some((&s, sent)) = sock.inflight.first_key_value() {
                        if s.saturating_add(sent.len as u64) > ack {
                            break;
                        }
                        if !sent.retransmitted {
                            sample = Some(now.saturating_sub(sent.sent_at));
                        }
                        sock.inflight.remove(&s);
                    }
                    if let Some(r) = sample {
                        sock.update_rtt(now, r);
                    }

                    match sock.recovery {
                        Some(Recovery::Fast { high }) if ack < high => {
                            // 部分 ACK：继续重传下一个空洞，cwnd 部分收缩
                            let cwnd = sock.cwnd.get().saturating_sub(newly_acked) + mss;
                            sock.cwnd.set(now, cwnd);
                            Self::retransmit_earliest(sock, sched, net);
                        }
                        Some(Recovery::Fast { .. }) => {
                            sock.recovery = None;
                            sock.cwnd.set(now, sock.ssthresh);
                        }
                        Some(Recovery::Timeout { high }) if ack < high => {
                            grow_cwnd(sock, now, newly_acked);
                            Self::retransmit_earliest(sock, sched, net);
                        }
                        Some(Recovery::Timeout { .. }) => {
                            sock.recovery = None;
                            grow_cwnd(sock, now, newly_acked);
                        }
                        None => grow_cwnd(sock, now, newly_acked),
                    }

                    // 刷新 RTO
                    if let Some(ev) = sock.rto_event.take() {
                        sched.cancel(ev);
                    }
                    if !sock.inflight.is_empty() {
                        arm_rto(sock, sched);
                    }

                    self.send_data_if_possible(id, sched, net);
                } else if ack == sock.snd_una && !sock.inflight.is_empty() {
                    sock.dup_acks = sock.dup_acks.saturating_add(1);
                    let dup = sock.dup_acks;
                    if dup == 3 && sock.recovery.is_none() {
                        // 快速重传 + 进入快速恢复
                        sock.ssthresh = (sock.flight_size() / 2).max(2 * mss);
                        sock.cwnd.set(now, sock.ssthresh + 3 * mss);
                        sock.recovery = Some(Recovery::Fast {
                            high: sock.next_tx.get(),
                        });
                        Self::retransmit_earliest(sock, sched, net);
                    } else if dup > 3 && matches!(sock.recovery, Some(Recovery::Fast { .. })) {
                        // 每个额外 dupACK 膨胀 cwnd 一个 MSS
                        sock.cwnd.set(now, sock.cwnd.get() + mss);
                        self.send_data_if_possible(id, sched, net);
                    }
                }
            }
        }
    }

    /// 重传定时器到期
    pub(crate) fn on_rto(&mut self, id: SocketId, sched: &mut dyn Scheduler, net: &mut Network) {
        let Some(sock) = self.sockets.get_mut(id) else {
            return;
        };
        sock.rto_event = None;
        if sock.inflight.is_empty() {
            return;
        }
        let now = sched.now();
        let mss = sock.mss();

        // 超时：回到慢启动，RTO 指数退避
        sock.ssthresh = (sock.flight_size() / 2).max(2 * mss);
        sock.cwnd.set(now, mss);
        sock.dup_acks = 0;
        sock.recovery = Some(Recovery::Timeout {
            high: sock.next_tx.get(),
        });
        let backoff = SimTime(sock.rto.get().0.saturating_mul(2)).min(sock.cfg.max_rto);
        sock.rto.set(now, backoff);
        debug!(id, rto = ?backoff, "⏰ RTO fired");

        Self::retransmit_earliest(sock, sched, net);
        arm_rto(sock, sched);
    }
}

fn emit_data(
    sock: &TcpSocket,
    peer: Address,
    seq: u64,
    len: u32,
    sched: &mut dyn Scheduler,
    net: &mut Network,
) {
    let size = len.saturating_add(sock.cfg.header_bytes);
    let mut pkt = net.make_packet(sock.id as u64, size, sock.node, peer.node);
    pkt.transport = Transport::Tcp(TcpSegment::Data { seq, len });
    net.forward_from(sock.node, pkt, sched);
}

fn arm_rto(sock: &mut TcpSocket, sched: &mut dyn Scheduler) {
    let ev = sched.schedule_in(sock.rto.get(), TcpRto { socket: sock.id });
    sock.rto_event = Some(ev);
}

/// 慢启动 / 拥塞避免
fn grow_cwnd(sock: &mut TcpSocket, now: SimTime, newly_acked: u64) {
    let mss = sock.mss();
    let cwnd = sock.cwnd.get();
    let next = if cwnd < sock.ssthresh {
        cwnd.saturating_add(newly_acked.min(mss))
    } else {
        // AIMD：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
        cwnd.saturating_add((mss.saturating_mul(mss) / cwnd.max(1)).max(1))
    };
    sock.cwnd.set(now, next);
}

/// 借出的套接字句柄：把 `Socket` 接口映射到 TCP 栈 + 网络
pub struct SocketHandle<'a> {
    stack: &'a mut TcpStack,
    net: &'a mut Network,
    id: SocketId,
}

impl Socket for SocketHandle<'_> {
    fn bind(&mut self) {
        self.stack.bind(self.id);
    }

    fn connect(&mut self, peer: Address) {
        self.stack.connect(self.id, peer);
    }

    fn send(&mut self, size_bytes: u32, sched: &mut dyn Scheduler) -> SendOutcome {
        self.stack.send(self.id, size_bytes, sched, self.net)
    }

    fn close(&mut self) {
        self.stack.close(self.id);
    }
}

/// TCP RTO 事件（被新的 ACK 刷新时会先取消旧事件）
#[derive(Debug)]
pub struct TcpRto {
    pub socket: SocketId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { socket } = *self;
        NetWorld::with_tcp_stack(world, |net, tcp| tcp.on_rto(socket, sim, net));
    }
}
