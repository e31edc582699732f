//! 恒定比特率流量源
//!
//! 状态机：`Idle -> Running -> Stopped`。
//!
//! - `start`：绑定、连接、立即发送第一个单元，之后按 `unit_bytes * 8 / rate` 的固定间隔自我调度
//! - 发送结果（传输层是否接受）不检查：节奏只由速率决定，被拒绝的单元不会重发
//! - 达到配额后不再调度，但保持 Running，直到外部 `stop`
//! - `stop`：取消待发送事件并关闭传输端点；重复调用无副作用

use serde::Serialize;
use tracing::{debug, trace};

use super::ConfigError;
use super::events::AppSend;
use crate::net::{Address, DataRate};
use crate::proto::socket::Socket;
use crate::proto::tcp::SocketId;
use crate::sim::{EventId, Scheduler, SchedulerExt, SimTime};
use crate::trace::TracedCallback;

pub type AppId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct CbrApp {
    id: AppId,
    socket: Option<SocketId>,
    peer: Option<Address>,
    unit_bytes: u32,
    quota: u64,
    rate: DataRate,
    /// 至多一个待执行的发送事件
    send_event: Option<EventId>,
    running: bool,
    state: AppState,
    sent: u64,
    tx: TracedCallback<u32>,
}

impl CbrApp {
    pub fn new(id: AppId) -> Self {
        Self {
            id,
            socket: None,
            peer: None,
            unit_bytes: 0,
            quota: 0,
            rate: DataRate::default(),
            send_event: None,
            running: false,
            state: AppState::Idle,
            sent: 0,
            tx: TracedCallback::default(),
        }
    }

    /// 纯状态初始化，不触碰仿真环境。
    pub fn configure(
        &mut self,
        socket: SocketId,
        peer: Address,
        unit_bytes: u32,
        quota: u64,
        rate: DataRate,
    ) -> Result<(), ConfigError> {
        assert_eq!(
            self.state,
            AppState::Idle,
            "configure() is only valid before start()"
        );
        if unit_bytes == 0 {
            return Err(ConfigError::ZeroUnitSize);
        }
        if quota == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        if rate.is_zero() {
            return Err(ConfigError::ZeroRate);
        }
        self.socket = Some(socket);
        self.peer = Some(peer);
        self.unit_bytes = unit_bytes;
        self.quota = quota;
        self.rate = rate;
        Ok(())
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn socket(&self) -> Option<SocketId> {
        self.socket
    }

    pub fn peer(&self) -> Option<Address> {
        self.peer
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn units_sent(&self) -> u64 {
        self.sent
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn unit_bytes(&self) -> u32 {
        self.unit_bytes
    }

    pub fn rate(&self) -> DataRate {
        self.rate
    }

    pub fn pending_send(&self) -> Option<EventId> {
        self.send_event
    }

    /// 每个单元交给传输层时触发（参数为单元大小）
    pub fn connect_tx(&mut self, f: impl FnMut(SimTime, &u32) + Send + 'static) {
        self.tx.connect(f);
    }

    /// 相邻两个单元之间的间隔：`unit_bytes * 8 / rate` 秒
    pub fn inter_unit_delay(&self) -> SimTime {
        self.rate.tx_time(self.unit_bytes as u64)
    }

    #[tracing::instrument(skip(self, sched, sock), fields(app = self.id))]
    pub fn start(&mut self, sched: &mut dyn Scheduler, sock: &mut dyn Socket) {
        assert_eq!(self.state, AppState::Idle, "start() is only valid from Idle");
        let peer = self.peer.expect("start() before configure()");

        sock.bind();
        sock.connect(peer);
        self.sent = 0;
        self.running = true;
        self.state = AppState::Running;
        debug!(now = ?sched.now(), interval = ?self.inter_unit_delay(), "▶️  CBR app started");

        self.send_one(sched, sock);
    }

    #[tracing::instrument(skip(self, sched, sock), fields(app = self.id))]
    pub fn stop(&mut self, sched: &mut dyn Scheduler, sock: &mut dyn Socket) {
        match self.state {
            AppState::Stopped => {
                trace!("already stopped");
                return;
            }
            AppState::Idle => panic!("stop() called before start()"),
            AppState::Running => {}
        }

        self.running = false;
        if let Some(ev) = self.send_event.take() {
            sched.cancel(ev);
        }
        sock.close();
        self.state = AppState::Stopped;
        debug!(now = ?sched.now(), sent = self.sent, "⏹️  CBR app stopped");
    }

    /// 发送一个单元，必要时调度下一个。
    pub(crate) fn send_one(&mut self, sched: &mut dyn Scheduler, sock: &mut dyn Socket) {
        self.send_event = None;
        if !self.running {
            trace!(app = self.id, "send fired while not running; ignored");
            return;
        }

        let now = sched.now();
        let outcome = sock.send(self.unit_bytes, sched);
        self.sent += 1;
        debug!(app = self.id, n = self.sent, t = now.as_secs_f64(), ?outcome, "Sending");
        self.tx.invoke(now, &self.unit_bytes);

        if self.sent < self.quota && self.running {
            let delay = self.inter_unit_delay();
            self.send_event = Some(sched.schedule_in(delay, AppSend { app: self.id }));
        }
    }
}
