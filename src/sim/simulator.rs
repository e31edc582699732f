//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::{Event, World};
use super::scheduled_event::ScheduledEvent;
use super::scheduler::{EventId, Scheduler};
use super::time::SimTime;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 取消采用惰性删除：被取消的事件仍留在堆中，弹出时因不在 `pending` 集合里而被跳过，
/// 因此即使取消发生在与该事件相同的仿真时刻，它也不会执行。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    pending: HashSet<EventId>,
    executed: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件数（不含被取消的事件）
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// 事件是否仍在等待执行
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id)
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        self.push(at, Box::new(ev))
    }

    /// 取消尚未执行的事件
    pub fn cancel(&mut self, id: EventId) -> bool {
        let was_pending = self.pending.remove(&id);
        debug!(seq = id.seq(), was_pending, "取消事件");
        was_pending
    }

    fn push(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId {
        // 不允许调度到过去：最早也是“当前时刻”，保持时间单调。
        let at = at.max(self.now);
        let id = EventId(self.next_seq);
        trace!(now = ?self.now, seq = id.seq(), event = ev.name(), "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.insert(id);
        self.q.push(ScheduledEvent { at, id, ev });
        id
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                break;
            }
            let Some(item) = self.q.pop() else {
                break;
            };
            if !self.pending.remove(&item.id) {
                trace!(seq = item.id.seq(), "跳过已取消事件");
                continue;
            }
            self.now = item.at;
            self.executed += 1;
            trace!(now = ?self.now, event = item.ev.name(), "执行事件");
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(item) = self.q.pop() {
            if !self.pending.remove(&item.id) {
                trace!(seq = item.id.seq(), "跳过已取消事件");
                continue;
            }
            event_count += 1;
            self.executed += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.id.seq(),
                event = item.ev.name(),
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}

impl Scheduler for Simulator {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_boxed(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId {
        self.push(at, ev)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        Simulator::cancel(self, id)
    }
}
