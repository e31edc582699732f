//! 事件队列中的条目

use super::event::Event;
use super::scheduler::EventId;
use super::time::SimTime;
use std::cmp::Ordering;

/// 已调度的事件：按 `(at, id)` 最小优先出队，同一时刻先调度者先执行。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) id: EventId,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    pub fn at(&self) -> SimTime {
        self.at
    }

    pub fn id(&self) -> EventId {
        self.id
    }
}

// BinaryHeap 是 max-heap，反向比较得到最小堆。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.id.seq())
            .cmp(&(other.at, other.id.seq()))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for ScheduledEvent {}
