//! 调度器能力接口
//!
//! 业务组件（应用、协议栈、采样器）只依赖这里的最小接口：
//! 读当前时间、在某时刻调度事件、取消尚未执行的事件。
//! `Simulator` 是唯一的生产实现；测试可以自行实现一个假时钟。

use super::event::Event;
use super::time::SimTime;

/// 已调度事件的句柄，可用于取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub(crate) u64);

impl EventId {
    /// 全局唯一的调度序号（同一个调度器内）。
    pub fn seq(&self) -> u64 {
        self.0
    }
}

pub trait Scheduler {
    fn now(&self) -> SimTime;

    /// 在绝对时间 `at` 调度事件。
    fn schedule_boxed(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId;

    /// 取消尚未执行的事件；返回该事件此前是否仍处于待执行状态。
    fn cancel(&mut self, id: EventId) -> bool;
}

/// `Scheduler` 的泛型便捷方法（对 `dyn Scheduler` 同样可用）。
pub trait SchedulerExt: Scheduler {
    fn schedule_at<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        self.schedule_boxed(at, Box::new(ev))
    }

    /// 在当前时间之后 `delay` 调度事件。
    fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now().saturating_add(delay);
        self.schedule_boxed(at, Box::new(ev))
    }
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}
