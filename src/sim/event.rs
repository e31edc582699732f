//! 事件与世界
//!
//! 事件持有执行所需的全部数据，执行时拿到仿真器（用于继续调度）和世界（业务状态）。

use super::simulator::Simulator;
use std::any::Any;

/// 可调度的事件。`self: Box<Self>` 让事件在执行时交出所有权（例如把数据包继续转交下一跳）。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    /// 日志中使用的事件名
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// 仿真世界：事件通过 `as_any_mut` 向下转型到具体类型（如 `NetWorld`）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
