//! 追踪模块
//!
//! 通知源（`TracedValue` / `TracedCallback`）、只追加的记录输出，
//! 以及把通知转成时间序列的观察者。

mod observers;
mod record;
mod sink;
mod traced;

pub use observers::{
    RxSize, TraceStream, drop_observer, rx_observer, sequence_observer, time_observer,
    window_observer,
};
pub(crate) use observers::append;
pub use record::{TraceField, TraceRecord};
pub use sink::{AsciiTraceSink, MemoryTraceSink, SharedTraceSink, TraceError, TraceSink, shared};
pub use traced::{TracedCallback, TracedValue};
