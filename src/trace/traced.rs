//! 通知源
//!
//! `TracedValue` 在值变化时把 `(now, old, new)` 推给所有订阅者；
//! `TracedCallback` 用于没有“旧值”概念的离散事件（收包、丢包等）。

use std::fmt;

use crate::sim::SimTime;

type ValueSubscriber<T> = Box<dyn FnMut(SimTime, &T, &T) + Send>;
type CallbackSubscriber<A> = Box<dyn FnMut(SimTime, &A) + Send>;

/// 带变更通知的值。
pub struct TracedValue<T> {
    value: T,
    subscribers: Vec<ValueSubscriber<T>>,
}

impl<T: Clone + PartialEq> TracedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.clone()
    }

    /// 注册订阅者；只会收到注册之后发生的变更。
    pub fn connect(&mut self, f: impl FnMut(SimTime, &T, &T) + Send + 'static) {
        self.subscribers.push(Box::new(f));
    }

    /// 更新值；值未变化时不产生通知。
    pub fn set(&mut self, now: SimTime, new: T) {
        if new == self.value {
            return;
        }
        let old = std::mem::replace(&mut self.value, new);
        for sub in &mut self.subscribers {
            sub(now, &old, &self.value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TracedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedValue")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// 离散事件通知源。
pub struct TracedCallback<A> {
    subscribers: Vec<CallbackSubscriber<A>>,
}

impl<A> Default for TracedCallback<A> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<A> TracedCallback<A> {
    pub fn connect(&mut self, f: impl FnMut(SimTime, &A) + Send + 'static) {
        self.subscribers.push(Box::new(f));
    }

    pub fn invoke(&mut self, now: SimTime, arg: &A) {
        for sub in &mut self.subscribers {
            sub(now, arg);
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.subscribers.is_empty()
    }
}

impl<A> fmt::Debug for TracedCallback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedCallback")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
