//! 追踪记录
//!
//! 文本格式：`time<TAB>value1[<TAB>value2 ...]`，时间以秒输出。

use std::fmt;

use serde::Serialize;

use crate::sim::SimTime;

/// 记录中的单个字段。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceField {
    Uint(u64),
    Float(f64),
    /// 时间值（以秒输出）
    Time(SimTime),
}

impl fmt::Display for TraceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceField::Uint(v) => write!(f, "{v}"),
            TraceField::Float(v) => write!(f, "{v}"),
            TraceField::Time(t) => write!(f, "{}", t.as_secs_f64()),
        }
    }
}

/// 一条不可变的 `(timestamp, payload)` 记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub time: SimTime,
    pub fields: Vec<TraceField>,
}

impl TraceRecord {
    pub fn new(time: SimTime, fields: Vec<TraceField>) -> Self {
        Self { time, fields }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.as_secs_f64())?;
        for field in &self.fields {
            write!(f, "\t{field}")?;
        }
        Ok(())
    }
}
