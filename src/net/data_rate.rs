//! 比特率类型
//!
//! 支持 `"1000Mb/s"`、`"100Gbps"`、`"64kb/s"`、`"9600"` 等写法（十进制前缀）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::sim::SimTime;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataRateError {
    #[error("empty data rate")]
    Empty,
    #[error("invalid number in data rate {0:?}")]
    Number(String),
    #[error("unknown data rate unit {0:?}")]
    Unit(String),
}

/// 比特率（bit/s）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DataRate {
    bps: u64,
}

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self { bps }
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self {
            bps: mbps.saturating_mul(1_000_000),
        }
    }

    pub const fn from_gbps(gbps: u64) -> Self {
        Self {
            bps: gbps.saturating_mul(1_000_000_000),
        }
    }

    pub fn bps(&self) -> u64 {
        self.bps
    }

    pub fn is_zero(&self) -> bool {
        self.bps == 0
    }

    /// 以该速率发送 `bytes` 字节所需的时间：`bytes * 8 / bps` 秒，四舍五入到纳秒。
    pub fn tx_time(&self, bytes: u64) -> SimTime {
        if self.bps == 0 {
            return SimTime::MAX;
        }
        let bits = (bytes as u128).saturating_mul(8);
        let bps = self.bps as u128;
        let nanos = (bits.saturating_mul(1_000_000_000) + bps / 2) / bps;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl FromStr for DataRate {
    type Err = DataRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DataRateError::Empty);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| DataRateError::Number(s.to_string()))?;
        let mult: f64 = match unit.trim() {
            "" | "b/s" | "bps" => 1.0,
            "kb/s" | "kbps" | "Kb/s" | "Kbps" => 1e3,
            "Mb/s" | "Mbps" => 1e6,
            "Gb/s" | "Gbps" => 1e9,
            "Tb/s" | "Tbps" => 1e12,
            other => return Err(DataRateError::Unit(other.to_string())),
        };
        Ok(Self {
            bps: (value * mult).round() as u64,
        })
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 4] = [
            (1_000_000_000_000, "Tb/s"),
            (1_000_000_000, "Gb/s"),
            (1_000_000, "Mb/s"),
            (1_000, "kb/s"),
        ];
        for (scale, unit) in UNITS {
            if self.bps >= scale && self.bps % scale == 0 {
                return write!(f, "{}{}", self.bps / scale, unit);
            }
        }
        write!(f, "{}b/s", self.bps)
    }
}

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
