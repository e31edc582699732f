//! 传输层/协议模块
//!
//! `socket` 定义应用看到的传输端点接口；`tcp` 是它在仿真网络上的简化 TCP 实现。

pub mod socket;
pub mod tcp;
