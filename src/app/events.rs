//! 应用层事件与调度入口

use tracing::warn;

use super::cbr::{AppId, CbrApp};
use super::throughput::{ByteCounter, SamplerId, ThroughputSampler};
use crate::net::NetWorld;
use crate::proto::socket::Socket;
use crate::sim::{Event, SchedulerExt, SimTime, Simulator, World};

/// 取出应用及其传输端点句柄；规避同时借用 `w.apps`、`w.net` 与 `w.net.tcp`。
fn with_app<F>(world: &mut dyn World, id: AppId, f: F)
where
    F: FnOnce(&mut CbrApp, &mut dyn Socket),
{
    let NetWorld { net, apps, .. } = NetWorld::downcast(world);
    let Some(app) = apps.get_mut(id) else {
        warn!(app = id, "event for unknown app");
        return;
    };
    let Some(sock) = app.socket() else {
        warn!(app = id, "app has no transport handle");
        return;
    };
    let mut tcp = std::mem::take(&mut net.tcp);
    f(app, &mut tcp.handle(sock, net));
    net.tcp = tcp;
}

#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |app, sock| app.start(sim, sock));
    }
}

#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

impl Event for AppStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |app, sock| app.stop(sim, sock));
    }
}

/// 自定时发送事件
#[derive(Debug)]
pub struct AppSend {
    pub app: AppId,
}

impl Event for AppSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app(world, self.app, |app, sock| app.send_one(sim, sock));
    }
}

/// 取出采样器及其字节计数器；任一缺失时记录告警并返回 `None`
fn with_sampler<R>(
    world: &mut dyn World,
    id: SamplerId,
    f: impl FnOnce(&mut ThroughputSampler, &dyn ByteCounter) -> R,
) -> Option<R> {
    let NetWorld { net, samplers, .. } = NetWorld::downcast(world);
    let Some(sampler) = samplers.get_mut(id) else {
        warn!(sampler = id, "event for unknown sampler");
        return None;
    };
    let Some(counter) = net.tcp.sink(sampler.source()) else {
        warn!(sampler = id, sink = sampler.source(), "byte counter missing; sampler stops");
        return None;
    };
    Some(f(sampler, counter))
}

/// 记录计数器基线但不输出，一个 `interval` 之后开始正式采样
#[derive(Debug)]
pub struct SampleBaseline {
    pub sampler: SamplerId,
}

impl Event for SampleBaseline {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let id = self.sampler;
        let now = sim.now();
        let interval = with_sampler(world, id, |sampler, counter| {
            sampler.baseline(now, counter);
            sampler.interval()
        });
        if let Some(interval) = interval {
            sim.schedule_in(interval, SampleThroughput { sampler: id });
        }
    }
}

/// 采样一次并在 `interval` 之后再次调度自己；没有自然终止，随仿真结束而停止
#[derive(Debug)]
pub struct SampleThroughput {
    pub sampler: SamplerId,
}

impl Event for SampleThroughput {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let id = self.sampler;
        let now = sim.now();
        let interval = with_sampler(world, id, |sampler, counter| {
            sampler.sample(now, counter);
            sampler.interval()
        });
        if let Some(interval) = interval {
            sim.schedule_in(interval, SampleThroughput { sampler: id });
        }
    }
}

/// 调度应用的启动与（可选的）停止
pub fn schedule_app(sim: &mut Simulator, app: AppId, start: SimTime, stop: Option<SimTime>) {
    sim.schedule(start, AppStart { app });
    if let Some(stop) = stop {
        sim.schedule(stop, AppStop { app });
    }
}

/// 安排第一次输出落在 `first` 的采样
///
/// 基线在 `first - interval` 读取，使每个窗口都恰好覆盖一个 `interval`。
/// `first` 早于一个 `interval` 时，基线改在 `first` 读取，第一次输出顺延到 `first + interval`。
pub fn schedule_sampler(sim: &mut Simulator, interval: SimTime, sampler: SamplerId, first: SimTime) {
    let baseline_at = if first >= interval { first.saturating_sub(interval) } else { first };
    sim.schedule(baseline_at, SampleBaseline { sampler });
}
