use std::sync::{Arc, Mutex};

use crate::app::{ByteCounter, ConfigError, RateUnit, ThroughputSampler, schedule_sampler};
use crate::net::{Address, NetWorld};
use crate::sim::{SimTime, Simulator};
use crate::trace::{MemoryTraceSink, SharedTraceSink, TraceField};

struct Counter(u64);

impl ByteCounter for Counter {
    fn total_rx(&self) -> u64 {
        self.0
    }
}

#[test]
fn rate_is_byte_delta_over_interval_in_mbps() {
    let mut s = ThroughputSampler::new(0, SimTime::from_millis(100)).expect("sampler");
    assert_eq!(s.scaling_constant(), 1e5);

    let first = s.sample(SimTime::from_millis(100), &Counter(0));
    assert_eq!(first.rate, 0.0);

    let second = s.sample(SimTime::from_millis(200), &Counter(125_000));
    assert_eq!(second.rate, 10.0);
    assert_eq!(s.last_sample_time(), SimTime::from_millis(200));

    // 只看增量
    let third = s.sample(SimTime::from_millis(300), &Counter(125_000));
    assert_eq!(third.rate, 0.0);

    let rates: Vec<f64> = s.history().iter().map(|h| h.rate).collect();
    assert_eq!(rates, vec![0.0, 10.0, 0.0]);
}

#[test]
fn baseline_moves_the_window_start_without_output() {
    let mut s = ThroughputSampler::new(0, SimTime::from_millis(50)).expect("sampler");
    s.baseline(SimTime::from_millis(50), &Counter(50_000));
    assert!(s.history().is_empty());
    assert_eq!(s.last_sample_time(), SimTime::from_millis(50));

    // 50ms 内 50KB 即 8 Mbit/s，而不是从 0 累计的 16
    let first = s.sample(SimTime::from_millis(100), &Counter(100_000));
    assert_eq!(first.rate, 8.0);
}

#[test]
fn scaling_follows_interval_and_unit() {
    let mut half = ThroughputSampler::new(0, SimTime::from_millis(50)).expect("sampler");
    assert_eq!(half.scaling_constant(), 5e4);
    assert_eq!(half.sample(SimTime::from_millis(50), &Counter(125_000)).rate, 20.0);

    let mut kbps = ThroughputSampler::new(0, SimTime::from_millis(100))
        .expect("sampler")
        .with_unit(RateUnit::Kbps);
    assert_eq!(kbps.unit().label(), "kbit/s");
    assert_eq!(kbps.sample(SimTime::from_millis(100), &Counter(125_000)).rate, 10_000.0);
}

#[test]
fn reset_returns_to_zero_baseline() {
    let mut s = ThroughputSampler::new(0, SimTime::from_millis(100)).expect("sampler");
    s.sample(SimTime::from_millis(100), &Counter(500));
    s.reset();
    assert!(s.history().is_empty());
    assert_eq!(s.last_sample_time(), SimTime::ZERO);
    assert_eq!(s.sample(SimTime::from_millis(100), &Counter(12_500)).rate, 1.0);
}

#[test]
fn zero_interval_is_rejected() {
    assert_eq!(
        ThroughputSampler::new(0, SimTime::ZERO).err(),
        Some(ConfigError::ZeroInterval)
    );
}

#[test]
fn sampler_event_reschedules_itself_every_interval() {
    let mut world = NetWorld::default();
    let h = world.net.add_host("h");
    let sink = world.net.tcp.install_sink(Address::new(h, 1));

    let mem = Arc::new(Mutex::new(MemoryTraceSink::default()));
    let out: SharedTraceSink = mem.clone();
    world.samplers.push(
        ThroughputSampler::new(sink, SimTime::from_millis(100))
            .expect("sampler")
            .with_output(out),
    );

    let mut sim = Simulator::default();
    schedule_sampler(&mut sim, SimTime::from_millis(100), 0, SimTime::from_millis(100));
    sim.run_until(SimTime::from_millis(350), &mut world);

    let times: Vec<SimTime> = world.samplers[0].history().iter().map(|h| h.time).collect();
    assert_eq!(
        times,
        vec![
            SimTime::from_millis(100),
            SimTime::from_millis(200),
            SimTime::from_millis(300),
        ]
    );
    let records = &mem.lock().expect("mem lock").records;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].fields, vec![TraceField::Float(0.0)]);
    assert_eq!(records[2].to_string(), "0.3\t0");
}

#[test]
fn sampler_with_missing_counter_stops_quietly() {
    let mut world = NetWorld::default();
    world.net.add_host("h");
    world
        .samplers
        .push(ThroughputSampler::new(42, SimTime::from_millis(100)).expect("sampler"));

    let mut sim = Simulator::default();
    schedule_sampler(&mut sim, SimTime::from_millis(100), 0, SimTime::from_millis(100));
    sim.run(&mut world);

    assert!(world.samplers[0].history().is_empty());
    assert_eq!(sim.executed_events(), 1);
}
