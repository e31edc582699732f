use std::sync::{Arc, Mutex};

use crate::net::{DataRate, DropEvent, NetWorld, NodeId};
use crate::queue::PacketQueue;
use crate::sim::{SimTime, Simulator};

fn two_hosts(latency: SimTime, rate: DataRate) -> (NetWorld, NodeId, NodeId) {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    world.net.connect(h0, h1, latency, rate);
    world.net.connect(h1, h0, latency, rate);
    (world, h0, h1)
}

#[test]
fn back_to_back_packets_serialize_on_the_link() {
    let latency = SimTime::from_micros(100);
    let (mut world, h0, h1) = two_hosts(latency, DataRate::from_gbps(1));
    let mut sim = Simulator::default();

    // 1250B @ 1Gbps = 10us
    for _ in 0..2 {
        let pkt = world.net.make_packet(0, 1_250, h0, h1);
        world.net.forward_from(h0, pkt, &mut sim);
    }

    let first = latency.saturating_add(SimTime::from_micros(10));
    sim.run_until(first, &mut world);
    assert_eq!(world.net.stats.delivered_pkts, 1);

    sim.run_until(first.saturating_add(SimTime::from_micros(5)), &mut world);
    assert_eq!(world.net.stats.delivered_pkts, 1);

    sim.run_until(first.saturating_add(SimTime::from_micros(10)), &mut world);
    assert_eq!(world.net.stats.delivered_pkts, 2);
    assert_eq!(world.net.stats.delivered_bytes, 2_500);
    assert_eq!(world.net.stats.dropped_pkts, 0);
}

#[test]
fn full_queue_drops_and_notifies_subscribers() {
    let (mut world, h0, h1) = two_hosts(SimTime::from_micros(1), DataRate::from_gbps(1));
    world.net.set_link_queue_capacity_bytes(h0, h1, 1_250);

    let drops = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&drops);
    world.net.connect_drop(move |now, ev: &DropEvent| {
        log.lock().expect("drops lock").push((now, ev.pkt_id, ev.size_bytes));
    });

    let mut sim = Simulator::default();
    let mut ids = Vec::new();
    // 第一个立即开始发送，第二个排队，第三个被丢弃
    for _ in 0..3 {
        let pkt = world.net.make_packet(7, 1_250, h0, h1);
        ids.push(pkt.id);
        world.net.forward_from(h0, pkt, &mut sim);
    }
    sim.run(&mut world);

    assert_eq!(
        &*drops.lock().expect("drops lock"),
        &[(SimTime::ZERO, ids[2], 1_250)]
    );
    assert_eq!(world.net.stats.dropped_pkts, 1);
    assert_eq!(world.net.stats.dropped_bytes, 1_250);
    assert_eq!(world.net.stats.delivered_pkts, 2);

    let link = world.net.link_between(h0, h1).expect("link");
    assert_eq!(world.net.link(link).expect("link").queue.dropped(), 1);
}

#[test]
fn packets_are_forwarded_over_multiple_hops() {
    let mut world = NetWorld::default();
    let a = world.net.add_host("a");
    let b = world.net.add_host("b");
    let c = world.net.add_host("c");
    world.net.connect(a, b, SimTime::from_micros(1), DataRate::from_gbps(1));
    world.net.connect(b, c, SimTime::from_micros(1), DataRate::from_gbps(1));

    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(0, 100, a, c);
    world.net.forward_from(a, pkt, &mut sim);
    let back = world.net.make_packet(0, 100, c, a);
    world.net.forward_from(c, back, &mut sim);
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 1);
    assert_eq!(world.net.stats.unroutable_pkts, 1);
    assert_eq!(world.net.node_name(b), Some("b"));
}
