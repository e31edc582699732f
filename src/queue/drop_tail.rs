//! DropTail（尾丢弃）队列：放不下就丢弃新到达的 packet。

use std::collections::VecDeque;

use crate::net::Packet;

use super::PacketQueue;

#[derive(Debug)]
pub struct DropTailQueue {
    capacity: u64,
    bytes: u64,
    /// 历史最高占用
    peak: u64,
    dropped: u64,
    fifo: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity: capacity_bytes,
            bytes: 0,
            peak: 0,
            dropped: 0,
            fifo: VecDeque::new(),
        }
    }

    fn fits(&self, size: u64) -> bool {
        self.bytes.saturating_add(size) <= self.capacity
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let size = pkt.size_bytes as u64;
        if !self.fits(size) {
            self.dropped += 1;
            return Err(pkt);
        }
        self.bytes += size;
        self.peak = self.peak.max(self.bytes);
        self.fifo.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.fifo.pop_front()?;
        self.bytes -= pkt.size_bytes as u64;
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.fifo.len()
    }

    fn bytes(&self) -> u64 {
        self.bytes
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }

    fn peak_bytes(&self) -> u64 {
        self.peak
    }

    fn dropped(&self) -> u64 {
        self.dropped
    }
}
