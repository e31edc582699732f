//! 最短跳数路由
//!
//! 对每个 (from, dst) 预计算一个下一跳：在反向图上对每个 dst 做 BFS，
//! 取邻接表中第一个满足 `dist[next] = dist[from] - 1` 的邻居（确定性选择）。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    built: bool,
    /// (from, dst) -> 下一跳
    next_hop: HashMap<(NodeId, NodeId), NodeId>,
}

impl RoutingTable {
    pub fn mark_dirty(&mut self) {
        self.built = false;
    }

    /// 确保路由表基于当前拓扑是最新的。
    ///
    /// `adj[from]` 为从 `from` 出发的所有出边邻居；
    /// `rev_adj[to]` 为所有能到达 `to` 的前驱节点集合。
    pub fn ensure_built(&mut self, adj: &[Vec<NodeId>], rev_adj: &[Vec<NodeId>]) {
        if self.built {
            return;
        }

        let n = adj.len();
        self.next_hop.clear();

        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();

            dist[dst_idx] = 0;
            q.push_back(NodeId(dst_idx));

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &rev_adj[v.0] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv.saturating_add(1);
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                let df = dist[from_idx];
                if from_idx == dst_idx || df == u32::MAX {
                    continue;
                }
                if let Some(&nh) = adj[from_idx].iter().find(|nh| dist[nh.0] == df - 1) {
                    self.next_hop.insert((NodeId(from_idx), NodeId(dst_idx)), nh);
                }
            }
        }

        self.built = true;
    }

    pub fn next_hop(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.next_hop.get(&(from, dst)).copied()
    }
}
