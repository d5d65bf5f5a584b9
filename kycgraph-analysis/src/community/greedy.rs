// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Greedy Modularity Maximization
//!
//! Clauset–Newman–Moore agglomeration:
//!
//! 1. **Start**: every node is a singleton community
//! 2. **Select**: take the adjacent pair with the largest ΔQ
//! 3. **Merge**: while ΔQ > 0, merge the pair and update only its neighbours
//!
//! For communities i and j joined by weight w_ij:
//!
//! ΔQ = w_ij/m − Di·Dj/(2m²) = (2m·w_ij − Di·Dj) / (2m²)
//!
//! Candidates are ranked by the integer numerator, so equal gains are
//! detected exactly and broken by the smaller (lo, hi) label pair. A
//! community's label is its smallest node index.
//!
//! Reference: Clauset, Newman, Moore, "Finding community structure in very
//! large networks", Phys. Rev. E 70, 066111 (2004)

use super::{contribution_numerator, CommunityDetector, MergeStep, Partition};
use crate::graph::KnowledgeGraph;
use kycgraph_core::{DetectionMethod, KycGraphResult};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ranked merge candidate: (−gain numerator, lo, hi)
type Candidate = (Reverse<i128>, usize, usize);

/// Clauset–Newman–Moore greedy modularity detector
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyModularity;

impl GreedyModularity {
    pub fn new() -> Self {
        Self
    }
}

/// Working state of the agglomeration, indexed by community label
struct Agglomeration {
    two_m: i128,
    /// Dc per label
    degree: Vec<i128>,
    /// Label -> neighbouring label -> connecting weight
    links: Vec<BTreeMap<usize, u64>>,
    members: Vec<Vec<usize>>,
    alive: Vec<bool>,
    candidates: BTreeSet<Candidate>,
    /// Σc(4m·Ic − Dc²), i.e. Q scaled by 4m²
    q_numerator: i128,
}

impl Agglomeration {
    fn new(graph: &KnowledgeGraph) -> Self {
        let n = graph.node_count();
        let m = graph.total_weight();
        let degree: Vec<i128> = graph.degrees().iter().map(|&d| d as i128).collect();
        let links: Vec<BTreeMap<usize, u64>> =
            (0..n).map(|i| graph.neighbors(i).clone()).collect();
        let q_numerator: i128 = graph
            .degrees()
            .iter()
            .map(|&d| contribution_numerator(m, 0, d))
            .sum();

        let mut state = Self {
            two_m: 2 * m as i128,
            degree,
            links,
            members: (0..n).map(|i| vec![i]).collect(),
            alive: vec![true; n],
            candidates: BTreeSet::new(),
            q_numerator,
        };
        for lo in 0..n {
            let pairs: Vec<Candidate> = state.links[lo]
                .keys()
                .filter(|&&hi| hi > lo)
                .map(|&hi| state.candidate(lo, hi))
                .collect();
            state.candidates.extend(pairs);
        }
        state
    }

    /// 2m·w_ij − Di·Dj
    fn gain_numerator(&self, i: usize, j: usize) -> i128 {
        let w = self.links[i].get(&j).copied().unwrap_or(0) as i128;
        self.two_m * w - self.degree[i] * self.degree[j]
    }

    fn candidate(&self, i: usize, j: usize) -> Candidate {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        (Reverse(self.gain_numerator(lo, hi)), lo, hi)
    }

    /// Best positive-gain candidate, if any
    fn best(&self) -> Option<(i128, usize, usize)> {
        let &(Reverse(gain), lo, hi) = self.candidates.first()?;
        (gain > 0).then_some((gain, lo, hi))
    }

    /// Absorb `hi` into `lo`
    fn merge(&mut self, lo: usize, hi: usize, gain: i128) {
        // Every candidate touching either side changes
        let stale: Vec<Candidate> = [lo, hi]
            .iter()
            .flat_map(|&c| self.links[c].keys().map(move |&k| (c, k)))
            .map(|(c, k)| self.candidate(c, k))
            .collect();
        for candidate in &stale {
            self.candidates.remove(candidate);
        }

        let absorbed = std::mem::take(&mut self.links[hi]);
        for (&k, &w) in &absorbed {
            self.links[k].remove(&hi);
            if k == lo {
                continue;
            }
            *self.links[lo].entry(k).or_default() += w;
            *self.links[k].entry(lo).or_default() += w;
        }

        self.degree[lo] += self.degree[hi];
        self.degree[hi] = 0;
        let moved = std::mem::take(&mut self.members[hi]);
        self.members[lo].extend(moved);
        self.alive[hi] = false;
        self.q_numerator += 2 * gain;

        let fresh: Vec<Candidate> = self.links[lo]
            .keys()
            .map(|&k| self.candidate(lo, k))
            .collect();
        self.candidates.extend(fresh);
    }

    fn into_groups(self) -> Vec<Vec<usize>> {
        self.members
            .into_iter()
            .zip(self.alive)
            .filter_map(|(members, alive)| alive.then_some(members))
            .collect()
    }
}

impl CommunityDetector for GreedyModularity {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::GreedyModularity
    }

    fn detect(&self, graph: &KnowledgeGraph) -> KycGraphResult<Partition> {
        let m = graph.total_weight();
        let mut state = Agglomeration::new(graph);
        let mut merges = Vec::new();

        // ΔQ = gain / 2m², Q = q_numerator / 4m²
        let half_scale = 2.0 * m as f64 * m as f64;
        let scale = 2.0 * half_scale;

        while let Some((gain, lo, hi)) = state.best() {
            state.merge(lo, hi, gain);
            let step = MergeStep {
                lo,
                hi,
                delta_q: gain as f64 / half_scale,
                modularity: state.q_numerator as f64 / scale,
            };
            debug!(lo, hi, delta_q = step.delta_q, q = step.modularity, "merged communities");
            merges.push(step);
        }

        Partition::from_groups(graph, self.method(), state.into_groups(), merges)
    }
}
