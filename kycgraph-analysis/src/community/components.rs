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

//! One community per connected component

use super::{CommunityDetector, Partition};
use crate::graph::KnowledgeGraph;
use kycgraph_core::{DetectionMethod, KycGraphResult};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponents;

impl ConnectedComponents {
    pub fn new() -> Self {
        Self
    }
}

impl CommunityDetector for ConnectedComponents {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::ConnectedComponents
    }

    fn detect(&self, graph: &KnowledgeGraph) -> KycGraphResult<Partition> {
        let n = graph.node_count();
        let mut visited = vec![false; n];
        let mut groups = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;

            // BFS
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                component.push(node);
                for &next in graph.neighbors(node).keys() {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            groups.push(component);
        }

        Partition::from_groups(graph, self.method(), groups, Vec::new())
    }
}
