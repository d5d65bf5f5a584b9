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

//! Community detection benchmarks
//!
//! Run with: cargo bench -p kycgraph-analysis --bench detector_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kycgraph_analysis::{
    CommunityDetector, ConnectedComponents, EntityNormalizer, GraphBuilder, GreedyModularity,
    KnowledgeGraph, Pipeline,
};
use kycgraph_core::{
    EntityMention, EntityType, ExtractionBatch, PipelineConfig, RelationType, RelationshipMention,
};

/// Clusters of 20 densely linked entities chained by single bridges
fn clustered_batch(nodes: usize) -> ExtractionBatch {
    const CLUSTER: usize = 20;
    let name = |i: usize| format!("Entity {i}");

    let entities = (0..nodes)
        .map(|i| EntityMention::new(name(i), EntityType::Company))
        .collect();

    let mut relationships = Vec::new();
    for i in 0..nodes {
        let base = i - i % CLUSTER;
        for step in [1, 3, 7] {
            let j = base + (i - base + step) % CLUSTER;
            if j < nodes && j != i {
                relationships.push(RelationshipMention::new(
                    name(i),
                    name(j),
                    RelationType::Business,
                ));
            }
        }
        if i % CLUSTER == 0 && i + CLUSTER < nodes {
            relationships.push(RelationshipMention::new(
                name(i),
                name(i + CLUSTER),
                RelationType::Financial,
            ));
        }
    }

    ExtractionBatch::new(entities, relationships)
}

fn build_graph(batch: &ExtractionBatch) -> KnowledgeGraph {
    let entities = EntityNormalizer::default().normalize(&batch.entities).0;
    GraphBuilder::new(entities)
        .build(&batch.relationships)
        .unwrap()
        .graph
}

fn bench_greedy_modularity(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_modularity");

    for size in [500, 2000, 5000].iter() {
        let graph = build_graph(&clustered_batch(*size));
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            let detector = GreedyModularity::new();
            b.iter(|| detector.detect(black_box(graph)).unwrap());
        });
    }

    group.finish();
}

fn bench_connected_components(c: &mut Criterion) {
    let graph = build_graph(&clustered_batch(5000));

    c.bench_function("connected_components_5000", |b| {
        let detector = ConnectedComponents::new();
        b.iter(|| detector.detect(black_box(&graph)).unwrap());
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let batch = clustered_batch(2000);
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();

    c.bench_function("pipeline_2000", |b| {
        b.iter(|| pipeline.run(black_box(&batch)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_greedy_modularity,
    bench_connected_components,
    bench_full_pipeline
);
criterion_main!(benches);
