//! 跨聚類讀取效能

use clustore_core::{
    Array, ClusterId, Dtype, FieldSpec, FieldValue, Partition, Result, SpikeId, StoreMode,
};
use clustore_engine::reassembly::{reassemble, ClusterArray};
use clustore_engine::{ClusterStore, StoreItem, Stores};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

const N_CLUSTERS: u64 = 50;
const N_CHANNELS: usize = 8;

fn random_partition(n_spikes: u64, seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let spike_clusters: Vec<ClusterId> = (0..n_spikes)
        .map(|_| rng.gen_range(0..N_CLUSTERS))
        .collect();
    Partition::from_spike_clusters(&spike_clusters)
}

fn features(spikes: &[SpikeId]) -> Result<Array> {
    let values: Vec<f32> = spikes
        .iter()
        .flat_map(|&s| (0..N_CHANNELS).map(move |c| (s as f32) * 0.5 + c as f32))
        .collect();
    Array::from(values).reshape(&[spikes.len(), N_CHANNELS])
}

/// 每個事件一列特徵
struct FeatureItem {
    fields: Vec<FieldSpec>,
}

impl StoreItem for FeatureItem {
    fn name(&self) -> &str {
        "features"
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn store_cluster(
        &mut self,
        stores: &mut Stores<'_>,
        cluster: ClusterId,
        spikes: &[SpikeId],
        _mode: StoreMode,
    ) -> Result<()> {
        let array = features(spikes)?;
        stores
            .memory_mut()
            .store(cluster, [("features", FieldValue::Array(array))]);
        Ok(())
    }
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");

    for n_spikes in [1_000u64, 10_000, 100_000] {
        let partition = random_partition(n_spikes, 42);
        let clusters: Vec<(ClusterId, Vec<SpikeId>)> = partition
            .iter()
            .map(|(cluster, spikes)| (cluster, spikes.to_vec()))
            .collect();
        let data: Vec<ClusterArray<'_>> = clusters
            .iter()
            .map(|(cluster, spikes)| ClusterArray {
                cluster: *cluster,
                spikes,
                array: features(spikes).expect("features"),
            })
            .collect();

        let mut requested: Vec<SpikeId> = (0..n_spikes).collect();
        requested.shuffle(&mut StdRng::seed_from_u64(7));

        group.throughput(Throughput::Elements(n_spikes));
        group.bench_with_input(BenchmarkId::from_parameter(n_spikes), &requested, |b, requested| {
            b.iter(|| {
                reassemble(
                    "features",
                    Dtype::F32,
                    Some(&[N_CHANNELS]),
                    black_box(&data),
                    black_box(requested),
                )
            })
        });
    }
    group.finish();
}

fn bench_cluster_store_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_store_load");

    let partition = random_partition(20_000, 3);
    let mut cs = ClusterStore::in_memory();
    cs.register_item(FeatureItem {
        fields: vec![FieldSpec::memory("features").with_row_shape(&[N_CHANNELS])],
    })
    .expect("register");
    cs.generate(partition.clone()).expect("generate");

    for n_selected in [1usize, 5, 20] {
        let clusters: Vec<ClusterId> = partition
            .cluster_ids()
            .into_iter()
            .take(n_selected)
            .collect();
        let spikes: Vec<SpikeId> = clusters
            .iter()
            .filter_map(|&c| partition.spikes(c))
            .flat_map(|spikes| spikes.iter().step_by(2).copied())
            .collect();

        group.throughput(Throughput::Elements(spikes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_selected), &spikes, |b, spikes| {
            b.iter(|| cs.load("features", black_box(&clusters), black_box(spikes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reassemble, bench_cluster_store_load);
criterion_main!(benches);
