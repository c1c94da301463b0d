//! 集成測試

use clustore::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;

const N_SPIKES_TOTAL: u64 = 100;
const N_CLUSTERS: u64 = 10;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}

#[fixture]
fn store_dir() -> TempDir {
    TempDir::new().expect("tmpdir")
}

/// 隨機分割，保證每個聚類至少有一個事件
fn random_partition(seed: u64) -> Partition {
    let mut rng = StdRng::seed_from_u64(seed);
    let spike_clusters: Vec<ClusterId> = (0..N_SPIKES_TOTAL)
        .map(|spike| {
            if spike < N_CLUSTERS {
                spike
            } else {
                rng.gen_range(0..N_CLUSTERS)
            }
        })
        .collect();
    Partition::from_spike_clusters(&spike_clusters)
}

/// 每個事件ID的平方，存在磁碟
struct SquareItem {
    fields: Vec<FieldSpec>,
}

impl Default for SquareItem {
    fn default() -> Self {
        Self {
            fields: vec![FieldSpec::disk("spikes_square", Dtype::I32).with_row_shape(&[])],
        }
    }
}

fn squares(spikes: &[SpikeId]) -> Vec<i32> {
    spikes.iter().map(|&s| (s * s) as i32).collect()
}

impl StoreItem for SquareItem {
    fn name(&self) -> &str {
        "spikes square"
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
    ) -> clustore::Result<()> {
        let data = Array::from(squares(spikes));
        stores.disk_mut()?.store(cluster, [("spikes_square", &data)])
    }

    fn is_consistent(
        &self,
        view: &StoreView<'_>,
        cluster: ClusterId,
        spikes: &[SpikeId],
    ) -> clustore::Result<Option<bool>> {
        let Some(data) = view.disk()?.load(cluster, "spikes_square", Dtype::I32, None)? else {
            return Ok(Some(false));
        };
        Ok(Some(data.as_slice::<i32>() == Some(squares(spikes).as_slice())))
    }
}

#[test]
fn test_memory_store_contract() {
    let mut ms = MemoryStore::new();
    assert!(ms.load(2).is_empty());
    assert!(ms.cluster_ids().is_empty());

    ms.store(3, [("key", FieldValue::from("a"))]);
    ms.store(3, [("key_bis", FieldValue::from("b"))]);
    let record = ms.load(3);
    assert_eq!(record["key"], FieldValue::from("a"));
    assert_eq!(record["key_bis"], FieldValue::from("b"));

    ms.erase(&[2, 3]);
    assert_eq!(ms.load_fields(3, &["key"])["key"], None);
    assert!(ms.cluster_ids().is_empty());
}

#[test]
fn test_generate_matches_per_cluster_computation() -> anyhow::Result<()> {
    init_tracing();
    let tmp = TempDir::new()?;
    let partition = random_partition(1);

    let mut cs = ClusterStore::new(StoreConfig::new(tmp.path()).with_progress_every(4))?;
    cs.register::<SpikeCountItem>()?;
    cs.register::<SquareItem>()?;
    cs.generate(partition.clone())?;

    for (cluster, spikes) in partition.iter() {
        let n = cs.field("n_spikes", cluster)?.and_then(|v| v.as_int());
        assert_eq!(n, Some(spikes.len() as i64));

        let value = cs.field("spikes_square", cluster)?.and_then(FieldValue::into_array);
        let value = value.expect("generated");
        assert_eq!(value.as_slice::<i32>(), Some(squares(spikes).as_slice()));
    }

    assert_eq!(cs.memory_store().cluster_ids(), partition.cluster_ids());
    let disk_store = cs.disk_store().expect("disk store");
    assert_eq!(disk_store.cluster_ids()?, partition.cluster_ids());
    Ok(())
}

#[test]
fn test_merge_sums_counts() -> anyhow::Result<()> {
    init_tracing();
    let tmp = TempDir::new()?;

    let old: Partition = vec![
        (0, (0..12).collect::<Vec<SpikeId>>()),
        (1, (12..20).collect::<Vec<SpikeId>>()),
        (2, (20..25).collect::<Vec<SpikeId>>()),
    ]
    .into_iter()
    .collect();

    let mut cs = ClusterStore::open(tmp.path())?;
    cs.register::<SpikeCountItem>()?;
    cs.generate(old.clone())?;
    assert_eq!(cs.field("n_spikes", 0)?, Some(FieldValue::Int(12)));
    assert_eq!(cs.field("n_spikes", 1)?, Some(FieldValue::Int(8)));

    let up = UpdateInfo::merge(&old, &[0, 1], 20)?;
    cs.on_cluster(&up)?;

    assert_eq!(cs.field("n_spikes", 20)?, Some(FieldValue::Int(20)));
    assert_eq!(cs.memory_store().cluster_ids(), vec![2, 20]);
    assert_eq!(cs.cluster_ids(), vec![2, 20]);
    assert!(cs.disk_store().expect("disk store").cluster_ids()?.is_empty());
    Ok(())
}

#[test]
fn test_events_keep_disk_consistent() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let partition = random_partition(2);

    let mut cs = ClusterStore::open(tmp.path())?;
    cs.register::<SquareItem>()?;
    cs.generate(partition.clone())?;

    // 合併
    let merge = UpdateInfo::merge(&partition, &[3, 7], 42)?;
    cs.on_cluster(&merge)?;
    let disk_ids = cs.disk_store().expect("disk store").cluster_ids()?;
    assert!(!disk_ids.contains(&3) && !disk_ids.contains(&7));
    assert!(disk_ids.contains(&42));
    assert!(cs.status()?.is_consistent());

    let spikes = merge.new_spikes_per_cluster.spikes(42).expect("merged").to_vec();
    let out = cs.load("spikes_square", &[42], &spikes)?;
    assert_eq!(out.as_slice::<i32>(), Some(squares(&spikes).as_slice()));

    // 重新指派
    let moved = [spikes[0], partition.spikes(0).expect("cluster 0")[0]];
    let assign = UpdateInfo::assign(&merge.new_spikes_per_cluster, &moved, 50, 51)?;
    cs.on_cluster(&assign)?;
    assert_eq!(
        cs.disk_store().expect("disk store").cluster_ids()?,
        assign.new_spikes_per_cluster.cluster_ids()
    );
    assert!(cs.status()?.is_consistent());

    // 復原
    cs.on_cluster(&assign.undo())?;
    cs.on_cluster(&merge.undo())?;
    assert_eq!(
        cs.disk_store().expect("disk store").cluster_ids()?,
        partition.cluster_ids()
    );
    assert_eq!(cs.spikes_per_cluster(), &partition);
    assert!(cs.status()?.is_consistent());
    Ok(())
}

#[rstest]
fn test_cross_cluster_load(
    store_dir: TempDir,
    #[values(3, 11, 27)] seed: u64,
) -> anyhow::Result<()> {
    let partition = random_partition(seed);

    let mut cs = ClusterStore::open(store_dir.path())?;
    cs.register::<SquareItem>()?;
    cs.generate(partition.clone())?;

    let expected = |spikes: &[SpikeId]| squares(spikes);

    // 單一聚類的全部事件
    let spikes = partition.spikes(1).expect("cluster 1").to_vec();
    let out = cs.load("spikes_square", &[1], &spikes)?;
    assert_eq!(out.as_slice::<i32>(), Some(expected(&spikes).as_slice()));

    // 單一聚類的部分事件
    let spikes: Vec<SpikeId> = spikes.iter().skip(1).step_by(2).copied().collect();
    let out = cs.load("spikes_square", &[1], &spikes)?;
    assert_eq!(out.as_slice::<i32>(), Some(expected(&spikes).as_slice()));

    // 多個聚類的全部事件，再接上反向順序
    let clusters = [2, 3, 5];
    let mut spikes: Vec<SpikeId> = clusters
        .iter()
        .flat_map(|&c| partition.spikes(c).expect("cluster").iter().copied())
        .collect();
    let reversed: Vec<SpikeId> = spikes.iter().rev().copied().collect();
    spikes.extend(reversed);
    let out = cs.load("spikes_square", &clusters, &spikes)?;
    assert_eq!(out.len(), spikes.len());
    assert_eq!(out.as_slice::<i32>(), Some(expected(&spikes).as_slice()));

    // 多個聚類的部分事件
    let spikes: Vec<SpikeId> = clusters
        .iter()
        .flat_map(|&c| partition.spikes(c).expect("cluster").iter().step_by(3).copied())
        .collect();
    let out = cs.load("spikes_square", &clusters, &spikes)?;
    assert_eq!(out.as_slice::<i32>(), Some(expected(&spikes).as_slice()));

    // 不屬於請求聚類的事件
    let foreign = partition.spikes(4).expect("cluster 4")[0];
    let err = cs.load("spikes_square", &clusters, &[foreign]).unwrap_err();
    assert!(matches!(err, StoreError::SpikeNotInClusters { spike } if spike == foreign));
    Ok(())
}

#[test]
fn test_reopen_without_recompute() -> anyhow::Result<()> {
    init_tracing();
    let tmp = TempDir::new()?;
    let partition = random_partition(4);

    let mut cs = ClusterStore::open(tmp.path())?;
    cs.register::<SquareItem>()?;
    let summary = cs.generate(partition.clone())?;
    assert_eq!(summary.computed, partition.len());

    let status = cs.status()?;
    assert!(status.to_string().contains("true"));
    assert!(status.is_consistent());
    let before: Vec<Option<FieldValue>> = partition
        .cluster_ids()
        .into_iter()
        .map(|c| cs.field("spikes_square", c))
        .collect::<clustore::Result<_>>()?;
    drop(cs);

    // 重新開啟同一目錄
    let mut cs = ClusterStore::open(tmp.path())?;
    cs.register::<SquareItem>()?;
    assert_eq!(
        cs.disk_store().expect("disk store").cluster_ids()?,
        partition.cluster_ids()
    );
    let summary = cs.generate(partition.clone())?;
    assert_eq!(summary, GenerateSummary { computed: 0, skipped: partition.len() });

    let after: Vec<Option<FieldValue>> = partition
        .cluster_ids()
        .into_iter()
        .map(|c| cs.field("spikes_square", c))
        .collect::<clustore::Result<_>>()?;
    assert_eq!(before, after);

    cs.display_status()?;
    assert_eq!(cs.files()?.len(), partition.len());
    Ok(())
}

#[rstest]
fn test_corrupted_file_is_recomputed(store_dir: TempDir) -> anyhow::Result<()> {
    let partition = random_partition(5);

    let mut cs = ClusterStore::open(store_dir.path())?;
    cs.register::<SquareItem>()?;
    cs.generate(partition.clone())?;

    // 模擬寫入中斷：截短一個檔案
    let path = cs.disk_store().expect("disk store").path(6, "spikes_square");
    std::fs::write(&path, [0u8; 4])?;

    let status = cs.status()?;
    assert_eq!(status.items[0].stale_clusters(), vec![6]);

    let summary = cs.generate(partition.clone())?;
    assert_eq!(summary.computed, 1);
    assert!(cs.status()?.is_consistent());

    // 空檔案在讀取時被視為過期
    std::fs::write(&path, b"")?;
    let spikes = partition.spikes(6).expect("cluster 6").to_vec();
    let err = cs.load("spikes_square", &[6], &spikes).unwrap_err();
    assert!(matches!(err, StoreError::StaleField { cluster: 6, n_values: 0, .. }));
    Ok(())
}
