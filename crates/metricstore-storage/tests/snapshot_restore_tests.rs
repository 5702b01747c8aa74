//! Durability: snapshots written by the file backend rebuild the same set

use metricstore_storage::{
    snapshot, FileStorage, MemoryStorage, Metric, MetricKind, MetricSet, MetricStorage,
    SnapshotFile, WriteMode,
};
use tempfile::TempDir;

async fn restore_into(storage: &impl MetricStorage, file: &SnapshotFile) {
    let set = file.load().await.unwrap();
    storage.set_metrics(set.to_metrics()).await.unwrap();
}

#[tokio::test]
async fn test_sync_mode_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");

    let before = {
        let storage = FileStorage::new(&path, WriteMode::Sync);
        storage.set_metric(Metric::counter("hits", 5)).await.unwrap();
        storage.set_metric(Metric::counter("hits", 3)).await.unwrap();
        storage.set_metric(Metric::gauge("temp", 36.6)).await.unwrap();
        storage
            .set_metrics(vec![Metric::gauge("temp", 37.1), Metric::counter("errors", 2)])
            .await
            .unwrap();
        storage.get_all_metrics().await.unwrap()
        // dropped without any explicit flush
    };

    let restarted = FileStorage::new(&path, WriteMode::Sync);
    assert!(restarted.get_all_metrics().await.unwrap().is_empty());

    restore_into(&restarted, restarted.snapshot_file()).await;
    assert_eq!(restarted.get_all_metrics().await.unwrap(), before);
    assert_eq!(
        restarted
            .get_metric(MetricKind::Counter, "hits")
            .await
            .unwrap()
            .delta,
        Some(8)
    );
}

#[tokio::test]
async fn test_restore_into_memory_backend() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("metrics.json"));

    let source = MemoryStorage::new();
    source.set_metric(Metric::counter("hits", 42)).await.unwrap();
    source.set_metric(Metric::gauge("ratio", 0.1 + 0.2)).await.unwrap();
    file.save(&source.snapshot().await).await.unwrap();

    let target = MemoryStorage::new();
    restore_into(&target, &file).await;

    assert_eq!(target.snapshot().await, source.snapshot().await);
}

#[tokio::test]
async fn test_missing_snapshot_restores_nothing() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("never-written.json"));

    let storage = MemoryStorage::new();
    restore_into(&storage, &file).await;
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_empty_file_restores_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");
    std::fs::write(&path, b"").unwrap();

    let set = SnapshotFile::new(&path).load().await.unwrap();
    assert_eq!(set, MetricSet::new());
}

#[tokio::test]
async fn test_corrupt_snapshot_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");
    std::fs::write(&path, b"[{\"id\": \"hits\", \"type\":").unwrap();

    let err = SnapshotFile::new(&path).load().await.unwrap_err();
    assert!(matches!(err, metricstore_storage::StorageError::Snapshot(_)));
}

#[test]
fn test_file_written_by_backend_decodes_with_codec() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let storage = FileStorage::new(&path, WriteMode::Sync);
        storage.set_metric(Metric::gauge("temp", -273.15)).await.unwrap();
    });

    let set = snapshot::decode(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(set.to_metrics(), vec![Metric::gauge("temp", -273.15)]);
}
