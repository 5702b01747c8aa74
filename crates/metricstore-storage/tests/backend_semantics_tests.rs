//! Merge semantics shared by the in-process backends
//!
//! Every scenario runs against the in-memory backend and the file backend in
//! both write modes; they must behave identically for get/set/get_all.

use metricstore_storage::{
    FileStorage, MemoryStorage, Metric, MetricKind, MetricStorage, StorageError, WriteMode,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Build each in-process backend; the TempDir must outlive the backends
fn backends() -> (TempDir, Vec<Arc<dyn MetricStorage>>) {
    let dir = TempDir::new().unwrap();
    let backends: Vec<Arc<dyn MetricStorage>> = vec![
        Arc::new(MemoryStorage::new()),
        Arc::new(FileStorage::new(dir.path().join("sync.json"), WriteMode::Sync)),
        Arc::new(FileStorage::new(dir.path().join("deferred.json"), WriteMode::Deferred)),
    ];
    (dir, backends)
}

#[tokio::test]
async fn test_counter_accumulates_on_every_backend() {
    let (_dir, backends) = backends();
    for storage in backends {
        storage.set_metric(Metric::counter("hits", 5)).await.unwrap();
        let returned = storage.set_metric(Metric::counter("hits", 3)).await.unwrap();
        assert_eq!(returned.delta, Some(8), "{:?}", storage);

        let stored = storage.get_metric(MetricKind::Counter, "hits").await.unwrap();
        assert_eq!(stored.delta, Some(8), "{:?}", storage);
    }
}

#[tokio::test]
async fn test_gauge_last_write_wins_on_every_backend() {
    let (_dir, backends) = backends();
    for storage in backends {
        storage.set_metric(Metric::gauge("temp", 36.6)).await.unwrap();
        storage.set_metric(Metric::gauge("temp", 37.1)).await.unwrap();

        let stored = storage.get_metric(MetricKind::Gauge, "temp").await.unwrap();
        assert_eq!(stored.value, Some(37.1), "{:?}", storage);
    }
}

#[tokio::test]
async fn test_unknown_key_is_not_found_on_every_backend() {
    let (_dir, backends) = backends();
    for storage in backends {
        let err = storage
            .get_metric(MetricKind::Counter, "unknown")
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::NotFound { kind: MetricKind::Counter, ref id } if id == "unknown"),
            "{:?}",
            storage
        );
    }
}

#[tokio::test]
async fn test_gauge_without_value_creates_nothing() {
    let (_dir, backends) = backends();
    for storage in backends {
        let bare = Metric {
            id: "x".to_string(),
            kind: MetricKind::Gauge,
            delta: None,
            value: None,
        };

        let err = storage.set_metric(bare).await.unwrap_err();
        assert!(matches!(err, StorageError::NilGaugeValue(_)));
        assert!(storage.get_all_metrics().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_batch_is_positionally_aligned() {
    let (_dir, backends) = backends();
    for storage in backends {
        let input = vec![
            Metric::counter("a", 1),
            Metric::gauge("b", 0.5),
            Metric::counter("a", 10),
            Metric::gauge("b", 1.5),
        ];

        let stored = storage.set_metrics(input).await.unwrap();
        assert_eq!(
            stored,
            vec![
                Metric::counter("a", 1),
                Metric::gauge("b", 0.5),
                Metric::counter("a", 11),
                Metric::gauge("b", 1.5),
            ]
        );
    }
}

#[tokio::test]
async fn test_batch_with_missing_payload_is_rejected_whole() {
    let (_dir, backends) = backends();
    for storage in backends {
        let bare = Metric {
            id: "c".to_string(),
            kind: MetricKind::Counter,
            delta: None,
            value: Some(1.0),
        };

        let err = storage
            .set_metrics(vec![Metric::counter("a", 1), bare])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NilCounterDelta(ref id) if id == "c"));
        assert!(storage.get_all_metrics().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_get_all_returns_one_entry_per_key_sorted() {
    let (_dir, backends) = backends();
    for storage in backends {
        storage.set_metric(Metric::counter("z", 1)).await.unwrap();
        storage.set_metric(Metric::gauge("z", 2.0)).await.unwrap();
        storage.set_metric(Metric::counter("a", 1)).await.unwrap();
        storage.set_metric(Metric::counter("a", 1)).await.unwrap();

        let all = storage.get_all_metrics().await.unwrap();
        assert_eq!(
            all,
            vec![
                Metric::gauge("z", 2.0),
                Metric::counter("a", 2),
                Metric::counter("z", 1),
            ]
        );
    }
}

#[tokio::test]
async fn test_ping_is_noop_for_in_process_backends() {
    let (_dir, backends) = backends();
    for storage in backends {
        storage.ping().await.unwrap();
    }
}
