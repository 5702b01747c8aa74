//! Property-based tests for merge semantics and the snapshot codec
//!
//! - Counter totals equal the sum of applied deltas
//! - Gauges always read back the last value written
//! - decode(encode(set)) == set, including the empty set

use metricstore_storage::{
    snapshot, MemoryStorage, Metric, MetricKey, MetricKind, MetricSet, MetricStorage, MetricValue,
};
use proptest::prelude::*;

fn arb_deltas() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000_000i64..1_000_000, 1..50)
}

fn arb_gauges() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(any::<f64>().prop_filter("finite", |v| v.is_finite()), 1..50)
}

fn arb_metric_set() -> impl Strategy<Value = MetricSet> {
    let entry = ("[a-zA-Z0-9_.]{1,16}", any::<bool>(), any::<i64>(), any::<f64>()).prop_filter_map(
        "finite gauges only",
        |(id, is_counter, delta, value)| {
            if is_counter {
                Some((MetricKey::new(MetricKind::Counter, id), MetricValue::Counter(delta)))
            } else if value.is_finite() {
                Some((MetricKey::new(MetricKind::Gauge, id), MetricValue::Gauge(value)))
            } else {
                None
            }
        },
    );
    prop::collection::vec(entry, 0..40).prop_map(|entries| entries.into_iter().collect())
}

/// Property: the stored counter is the sum of every delta applied
#[test]
fn proptest_counter_is_sum_of_deltas() {
    proptest!(|(deltas in arb_deltas())| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let stored = rt.block_on(async {
            let storage = MemoryStorage::new();
            for delta in &deltas {
                storage.set_metric(Metric::counter("hits", *delta)).await.unwrap();
            }
            storage.get_metric(MetricKind::Counter, "hits").await.unwrap()
        });

        prop_assert_eq!(stored.delta, Some(deltas.iter().sum::<i64>()));
    });
}

/// Property: splitting the same deltas across a batch gives the same total
#[test]
fn proptest_batch_equals_sequential() {
    proptest!(|(deltas in arb_deltas())| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (sequential, batched) = rt.block_on(async {
            let one = MemoryStorage::new();
            for delta in &deltas {
                one.set_metric(Metric::counter("hits", *delta)).await.unwrap();
            }

            let two = MemoryStorage::new();
            let batch = deltas.iter().map(|d| Metric::counter("hits", *d)).collect();
            two.set_metrics(batch).await.unwrap();

            (one.snapshot().await, two.snapshot().await)
        });

        prop_assert_eq!(sequential, batched);
    });
}

/// Property: a gauge reads back exactly the last value set
#[test]
fn proptest_gauge_last_write_wins() {
    proptest!(|(values in arb_gauges())| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let stored = rt.block_on(async {
            let storage = MemoryStorage::new();
            for value in &values {
                storage.set_metric(Metric::gauge("temp", *value)).await.unwrap();
            }
            storage.get_metric(MetricKind::Gauge, "temp").await.unwrap()
        });

        prop_assert_eq!(stored.value, values.last().copied());
    });
}

/// Property: the codec round-trips every metric set exactly
#[test]
fn proptest_codec_round_trip() {
    proptest!(|(set in arb_metric_set())| {
        let bytes = snapshot::encode(&set).unwrap();
        let decoded = snapshot::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, set);
    });
}
