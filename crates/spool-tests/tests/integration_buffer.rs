// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Buffer Integration Tests
//!
//! End-to-end tests for spool-buffer:
//!
//! - `test_disk_*`: controller over the disk backend
//! - `test_object_*`: controller over an in-memory object store
//! - `test_controller_*`: retry, timeout and drain behavior
//! - `test_ring_*`: recent-history ring next to the controller

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use spool_buffer::{
    decode_batch, DiskBackend, FlushController, MockBackend, ObjectStoreBackend, RingBuffer,
    StorageBackend,
};
use spool_core::{BufferError, SerializableEvent};

use spool_tests::prelude::*;

fn seqs(events: &[SerializableEvent]) -> Vec<u64> {
    events.iter().map(EventFixtures::seq_of).collect()
}

// =============================================================================
// Disk Backend
// =============================================================================

#[tokio::test]
async fn test_disk_size_trigger_and_close_drain() {
    init_test_logging();
    let dir = temp_test_dir("spool_disk_");
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let controller = FlushController::new(backend, ConfigFixtures::size_only(5)).unwrap();

    for event in EventFixtures::batch(12) {
        controller.save(event).await.unwrap();
    }
    assert_eq!(list_batch_files(dir.path()).len(), 2);
    assert_eq!(controller.len(), 2);

    controller.close().await.unwrap();

    let batches = read_disk_batches(dir.path());
    assert_eq!(
        batches.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![5, 5, 2]
    );
    let all: Vec<SerializableEvent> = batches.into_iter().flatten().collect();
    assert_eq!(seqs(&all), (0..12).collect::<Vec<_>>());

    let stats = controller.stats();
    assert_eq!(stats.events_saved, 12);
    assert_eq!(stats.events_flushed, 12);
    assert_eq!(stats.flush_failures, 0);
}

#[tokio::test]
async fn test_disk_batch_preserves_event_fields() {
    init_test_logging();
    let dir = temp_test_dir("spool_fields_");
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let controller = FlushController::new(backend, ConfigFixtures::size_only(1)).unwrap();

    let event = EventFixtures::event(7).with_sample_rate(20);
    let expected = SerializableEvent::from(event.clone());
    controller.save(event).await.unwrap();

    let batches = read_disk_batches(dir.path());
    assert_eq!(batches, vec![vec![expected]]);

    let raw = std::fs::read_to_string(&list_batch_files(dir.path())[0]).unwrap();
    assert!(raw.contains("\"seq\":7"), "integers stay integers: {}", raw);
    assert!(raw.contains("\"sample_rate\":20"));
}

#[tokio::test]
async fn test_disk_periodic_flush() {
    init_test_logging();
    let dir = temp_test_dir("spool_periodic_");
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let controller =
        FlushController::new(backend, ConfigFixtures::fast_interval(Duration::from_millis(50)))
            .unwrap();
    assert!(controller.start());

    for event in EventFixtures::batch(3) {
        controller.save(event).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(controller.is_empty());
    let batches = read_disk_batches(dir.path());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);

    controller.close().await.unwrap();
    assert!(!controller.is_running());
    assert_eq!(read_disk_batches(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_disk_unwritable_directory_keeps_batch() {
    init_test_logging();
    let dir = temp_test_dir("spool_gone_");
    let target = dir.path().join("backup");
    let backend = DiskBackend::open(&target).await.unwrap();
    std::fs::remove_dir_all(&target).unwrap();

    let controller = FlushController::new(backend, ConfigFixtures::size_only(2)).unwrap();
    controller.save(EventFixtures::event(0)).await.unwrap();
    let err = controller.save(EventFixtures::event(1)).await.unwrap_err();
    assert!(matches!(err, BufferError::BackendWrite { .. }));
    assert_eq!(controller.len(), 2);

    std::fs::create_dir_all(&target).unwrap();
    controller.close().await.unwrap();

    let batches = read_disk_batches(&target);
    assert_eq!(batches.len(), 1);
    assert_eq!(seqs(&batches[0]), vec![0, 1]);
}

fn temp_file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".tmp")
        })
        .count()
}

#[tokio::test]
async fn test_disk_flush_timeout_leaves_no_temporary_file() {
    init_test_logging();
    let dir = temp_test_dir("spool_disk_timeout_");
    let backend = DiskBackend::open(dir.path()).await.unwrap();
    let mut config = ConfigFixtures::size_only(100_000);
    config.flush_timeout = Duration::from_millis(1);
    let controller = FlushController::new(backend, config).unwrap();

    let payload = "x".repeat(512);
    for seq in 0..20_000 {
        let event = EventFixtures::event(seq).with_field("payload", payload.clone());
        controller.save(event).await.unwrap();
    }

    let err = controller.flush_now().await.unwrap_err();
    assert!(matches!(err, BufferError::Timeout { .. }));
    assert_eq!(controller.len(), 20_000);

    // The abandoned write finishes in the background as a complete artifact.
    tokio::time::timeout(Duration::from_secs(10), async {
        while temp_file_count(dir.path()) > 0 || list_batch_files(dir.path()).is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("background write should settle");

    assert_eq!(temp_file_count(dir.path()), 0);
    let batches = read_disk_batches(dir.path());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 20_000);
}

// =============================================================================
// Object Store Backend
// =============================================================================

async fn read_objects(store: &Arc<dyn ObjectStore>) -> Vec<(ObjectPath, Vec<SerializableEvent>)> {
    let mut locations: Vec<ObjectPath> = store
        .list(None)
        .map_ok(|meta| meta.location)
        .try_collect()
        .await
        .unwrap();
    locations.sort();

    let mut objects = Vec::new();
    for location in locations {
        let bytes = store.get(&location).await.unwrap().bytes().await.unwrap();
        objects.push((location, decode_batch(&bytes).unwrap()));
    }
    objects
}

#[tokio::test]
async fn test_object_store_batches_under_prefix() {
    init_test_logging();
    let backend = ObjectStoreBackend::in_memory().with_prefix("/events/backup/");
    let store = backend.store().clone();
    let controller = FlushController::new(backend, ConfigFixtures::size_only(3)).unwrap();

    for event in EventFixtures::batch(7) {
        controller.save(event).await.unwrap();
    }
    controller.close().await.unwrap();

    let objects = read_objects(&store).await;
    assert_eq!(objects.len(), 3);
    for (location, _) in &objects {
        assert!(location.as_ref().starts_with("events/backup/"), "{}", location);
        assert!(location.as_ref().ends_with(".json"));
    }

    let all: Vec<SerializableEvent> = objects.into_iter().flat_map(|(_, events)| events).collect();
    assert_eq!(seqs(&all), (0..7).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_object_store_empty_close_writes_nothing() {
    let backend = ObjectStoreBackend::in_memory();
    let store = backend.store().clone();
    let controller = FlushController::new(backend, ConfigFixtures::size_only(3)).unwrap();

    controller.close().await.unwrap();

    assert!(read_objects(&store).await.is_empty());
}

// =============================================================================
// Controller Behavior
// =============================================================================

#[tokio::test]
async fn test_controller_failure_then_recovery() {
    init_test_logging();
    let backend = Arc::new(ScriptedBackend::failing_first(1));
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let controller = FlushController::with_shared(shared, ConfigFixtures::size_only(2)).unwrap();

    controller.save(EventFixtures::event(0)).await.unwrap();
    assert!(controller.save(EventFixtures::event(1)).await.is_err());

    let retained = controller.snapshot().await;
    assert_eq!(retained.len(), 2);
    assert!(retained.iter().all(|e| e.metadata.retry_count == 1));

    // The next size trigger retries the grown batch.
    controller.save(EventFixtures::event(2)).await.unwrap();
    assert!(controller.is_empty());

    let attempted = backend.attempted();
    assert_eq!(attempted.len(), 2);
    assert_eq!(seqs(&attempted[0]), vec![0, 1]);
    assert_eq!(seqs(&backend.delivered()), vec![0, 1, 2]);

    let stats = controller.stats();
    assert_eq!(stats.flush_failures, 1);
    assert_eq!(stats.flush_successes, 1);
    assert_eq!(stats.events_flushed, 3);
}

#[tokio::test]
async fn test_controller_periodic_retry_after_failure() {
    init_test_logging();
    let backend = Arc::new(ScriptedBackend::with_script([
        FlushOutcome::Reject,
        FlushOutcome::Reject,
    ]));
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let controller =
        FlushController::with_shared(shared, ConfigFixtures::fast_interval(Duration::from_millis(30)))
            .unwrap();
    controller.start();

    controller.save(EventFixtures::event(0)).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.accepted().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("periodic flush should eventually succeed");

    assert!(backend.attempts() >= 3);
    assert_eq!(seqs(&backend.delivered()), vec![0]);
    controller.close().await.unwrap();
}

#[tokio::test]
async fn test_controller_timeout_keeps_batch() {
    init_test_logging();
    let backend = Arc::new(MockBackend::with_delay(Duration::from_millis(500)));
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let mut config = ConfigFixtures::size_only(1);
    config.flush_timeout = Duration::from_millis(50);
    let controller = FlushController::with_shared(shared, config).unwrap();

    let err = controller.save(EventFixtures::event(0)).await.unwrap_err();
    assert!(matches!(err, BufferError::Timeout { .. }));
    assert_eq!(controller.len(), 1);

    backend.set_delay(None);
    controller.close().await.unwrap();
    assert_eq!(backend.events_flushed(), 1);
}

#[tokio::test]
async fn test_controller_close_rejects_saves_and_retries_drain() {
    init_test_logging();
    let backend = Arc::new(MockBackend::failing());
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let controller = FlushController::with_shared(shared, ConfigFixtures::size_only(10)).unwrap();

    controller.save(EventFixtures::event(0)).await.unwrap();
    assert!(controller.close().await.is_err());
    assert!(controller.is_closed());
    assert!(matches!(
        controller.save(EventFixtures::event(1)).await,
        Err(BufferError::Closed)
    ));

    backend.set_should_fail(false);
    controller.close().await.unwrap();
    assert_eq!(backend.events_flushed(), 1);

    // Nothing left: a third close is a no-op.
    controller.close().await.unwrap();
    assert_eq!(backend.flush_count(), 1);
}

#[tokio::test]
async fn test_controller_concurrent_producers() {
    init_test_logging();
    let backend = Arc::new(ScriptedBackend::new());
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let controller = Arc::new(
        FlushController::with_shared(shared, ConfigFixtures::size_only(10)).unwrap(),
    );

    let mut handles = Vec::new();
    for task in 0..8usize {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25usize {
                controller
                    .save(EventFixtures::event(task * 25 + i))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    controller.close().await.unwrap();

    assert!(backend.accepted().iter().all(|batch| batch.len() <= 10));
    let mut delivered = seqs(&backend.delivered());
    delivered.sort_unstable();
    assert_eq!(delivered, (0..200).collect::<Vec<_>>());
}

// =============================================================================
// Ring Buffer
// =============================================================================

#[tokio::test]
async fn test_ring_keeps_recent_history_alongside_controller() {
    init_test_logging();
    let backend = Arc::new(MockBackend::new());
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let controller = FlushController::with_shared(shared, ConfigFixtures::size_only(4)).unwrap();
    let recent = RingBuffer::new(3).unwrap();

    for event in EventFixtures::batch(10) {
        recent.push(SerializableEvent::from(event.clone()));
        controller.save(event).await.unwrap();
    }
    controller.close().await.unwrap();

    assert_eq!(seqs(&recent.get_all()), vec![7, 8, 9]);
    assert_eq!(recent.evicted(), 7);
    assert_eq!(backend.events_flushed(), 10);
}

#[tokio::test]
async fn test_ring_concurrent_pushers_keep_every_event() {
    let ring = Arc::new(RingBuffer::new(400).unwrap());

    let mut handles = Vec::new();
    for task in 0..4usize {
        let ring = ring.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..100usize {
                ring.push(SerializableEvent::from(EventFixtures::event(task * 100 + i)));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut all = seqs(&ring.get_all());
    all.sort_unstable();
    assert_eq!(all, (0..400).collect::<Vec<_>>());
    assert_eq!(ring.evicted(), 0);
}
