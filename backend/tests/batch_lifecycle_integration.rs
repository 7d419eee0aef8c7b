use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use corelib::models::{
    BatchRunId, BatchRunOutcome, BatchRunStatus, InstrumentId, PriceBatch, PriceObservation,
};
use price_backend::{
    config::AppConfig,
    error::AppError,
    service::{PriceConsumer, PriceEngine, PricePublisher},
};
use tokio::task::JoinSet;

// -----------------------
// helpers
// -----------------------

fn engine() -> PriceEngine {
    PriceEngine::new(&AppConfig::default())
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn obs(instrument: &str, secs: i64, payload: &str) -> PriceObservation {
    PriceObservation::new(instrument, at(secs), payload)
}

fn publish(
    engine: &PriceEngine,
    run: BatchRunId,
    observations: Vec<PriceObservation>,
) -> BatchRunOutcome {
    engine
        .publisher
        .publish_batch(PriceBatch::new(run, observations))
        .expect("batch size is valid")
}

// -----------------------
// scenarios
// -----------------------

#[test]
fn single_observation_visible_after_finish() {
    let e = engine();
    let a = InstrumentId::from("A");

    let run = e.publisher.announce_batch_run().run_id;
    publish(&e, run, vec![obs("A", 1, "t1")]);
    let out = e.publisher.finish_batch_run(run);

    assert_eq!(out.status, BatchRunStatus::Finished);
    assert_eq!(e.consumer.last_price_by_id(&a), Some("t1".into()));
}

#[test]
fn newest_observation_in_run_wins() {
    let e = engine();

    let run = e.publisher.announce_batch_run().run_id;
    publish(&e, run, vec![obs("A", 2, "t2"), obs("A", 1, "t1")]);
    e.publisher.finish_batch_run(run);

    assert_eq!(e.consumer.last_price_by_id(&"A".into()), Some("t2".into()));
}

#[test]
fn publish_without_announce_is_error_and_never_visible() {
    let e = engine();
    let run = BatchRunId::generate();

    let out = publish(&e, run, vec![obs("A", 1, "t1")]);
    assert_eq!(out, BatchRunOutcome::new(run, BatchRunStatus::Error));

    let out = e.publisher.finish_batch_run(run);
    assert_eq!(out, BatchRunOutcome::new(run, BatchRunStatus::Finished));

    assert!(e.consumer.last_price_by_id(&"A".into()).is_none());
}

#[test]
fn publish_without_finish_is_not_visible() {
    let e = engine();

    let run = e.publisher.announce_batch_run().run_id;
    let out = publish(&e, run, vec![obs("A", 1, "t1")]);

    assert_eq!(out.status, BatchRunStatus::InProgress);
    assert!(e.consumer.last_price_by_id(&"A".into()).is_none());
}

#[test]
fn canceled_run_stays_invisible_after_late_finish() {
    let e = engine();

    let run = e.publisher.announce_batch_run().run_id;
    publish(&e, run, vec![obs("A", 1, "t1")]);

    assert_eq!(e.publisher.cancel_batch_run(run).status, BatchRunStatus::Canceled);
    assert_eq!(e.publisher.finish_batch_run(run).status, BatchRunStatus::Finished);

    assert!(e.consumer.last_price_by_id(&"A".into()).is_none());
    assert_eq!(e.history.history_len(&"A".into()), 0);
}

#[test]
fn closing_absent_runs_is_harmless() {
    let e = engine();
    let never = BatchRunId::generate();

    assert_eq!(e.publisher.finish_batch_run(never).status, BatchRunStatus::Finished);
    assert_eq!(e.publisher.cancel_batch_run(never).status, BatchRunStatus::Canceled);

    let run = e.publisher.announce_batch_run().run_id;
    publish(&e, run, vec![obs("A", 1, "t1")]);
    e.publisher.finish_batch_run(run);

    // Double close on an already finished run.
    assert_eq!(e.publisher.finish_batch_run(run).status, BatchRunStatus::Finished);
    assert_eq!(e.publisher.cancel_batch_run(run).status, BatchRunStatus::Canceled);

    assert_eq!(e.history.history_len(&"A".into()), 1);
    assert_eq!(e.staging.open_runs(), 0);
    assert_eq!(e.history.view().len(), 1);
}

#[test]
fn size_bounds_reject_without_mutation() {
    let e = engine();
    let run = e.publisher.announce_batch_run().run_id;

    let empty = e.publisher.publish_batch(PriceBatch::new(run, Vec::new()));
    assert!(matches!(empty, Err(AppError::InvalidBatchSize { size: 0, .. })));

    let oversized: Vec<_> = (0..1_001).map(|i| obs("A", i, "x")).collect();
    let too_big = e.publisher.publish_batch(PriceBatch::new(run, oversized));
    assert!(matches!(too_big, Err(AppError::InvalidBatchSize { size: 1_001, .. })));

    assert_eq!(e.staging.staged_len(&run), Some(0));

    let full: Vec<_> = (0..1_000).map(|i| obs("A", i, "x")).collect();
    assert_eq!(publish(&e, run, full).status, BatchRunStatus::InProgress);
    assert_eq!(publish(&e, run, vec![obs("B", 0, "y")]).status, BatchRunStatus::InProgress);
    assert_eq!(e.staging.staged_len(&run), Some(1_001));
}

#[test]
fn finished_run_id_can_be_reannounced() {
    let e = engine();

    let run = e.publisher.announce_batch_run().run_id;
    publish(&e, run, vec![obs("A", 1, "first")]);
    e.publisher.finish_batch_run(run);

    // Transport layers may hand the same id back; only slot presence matters.
    e.staging.announce(run);
    publish(&e, run, vec![obs("A", 2, "second")]);
    e.publisher.finish_batch_run(run);

    assert_eq!(e.consumer.last_price_by_id(&"A".into()), Some("second".into()));
}

#[test]
fn older_run_finished_later_does_not_regress() {
    let e = engine();

    let newer = e.publisher.announce_batch_run().run_id;
    let older = e.publisher.announce_batch_run().run_id;
    publish(&e, newer, vec![obs("A", 20, "new")]);
    publish(&e, older, vec![obs("A", 10, "old"), obs("B", 10, "b")]);

    e.publisher.finish_batch_run(newer);
    e.publisher.finish_batch_run(older);

    assert_eq!(e.consumer.last_price_by_id(&"A".into()), Some("new".into()));
    assert_eq!(e.consumer.last_price_by_id(&"B".into()), Some("b".into()));
}

// -----------------------
// concurrency
// -----------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn hundred_concurrent_publishers_then_finish() {
    let e = engine();
    let run = e.publisher.announce_batch_run().run_id;

    let mut set = JoinSet::new();
    // Spawn in a scrambled order so arrival order differs from timestamp order.
    for k in 0..100i64 {
        let i = (k * 37) % 100;
        let e = e.clone();
        set.spawn(async move {
            let batch = vec![obs("A", i, &format!("A@{i}"))];
            e.publisher.publish_batch(PriceBatch::new(run, batch))
        });
    }

    while let Some(res) = set.join_next().await {
        let out = res.expect("task panicked").expect("valid batch");
        assert_eq!(out.status, BatchRunStatus::InProgress);
    }

    assert!(e.consumer.last_price_by_id(&"A".into()).is_none());
    assert_eq!(e.staging.staged_len(&run), Some(100));

    e.publisher.finish_batch_run(run);

    assert_eq!(e.consumer.last_price_by_id(&"A".into()), Some("A@99".into()));
    assert_eq!(e.history.history_len(&"A".into()), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finishes_keep_larger_timestamp() {
    for _ in 0..200 {
        let e = engine();

        let early = e.publisher.announce_batch_run().run_id;
        let late = e.publisher.announce_batch_run().run_id;
        publish(&e, early, vec![obs("A", 1, "early")]);
        publish(&e, late, vec![obs("A", 2, "late")]);

        let mut set = JoinSet::new();
        for run in [early, late] {
            let e = e.clone();
            set.spawn(async move { e.publisher.finish_batch_run(run) });
        }
        while let Some(res) = set.join_next().await {
            assert_eq!(res.unwrap().status, BatchRunStatus::Finished);
        }

        assert_eq!(e.consumer.last_price_by_id(&"A".into()), Some("late".into()));
    }
}

#[test]
fn reader_never_observes_regression_under_concurrent_finishes() {
    let e = engine();
    let a = InstrumentId::from("A");

    let runs: Vec<_> = (0..64i64)
        .map(|k| {
            let run = e.publisher.announce_batch_run().run_id;
            // Interleave timestamps so runs finishing in any order race on A.
            let secs = (k * 29) % 64;
            publish(&e, run, vec![obs("A", secs, &secs.to_string())]);
            run
        })
        .collect();

    let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

    std::thread::scope(|s| {
        let reader = {
            let e = e.clone();
            let a = a.clone();
            let done = Arc::clone(&done);
            s.spawn(move || {
                let mut last_seen = None;
                loop {
                    let finished = done.load(std::sync::atomic::Ordering::Acquire);
                    if let Some(o) = e.history.current_last_observation(&a) {
                        if let Some(prev) = last_seen {
                            assert!(o.observed_at >= prev, "last price regressed");
                        }
                        last_seen = Some(o.observed_at);
                    }
                    if finished {
                        break;
                    }
                }
            })
        };

        let writers: Vec<_> = runs
            .chunks(16)
            .map(|chunk| {
                let e = e.clone();
                let chunk = chunk.to_vec();
                s.spawn(move || {
                    for run in chunk {
                        e.publisher.finish_batch_run(run);
                    }
                })
            })
            .collect();

        for w in writers {
            w.join().expect("writer panicked");
        }
        done.store(true, std::sync::atomic::Ordering::Release);
        reader.join().expect("reader panicked");
    });

    assert_eq!(e.consumer.last_price_by_id(&a), Some("63".into()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_publish_and_finish_never_leaks_accepted_writes() {
    for _ in 0..50 {
        let e = engine();
        let run = e.publisher.announce_batch_run().run_id;

        let mut set = JoinSet::new();
        for i in 0..20i64 {
            let e = e.clone();
            set.spawn(async move {
                e.publisher
                    .publish_batch(PriceBatch::new(run, vec![obs("A", i, "x")]))
                    .map(|out| out.status)
            });
        }
        let finisher = {
            let e = e.clone();
            tokio::spawn(async move { e.publisher.finish_batch_run(run) })
        };

        let mut accepted = 0;
        while let Some(res) = set.join_next().await {
            match res.unwrap().unwrap() {
                BatchRunStatus::InProgress => accepted += 1,
                BatchRunStatus::Error => {}
                other => panic!("unexpected status {other:?}"),
            }
        }
        finisher.await.unwrap();

        // The slot is gone, so every accepted write must have been merged.
        assert_eq!(e.history.history_len(&"A".into()), accepted);
        assert!(!e.staging.is_open(&run));
    }
}
