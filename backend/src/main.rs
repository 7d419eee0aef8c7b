use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use corelib::models::{BatchRunStatus, InstrumentId, PriceBatch, PriceObservation};
use price_backend::{
    config::AppConfig,
    logger::{init_tracing, run_span},
    metrics::counters::Counters,
    service::{PriceConsumer, PriceEngine, PricePublisher},
};
use tracing::Instrument;

/// Synthetic instrument universe shared by all producers.
fn instruments(n: usize) -> Arc<Vec<InstrumentId>> {
    Arc::new((0..n).map(|i| InstrumentId::new(format!("INST-{i:04}"))).collect())
}

/// One producer: announce, publish a batch, then finish. Every tenth run is
/// canceled instead so the discard path shows up in the logs.
fn start_producer(
    producer: usize,
    engine: PriceEngine,
    universe: Arc<Vec<InstrumentId>>,
    cfg: &AppConfig,
) {
    let batch_size = cfg.feed_batch_size;
    let interval = Duration::from_millis(cfg.feed_interval_ms.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut round: u64 = 0;

        loop {
            ticker.tick().await;
            round += 1;

            let run_id = engine.publisher.announce_batch_run().run_id;
            let span = run_span(producer, &run_id);

            async {
                let now = Utc::now();
                let observations = (0..batch_size)
                    .map(|i| {
                        let instrument = universe[(producer + i) % universe.len()].clone();
                        let px = format!("{}.{:02}", 100 + producer, (round + i as u64) % 100);
                        PriceObservation::new(instrument, now, px.as_str())
                    })
                    .collect();

                match engine
                    .publisher
                    .publish_batch(PriceBatch::new(run_id, observations))
                {
                    Ok(out) if out.status == BatchRunStatus::InProgress => {}
                    Ok(out) => tracing::warn!(status = ?out.status, "publish not accepted"),
                    Err(e) => tracing::error!(error = %e, "publish rejected"),
                }

                if round % 10 == 0 {
                    engine.publisher.cancel_batch_run(run_id);
                } else {
                    engine.publisher.finish_batch_run(run_id);
                }
            }
            .instrument(span)
            .await;
        }
    });
}

/// Periodically logs the last price of the first instrument and the counters.
fn start_reader(engine: PriceEngine, watched: InstrumentId, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let last = engine.consumer.last_price_by_id(&watched);
            let c = &engine.counters;
            tracing::info!(
                instrument = %watched,
                last_price = ?last.map(|p| String::from_utf8_lossy(p.as_bytes()).into_owned()),
                open_runs = engine.staging.open_runs(),
                runs_finished = Counters::get(&c.runs_finished),
                runs_canceled = Counters::get(&c.runs_canceled),
                observations_merged = Counters::get(&c.observations_merged),
                "last price snapshot"
            );
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    let cfg = AppConfig::from_env();

    tracing::info!(
        producers = cfg.feed_producers,
        instruments = cfg.feed_instruments,
        batch_size = cfg.feed_batch_size,
        "Starting price backend..."
    );

    let engine = PriceEngine::new(&cfg);
    let universe = instruments(cfg.feed_instruments);

    for producer in 0..cfg.feed_producers {
        start_producer(producer, engine.clone(), Arc::clone(&universe), &cfg);
    }

    start_reader(
        engine.clone(),
        universe[0].clone(),
        Duration::from_millis(cfg.feed_interval_ms.max(1) * 2),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
