//! Wall-clock-aligned collection loop.
//!
//! POSTs land on multiples of the configured interval; collection
//! starts a fixed lead time ahead of each boundary so the documents
//! are ready when the POST fires. Sink failures are logged and the
//! loop continues — the process outlives any single cycle's failure.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info};

use fabricbeat_core::Collector;

use crate::error::CliError;
use crate::sink::ElasticSink;

/// Lead time between collection start and the POST boundary, seconds.
const PROCESSING_TIME: i64 = 5;

/// The next wall-clock POST boundary strictly after `now`.
fn next_post_time(now: i64, interval: i64) -> i64 {
    now + (interval - now.rem_euclid(interval))
}

async fn sleep_until(epoch: i64) {
    let now = Utc::now().timestamp();
    if epoch > now {
        let secs = u64::try_from(epoch - now).unwrap_or(0);
        tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
    }
}

/// Run the aligned collect/POST loop forever.
pub async fn run<C: Collector>(
    collector: &C,
    sink: &ElasticSink,
    interval_secs: u64,
) -> Result<(), CliError> {
    let interval = i64::try_from(interval_secs).map_err(|_| CliError::Validation {
        field: "interval".into(),
        reason: format!("interval {interval_secs} out of range"),
    })?;

    let mut post_time = next_post_time(Utc::now().timestamp(), interval);
    info!(
        collector = collector.name(),
        interval, "starting, first collection at {}", post_time - PROCESSING_TIME
    );
    sleep_until(post_time - PROCESSING_TIME).await;

    loop {
        let started = Instant::now();
        let docs = collector.collect().await;
        let processing_secs = started.elapsed().as_secs_f64();

        sleep_until(post_time).await;
        match sink.post(docs).await {
            Ok(count) => info!(documents = count, "cycle posted"),
            Err(err) => error!("POST failed, documents dropped for this cycle: {err}"),
        }

        post_time = next_post_time(Utc::now().timestamp(), interval);
        info!("collection took {processing_secs:.2}s, sleeping until next cycle");
        sleep_until(post_time - PROCESSING_TIME).await;
    }
}
