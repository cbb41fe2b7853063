//! Synthetic sample generation for the ingestion job.

use crate::config::IngestConfig;
use crate::storage::{Metric, MetricsDb};
use rand::Rng;
use tracing::{info, warn};

/// Upper bound (inclusive) for generated concurrency values
pub const MAX_CONCURRENCY: i64 = 500_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub stored: usize,
    pub failed: usize,
}

/// One sample every `step` seconds from `start` through `end` inclusive.
pub fn generate_samples<R: Rng>(start: i64, end: i64, step: u64, rng: &mut R) -> Vec<Metric> {
    let step = step.max(1) as usize;

    (start..=end)
        .step_by(step)
        .map(|timestamp| Metric {
            timestamp,
            cpu_load: rng.gen_range(0.0..100.0),
            concurrency: rng.gen_range(0..=MAX_CONCURRENCY),
        })
        .collect()
}

/// Generate samples for the configured window ending at `now` and store them.
///
/// Failed inserts (for example timestamps already present) are logged and skipped.
pub async fn ingest(db: &MetricsDb, config: &IngestConfig, now: i64) -> IngestSummary {
    let start = now - config.window_seconds as i64;
    let samples = generate_samples(start, now, config.step_seconds, &mut rand::thread_rng());

    info!(start, end = now, count = samples.len(), "Ingesting metric samples");

    let mut summary = IngestSummary::default();
    for sample in &samples {
        match db.store_metric(sample).await {
            Ok(()) => summary.stored += 1,
            Err(e) => {
                warn!(timestamp = sample.timestamp, error = %e, "Error inserting sample");
                summary.failed += 1;
            }
        }
    }

    info!(
        stored = summary.stored,
        failed = summary.failed,
        "Data ingestion complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_samples_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = generate_samples(1_000, 1_300, 10, &mut rng);

        assert_eq!(samples.len(), 31);
        assert_eq!(samples.first().unwrap().timestamp, 1_000);
        assert_eq!(samples.last().unwrap().timestamp, 1_300);
        for sample in &samples {
            assert!((0.0..100.0).contains(&sample.cpu_load));
            assert!((0..=MAX_CONCURRENCY).contains(&sample.concurrency));
        }
    }

    #[test]
    fn test_generate_samples_zero_step() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generate_samples(0, 2, 0, &mut rng).len(), 3);
    }

    #[tokio::test]
    async fn test_ingest_twice_skips_duplicates() {
        let db = MetricsDb::new("sqlite::memory:", 1).await.unwrap();
        let config = IngestConfig {
            window_seconds: 60,
            step_seconds: 10,
        };

        let first = ingest(&db, &config, 10_000).await;
        assert_eq!(first, IngestSummary { stored: 7, failed: 0 });

        let second = ingest(&db, &config, 10_000).await;
        assert_eq!(second, IngestSummary { stored: 0, failed: 7 });

        assert_eq!(db.get_metrics(0, 20_000, 0, 0).await.unwrap().len(), 7);
    }
}
