//! Performance metrics and statistics tracking for the inference server.

use crate::types::{EnsembleResult, ModelId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for inference requests
pub struct InferenceMetrics {
    /// Successful predictions
    pub requests_processed: AtomicU64,
    /// Failed predictions
    pub requests_failed: AtomicU64,
    /// Failures by pipeline stage
    failures_by_stage: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Model predict times (in microseconds)
    model_times: RwLock<HashMap<ModelId, Vec<u64>>>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Number of models that voted, per request
    contributing_models: RwLock<Vec<usize>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl InferenceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            failures_by_stage: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            model_times: RwLock::new(HashMap::new()),
            confidence_buckets: RwLock::new([0; 10]),
            contributing_models: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, result: &EnsembleResult) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (result.confidence() * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut counts) = self.contributing_models.write() {
            counts.push(result.model_count());
            if counts.len() > 1000 {
                counts.drain(0..500);
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, stage: &str) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_stage) = self.failures_by_stage.write() {
            *by_stage.entry(stage.to_string()).or_insert(0) += 1;
        }
    }

    /// Record model predict time
    pub fn record_model_time(&self, model: ModelId, duration: Duration) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model).or_default();
            model_times.push(duration.as_micros() as u64);
            // Keep only last 1000 per model
            if model_times.len() > 1000 {
                model_times.drain(0..500);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get per-model predict statistics
    pub fn get_model_stats(&self) -> BTreeMap<ModelId, ModelStats> {
        let mut stats = BTreeMap::new();
        let Ok(times) = self.model_times.read() else {
            return stats;
        };

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                *model,
                ModelStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[(count as f64 * 0.99) as usize],
                },
            );
        }

        stats
    }

    /// Average number of models that voted per request
    pub fn get_avg_contributing_models(&self) -> f64 {
        match self.contributing_models.read() {
            Ok(counts) if !counts.is_empty() => {
                counts.iter().sum::<usize>() as f64 / counts.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get confidence distribution
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Get failures by pipeline stage
    pub fn get_failures_by_stage(&self) -> HashMap<String, u64> {
        self.failures_by_stage
            .read()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Point-in-time view of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            failures_by_stage: self.get_failures_by_stage(),
            throughput: self.get_throughput(),
            processing: self.get_processing_stats(),
            models: self.get_model_stats(),
            avg_contributing_models: self.get_avg_contributing_models(),
            confidence_distribution: self.get_confidence_distribution(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let total = snapshot.requests_processed + snapshot.requests_failed;
        let failure_rate = if total > 0 {
            (snapshot.requests_failed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            ENSEMBLE CLASSIFIER - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions Served: {:>8}  │  Throughput: {:>6.1} req/s    ║",
            snapshot.requests_processed, snapshot.throughput
        );
        info!(
            "║ Failed Requests:    {:>8}  │  Failure Rate: {:>6.1}%     ║",
            snapshot.requests_failed, failure_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            snapshot.processing.mean_us,
            snapshot.processing.p50_us,
            snapshot.processing.p95_us,
            snapshot.processing.p99_us
        );
        info!(
            "║ Models voting per request: {:>4.2} of {}                         ║",
            snapshot.avg_contributing_models,
            ModelId::ALL.len()
        );
        if !snapshot.failures_by_stage.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Failures by Stage:                                           ║");
            for (stage, count) in &snapshot.failures_by_stage {
                info!("║   {:14}: {:>6}                                     ║", stage, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confidence Distribution:                                     ║");
        let served: u64 = snapshot.confidence_distribution.iter().sum();
        for (i, &count) in snapshot.confidence_distribution.iter().enumerate() {
            let pct = if served > 0 { (count as f64 / served as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        if !snapshot.models.is_empty() {
            info!("Model Predict Times (μs):");
            for (model, stats) in &snapshot.models {
                info!(
                    "  {}: mean={} p50={} p99={} (calls={})",
                    model, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
                );
            }
        }
    }
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Model-specific statistics
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Serializable metrics view served by `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_processed: u64,
    pub requests_failed: u64,
    pub failures_by_stage: HashMap<String, u64>,
    pub throughput: f64,
    pub processing: ProcessingStats,
    pub models: BTreeMap<ModelId, ModelStats>,
    pub avg_contributing_models: f64,
    pub confidence_distribution: [u64; 10],
    pub uptime_secs: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<InferenceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<InferenceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
