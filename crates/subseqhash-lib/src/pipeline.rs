//! Parallel read ingestion
//!
//! A fixed pool of workers draws read jobs from a bounded crossbeam channel
//! fed by a single producer thread that parses the read file. Workers drain
//! whatever is still queued after the producer closes the channel, then
//! exit; the scope join guarantees no worker outlives the pipeline call.
//!
//! Also defines [`SeedParams`], the validated parameter set shared by the
//! CLI stages.

use std::path::Path;

use anyhow::Result;
use crossbeam::channel;
use tracing::info;

use crate::constants::{is_valid_k, DEFAULT_NUM_THREADS, MAX_K};
use crate::reads;

/// Validated seed-selection parameters
#[derive(Debug, Clone, Copy)]
pub struct SeedParams {
    /// Window length
    pub n: usize,
    /// Seed length (k < n)
    pub k: usize,
    /// Fraction of the expected score required to keep a seed
    pub threshold_factor: f64,
    /// Worker threads for read ingestion
    pub num_threads: usize,
}

impl SeedParams {
    /// Create a parameter set with the default threshold factor and worker
    /// count.
    pub fn new(n: usize, k: usize) -> Result<Self, String> {
        let params = Self {
            n,
            k,
            threshold_factor: crate::constants::THRESHOLD_FACTOR,
            num_threads: DEFAULT_NUM_THREADS,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate the parameter set
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_k(self.k) {
            return Err(format!("k must be in range [1, {}], got k={}", MAX_K, self.k));
        }
        if self.n <= self.k {
            return Err(format!("n must exceed k, got n={}, k={}", self.n, self.k));
        }
        if self.num_threads == 0 {
            return Err("num_threads must be at least 1".to_string());
        }
        if !self.threshold_factor.is_finite() || self.threshold_factor < 0.0 {
            return Err(format!(
                "threshold_factor must be non-negative, got {}",
                self.threshold_factor
            ));
        }
        Ok(())
    }

    /// The absolute score threshold for these parameters.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold_factor * crate::constants::EXPECTED_VALUE * self.k as f64
    }

    /// Log the parameters via tracing
    pub fn print(&self) {
        info!("Seed parameters:");
        info!("  n = {}", self.n);
        info!("  k = {}", self.k);
        info!("  threshold = {}", self.threshold());
        info!("  num_threads = {}", self.num_threads);
    }
}

impl Default for SeedParams {
    fn default() -> Self {
        Self {
            n: 24,
            k: 12,
            threshold_factor: crate::constants::THRESHOLD_FACTOR,
            num_threads: DEFAULT_NUM_THREADS,
        }
    }
}

/// One unit of work: a read's id and its 2-bit symbol sequence
#[derive(Debug)]
pub struct ReadJob {
    /// Read identifier
    pub read_id: u64,
    /// Sequence as 2-bit symbols
    pub symbols: Vec<u8>,
}

/// Run `worker_fn` over every read of `path` with `num_threads` workers.
///
/// The producer thread parses the file and sends each read through a
/// bounded channel; closing the channel is the shutdown signal, and every
/// queued job still runs to completion before the workers exit.
pub fn run_read_pipeline<P, F>(path: P, num_threads: usize, worker_fn: F) -> Result<()>
where
    P: AsRef<Path>,
    F: Fn(ReadJob) + Send + Sync,
{
    let path = path.as_ref();
    let num_threads = num_threads.max(1);
    let (sender, receiver) = channel::bounded::<ReadJob>(num_threads * 2);

    let worker_ref = &worker_fn;
    crossbeam::scope(|scope| {
        for _ in 0..num_threads {
            let recv = receiver.clone();
            scope.spawn(move |_| {
                while let Ok(job) = recv.recv() {
                    worker_ref(job);
                }
            });
        }
        // Drop the extra receiver clone so workers exit once the producer
        // hangs up.
        drop(receiver);

        scope.spawn(move |_| {
            let result = reads::for_each_read(path, |read_id, symbols| {
                sender
                    .send(ReadJob { read_id, symbols })
                    .map_err(|_| anyhow::anyhow!("worker pool shut down early"))
            });
            if let Err(e) = result {
                tracing::error!("Error reading {}: {}", path.display(), e);
            }
            // sender dropped here, signaling shutdown.
        });
    })
    .map_err(|e| anyhow::anyhow!("worker thread panicked: {:?}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::NamedTempFile;

    #[test]
    fn test_params_validate() {
        assert!(SeedParams::new(24, 12).is_ok());
        assert!(SeedParams::new(12, 12).is_err()); // n must exceed k
        assert!(SeedParams::new(70, 65).is_err()); // k too large
        assert!(SeedParams::new(10, 0).is_err());
    }

    #[test]
    fn test_threshold_value() {
        let params = SeedParams::new(24, 12).unwrap();
        let expected = 0.785 * crate::constants::EXPECTED_VALUE * 12.0;
        assert!((params.threshold() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pipeline_visits_every_read() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        for i in 1..=40 {
            writeln!(file, ">{}", i)?;
            writeln!(file, "ACGTACGTACGTACGT")?;
        }
        file.flush()?;

        let count = AtomicU64::new(0);
        let id_sum = AtomicU64::new(0);
        run_read_pipeline(file.path(), 4, |job| {
            count.fetch_add(1, Ordering::Relaxed);
            id_sum.fetch_add(job.read_id, Ordering::Relaxed);
            assert_eq!(job.symbols.len(), 16);
        })?;

        assert_eq!(count.load(Ordering::Relaxed), 40);
        assert_eq!(id_sum.load(Ordering::Relaxed), (1..=40).sum::<u64>());
        Ok(())
    }

    #[test]
    fn test_pipeline_single_thread() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, ">1")?;
        writeln!(file, "ACGT")?;
        file.flush()?;

        let count = AtomicU64::new(0);
        run_read_pipeline(file.path(), 1, |_| {
            count.fetch_add(1, Ordering::Relaxed);
        })?;
        assert_eq!(count.load(Ordering::Relaxed), 1);
        Ok(())
    }
}
