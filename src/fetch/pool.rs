use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::fetch::{ensure_concurrency_limit, DEFAULT_WORKERS};

/// Bounded executor for independent chunk fetches.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPool {
    workers: usize,
}

impl Default for ChunkPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ChunkPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: ensure_concurrency_limit(workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `fetch` over every argument with at most `workers` calls in flight.
    ///
    /// Results come back in the order of `args`. The first failure aborts the run and
    /// drops whatever else was in flight.
    pub async fn run<A, T, F, Fut>(&self, args: Vec<A>, fetch: F) -> Result<Vec<T>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        stream::iter(args)
            .map(fetch)
            .buffered(self.workers)
            .try_collect()
            .await
    }

    /// Sequential variant of [`run`](Self::run) that ticks a progress bar per chunk.
    pub async fn run_with_progress<A, T, F, Fut>(
        &self,
        label: &str,
        args: Vec<A>,
        fetch: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let pb = ProgressBar::new(args.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} chunks") {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(label.to_string());

        let mut results = Vec::with_capacity(args.len());
        for arg in args {
            match fetch(arg).await {
                Ok(value) => {
                    results.push(value);
                    pb.inc(1);
                }
                Err(err) => {
                    pb.abandon_with_message(format!("error: {err}"));
                    return Err(err);
                }
            }
        }

        pb.finish();
        Ok(results)
    }
}
