use std::future::Future;

use crate::error::Result;
use crate::records::Record;

pub mod cache;
pub mod decode;
pub mod pool;
pub mod ranges;
pub mod request;

pub use cache::{CacheArgs, CacheKey, Cached, ResultCache};
pub use pool::ChunkPool;
pub use ranges::{split_date_range, DateRange, DEFAULT_MAX_SPAN_DAYS};
pub use request::{DerivativesChunk, NseTransport, StockChunk};

/// Default number of chunk requests kept in flight; the API blocks aggressive clients.
pub const DEFAULT_WORKERS: usize = 2;

pub type FetchResult<T> = Result<T>;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}

/// Anything that can fetch a single chunk of history.
///
/// `NseTransport` talks to the exchange; tests plug in stubs.
pub trait HistorySource {
    fn stock_chunk(&self, chunk: &StockChunk)
        -> impl Future<Output = FetchResult<Vec<Record>>> + Send;

    fn derivatives_chunk(
        &self,
        chunk: &DerivativesChunk,
    ) -> impl Future<Output = FetchResult<Vec<Record>>> + Send;
}
