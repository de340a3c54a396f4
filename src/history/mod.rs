use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{info, warn};

use crate::config::{Settings, APP_NAME};
use crate::error::Result;
use crate::fetch::{
    split_date_range, ChunkPool, DateRange, DerivativesChunk, HistorySource, NseTransport,
    ResultCache, StockChunk,
};
use crate::records::{
    build_frame, derivatives_layout, frame, write_csv, ColumnLayout, Frame, Record, STOCK_LAYOUT,
};

pub mod query;

pub use query::{DerivativesContract, InstrumentType, OptionLeg, OptionType};

const STOCK_FUNCTION: &str = "stock";
const DERIVATIVES_FUNCTION: &str = "derivatives";

/// Client for the exchange's historical data.
///
/// Requests are split into chunks the API accepts, fetched newest-first through the
/// on-disk cache and stitched back together in ascending date order.
pub struct NseHistory<S = NseTransport> {
    source: S,
    stock_cache: ResultCache,
    derivatives_cache: ResultCache,
    pool: ChunkPool,
    max_span_days: u32,
    show_progress: bool,
}

impl NseHistory<NseTransport> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = NseTransport::new(settings)?;
        Ok(Self::with_source(transport, settings))
    }
}

impl<S: HistorySource> NseHistory<S> {
    pub fn with_source(source: S, settings: &Settings) -> Self {
        let root = settings.resolved_cache_dir();
        Self {
            source,
            stock_cache: ResultCache::new(&root, format!("{APP_NAME}-stock")),
            derivatives_cache: ResultCache::new(&root, format!("{APP_NAME}-derivatives")),
            pool: ChunkPool::new(settings.workers),
            max_span_days: settings.max_span_days,
            show_progress: settings.show_progress,
        }
    }

    /// Toggle the sequential, progress-bar dispatch path.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache_root(&self) -> &Path {
        self.stock_cache.root()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn stock_raw(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        series: &str,
    ) -> Result<Vec<Record>> {
        let plan = self.chunk_plan(from, to, |range| StockChunk {
            symbol: symbol.to_string(),
            range,
            series: series.to_string(),
        })?;

        let source = &self.source;
        let cached = self
            .stock_cache
            .wrap(STOCK_FUNCTION, move |chunk: StockChunk| async move {
                source.stock_chunk(&chunk).await
            });

        let chunks = self.dispatch(symbol, plan, |chunk| cached.call(chunk)).await?;
        Ok(reassemble(chunks))
    }

    pub async fn derivatives_raw(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        contract: &DerivativesContract,
    ) -> Result<Vec<Record>> {
        let plan = self.chunk_plan(from, to, |range| DerivativesChunk {
            symbol: symbol.to_string(),
            range,
            contract: contract.clone(),
        })?;

        let source = &self.source;
        let cached = self
            .derivatives_cache
            .wrap(DERIVATIVES_FUNCTION, move |chunk: DerivativesChunk| async move {
                source.derivatives_chunk(&chunk).await
            });

        let label = format!("{symbol} {}", contract.instrument());
        let chunks = self.dispatch(&label, plan, |chunk| cached.call(chunk)).await?;
        Ok(reassemble(chunks))
    }

    /// Write equity history as CSV and return the file path. With no `output`, the file
    /// is named `{symbol}-{from}-{to}-{series}.csv` in the working directory.
    pub async fn stock_csv(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        series: &str,
        output: Option<&Path>,
    ) -> Result<PathBuf> {
        let records = self.stock_raw(symbol, from, to, series).await?;
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_csv_path(symbol, from, to, series));
        export_csv(&path, &records, &STOCK_LAYOUT)?;
        Ok(path)
    }

    pub async fn derivatives_csv(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        contract: &DerivativesContract,
        output: Option<&Path>,
    ) -> Result<PathBuf> {
        let records = self.derivatives_raw(symbol, from, to, contract).await?;
        let path = output.map(Path::to_path_buf).unwrap_or_else(|| {
            default_csv_path(symbol, from, to, contract.instrument().code())
        });
        export_csv(&path, &records, derivatives_layout(contract.instrument()))?;
        Ok(path)
    }

    pub async fn stock_df(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        series: &str,
    ) -> Result<Frame> {
        frame::ensure_available()?;
        let records = self.stock_raw(symbol, from, to, series).await?;
        build_frame(&records, &STOCK_LAYOUT)
    }

    pub async fn derivatives_df(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        contract: &DerivativesContract,
    ) -> Result<Frame> {
        frame::ensure_available()?;
        let records = self.derivatives_raw(symbol, from, to, contract).await?;
        build_frame(&records, derivatives_layout(contract.instrument()))
    }

    /// One argument per chunk, newest chunk first. Both dispatch paths use this plan.
    fn chunk_plan<A>(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        build: impl Fn(DateRange) -> A,
    ) -> Result<Vec<A>> {
        let mut plan: Vec<A> = split_date_range(from, to, self.max_span_days)?
            .into_iter()
            .map(build)
            .collect();
        plan.reverse();
        Ok(plan)
    }

    async fn dispatch<A, F, Fut>(
        &self,
        label: &str,
        plan: Vec<A>,
        fetch: F,
    ) -> Result<Vec<Vec<Record>>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        info!("Fetching {label} history in {} chunk(s)", plan.len());
        if self.show_progress {
            self.pool.run_with_progress(label, plan, fetch).await
        } else {
            self.pool.run(plan, fetch).await
        }
    }
}

/// Undo the newest-first dispatch order and flatten.
fn reassemble(mut chunks: Vec<Vec<Record>>) -> Vec<Record> {
    chunks.reverse();
    chunks.into_iter().flatten().collect()
}

fn default_csv_path(symbol: &str, from: NaiveDate, to: NaiveDate, tag: &str) -> PathBuf {
    PathBuf::from(format!("{symbol}-{from}-{to}-{tag}.csv"))
}

fn export_csv(path: &Path, records: &[Record], layout: &ColumnLayout) -> Result<()> {
    if records.is_empty() {
        warn!("No records returned; skipping {}", path.display());
        return Ok(());
    }
    write_csv(path, records, layout)
}
