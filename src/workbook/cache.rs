use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::WarroomResult,
    workbook::{Workbook, fetcher::FetchWorkbook},
};

/// Memoizes the workbook fetch with a fixed TTL.
///
/// Dashboard renders re-run on every interaction; renders within the TTL
/// window reuse the in-memory workbook instead of re-downloading it. The
/// mutex also serializes concurrent refreshes so the export is downloaded
/// at most once per expiry.
pub struct CachedWorkbook<F: FetchWorkbook> {
    fetcher: F,
    ttl: Duration,
    slot: Mutex<Option<CacheSlot>>,
}

struct CacheSlot {
    fetched_at: Instant,
    workbook: Arc<Workbook>,
}

impl<F: FetchWorkbook> CachedWorkbook<F> {
    pub fn new(fetcher: F, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The current workbook, fetching only when the cached one has expired.
    pub async fn get(&self) -> WarroomResult<Arc<Workbook>> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            debug!(age_secs = cached.fetched_at.elapsed().as_secs(), "Workbook cache hit");
            return Ok(Arc::clone(&cached.workbook));
        }

        let workbook = Arc::new(self.fetcher.fetch().await?);
        *slot = Some(CacheSlot {
            fetched_at: Instant::now(),
            workbook: Arc::clone(&workbook),
        });

        Ok(workbook)
    }

    /// Drops the cached workbook so the next [`get`](Self::get) refetches.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
