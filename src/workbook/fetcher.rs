use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::{
    config::SheetId,
    error::{FetchError, WarroomResult},
    workbook::Workbook,
};

/// Anything that can produce a fresh [`Workbook`].
///
/// The TTL cache sits on top of this seam; tests plug in counting fakes.
pub trait FetchWorkbook {
    fn fetch(&self) -> impl Future<Output = WarroomResult<Workbook>> + Send;
}

/// Downloads the Google Sheets document as an exported xlsx workbook.
#[derive(Debug, Clone)]
pub struct WorkbookFetcher {
    client: reqwest::Client,
    sheet_id: SheetId,
}

impl WorkbookFetcher {
    pub fn new(sheet_id: SheetId) -> Self {
        Self {
            client: reqwest::Client::new(),
            sheet_id,
        }
    }

    /// Export URL with a cache-busting timestamp; Google's CDN otherwise
    /// serves a stale export for minutes after an edit.
    fn export_url(&self) -> String {
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=xlsx&t={t}",
            self.sheet_id.as_str()
        )
    }
}

impl FetchWorkbook for WorkbookFetcher {
    async fn fetch(&self) -> WarroomResult<Workbook> {
        info!(sheet = %self.sheet_id.redacted(), "Downloading workbook export");

        let response = self
            .client
            .get(self.export_url())
            .send()
            .await
            .map_err(|e| FetchError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                msg: status.canonical_reason().unwrap_or("unknown").to_string(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        info!(bytes = bytes.len(), "Workbook export downloaded");
        Workbook::open(bytes.to_vec())
    }
}
