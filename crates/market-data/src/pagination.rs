//! Continuation-marker pagination for chunked time-series endpoints.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::errors::BrokerApiError;

/// Fixed pause between pages. Pacing toward the provider's rate limits,
/// unconditional and separate from any retry backoff.
pub const DEFAULT_INTER_PAGE_DELAY: Duration = Duration::from_millis(500);

/// One fetched page: its rows plus the marker to request the next one.
/// `next == None` means the provider signalled the end of the series.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub rows: Vec<Value>,
    pub next: Option<String>,
}

/// Where a pagination run currently stands.
#[derive(Clone, Debug)]
pub struct ContinuationState {
    /// Marker to send with the next fetch; `None` on the first page
    pub cursor: Option<String>,
    /// Rows gathered so far
    pub accumulated: usize,
    /// Set once the provider signals no more data
    pub exhausted: bool,
}

impl ContinuationState {
    fn start() -> Self {
        Self {
            cursor: None,
            accumulated: 0,
            exhausted: false,
        }
    }
}

/// Drives a fetch closure page by page until the series is exhausted or a
/// row cap is reached.
///
/// Pages are fetched strictly sequentially: each one depends on the marker
/// from the previous response. Retrying an individual fetch is the
/// caller's concern; the driver only paces and accumulates.
pub struct Paginator {
    max_rows: Option<usize>,
    inter_page_delay: Duration,
}

impl Paginator {
    pub fn new(max_rows: Option<usize>) -> Self {
        Self {
            max_rows,
            inter_page_delay: DEFAULT_INTER_PAGE_DELAY,
        }
    }

    pub fn with_delay(mut self, inter_page_delay: Duration) -> Self {
        self.inter_page_delay = inter_page_delay;
        self
    }

    /// Collects every page's rows in arrival order, truncated to `max_rows`
    /// when a cap is set.
    pub async fn collect<F, Fut>(&self, mut fetch: F) -> Result<Vec<Value>, BrokerApiError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page, BrokerApiError>>,
    {
        let mut state = ContinuationState::start();
        let mut rows = Vec::new();

        while !state.exhausted {
            let page = fetch(state.cursor.clone()).await?;

            state.accumulated += page.rows.len();
            // An end-of-series marker wins over the cap check below.
            if page.rows.is_empty() || page.next.is_none() {
                state.exhausted = true;
            }
            rows.extend(page.rows);
            state.cursor = page.next;

            if let Some(cap) = self.max_rows {
                if state.accumulated >= cap {
                    break;
                }
            }
            if !state.exhausted {
                tokio::time::sleep(self.inter_page_delay).await;
            }
        }

        if let Some(cap) = self.max_rows {
            rows.truncate(cap);
        }
        Ok(rows)
    }
}
