use std::collections::HashSet;

use async_trait::async_trait;
use log::debug;

use crate::client::FtxClient;
use crate::error::ApiError;
use crate::types::Trade;

/// Server-side page size for the trades listing endpoint. A page shorter
/// than this means no more data remains above `start_time`.
pub const PAGE_LIMIT: usize = 100;

/// Safety bound on the pagination loop. The cursor only regresses when a
/// page contains a timestamp below it; a misbehaving server could feed
/// full pages forever, so exceeding this is reported rather than
/// truncated silently.
const MAX_PAGES: usize = 10_000;

/// One page fetch of the trades listing. Seam between the aggregator and
/// the client, so the loop can be exercised against synthetic pages.
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn trades_page(
        &self,
        market: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Trade>, ApiError>;
}

#[async_trait]
impl TradeSource for FtxClient {
    async fn trades_page(
        &self,
        market: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Trade>, ApiError> {
        self.get_trades(market, start_time, end_time).await
    }
}

/// Fetch every trade for `market` within `[start_time, end_time]` (epoch
/// seconds, either bound open-ended), walking backward in time.
///
/// Each iteration moves the `end_time` cursor to the minimum timestamp of
/// the full page just fetched, so boundary records sharing a timestamp
/// are fetched twice and deduplicated by trade id. Page order is
/// preserved; later (earlier-time) pages are appended after. Stops on an
/// empty page or a short one. All-or-nothing: a failed page fetch
/// discards everything accumulated.
pub async fn fetch_all_trades<S: TradeSource + ?Sized>(
    source: &S,
    market: &str,
    start_time: Option<f64>,
    end_time: Option<f64>,
) -> Result<Vec<Trade>, ApiError> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut trades: Vec<Trade> = Vec::new();
    let mut cursor = end_time;

    for _ in 0..MAX_PAGES {
        let page = source.trades_page(market, start_time, cursor).await?;
        debug!(
            "fetched {} trades for {} with end_time {:?}",
            page.len(),
            market,
            cursor
        );

        // Cursor regression uses the full page, not the deduplicated one,
        // so records straddling a page boundary are never skipped.
        let Some(oldest) = page.iter().map(|t| t.time).min() else {
            return Ok(trades);
        };
        let short_page = page.len() < PAGE_LIMIT;

        for trade in page {
            if seen.insert(trade.id) {
                trades.push(trade);
            }
        }

        if short_page {
            return Ok(trades);
        }
        // Trade timestamps carry microseconds; the cursor must keep them,
        // or it lands below the true page minimum and the window between
        // the two is never fetched.
        cursor = Some(oldest.timestamp_micros() as f64 / 1_000_000.0);
    }

    Err(ApiError::PaginationExhausted { pages: MAX_PAGES })
}
