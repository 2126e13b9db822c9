//! Search-and-subdivide crawl loop.
//!
//! The crawler pulls unprocessed cells from the store, pages through the
//! external search for each one and records progress after every page. A
//! cell whose running result count reaches `result_cap` is handed to the
//! [`Subdivider`]; any other cell is marked processed once its last page is
//! read.

use crate::boundary::BoundaryProvider;
use crate::config::GridConfig;
use crate::engine::cancel::CancelToken;
use crate::engine::subdivide::Subdivider;
use crate::error::Result;
use crate::storage::GridStore;
use gridcrawl_types::cell::{Cell, CellId, CrawlProgress};
use serde::Serialize;

/// One page of results from the external search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub result_count: u64,
    /// Token for the following page, `None` on the last page
    pub next_page_token: Option<String>,
}

/// External place search over one cell.
///
/// Implementations own retries and backoff. Errors should be wrapped with
/// [`GridError::collaborator`](crate::GridError::collaborator).
pub trait PlaceSearch: Send + Sync {
    fn search(&self, cell: &Cell, page_token: Option<&str>) -> Result<SearchPage>;
}

/// What happened to a single crawled cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    /// All pages read below the cap
    Processed { results: u64 },
    /// Cap reached; the cell was replaced by `children` smaller cells
    Split { children: usize },
    /// The cell no longer exists
    Missing,
}

/// Totals for a crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub cells_processed: usize,
    pub cells_split: usize,
    pub children_created: usize,
    pub results: u64,
}

pub struct Crawler<'a, B: ?Sized, S: ?Sized, P: ?Sized> {
    boundary: &'a B,
    store: &'a S,
    search: &'a P,
    config: &'a GridConfig,
    cancel: CancelToken,
}

impl<'a, B, S, P> Crawler<'a, B, S, P>
where
    B: BoundaryProvider + ?Sized,
    S: GridStore + ?Sized,
    P: PlaceSearch + ?Sized,
{
    pub fn new(boundary: &'a B, store: &'a S, search: &'a P, config: &'a GridConfig) -> Self {
        Self {
            boundary,
            store,
            search,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Crawl unprocessed cells until none remain or `max_cells` were handled.
    ///
    /// Children created by a split are unprocessed and picked up by the same
    /// run.
    pub fn run(&self, max_cells: Option<usize>) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let mut handled = 0usize;

        while max_cells.is_none_or(|max| handled < max) {
            self.cancel.check()?;
            let Some(id) = self.store.next_unprocessed()? else {
                break;
            };

            match self.crawl_cell(id)? {
                CellOutcome::Processed { results } => {
                    summary.cells_processed += 1;
                    summary.results += results;
                }
                CellOutcome::Split { children } => {
                    summary.cells_split += 1;
                    summary.children_created += children;
                }
                CellOutcome::Missing => {
                    log::warn!("Store returned missing cell {} as unprocessed", id);
                    break;
                }
            }
            handled += 1;
        }

        log::info!(
            "Crawl finished: {} processed, {} split into {} children, {} results",
            summary.cells_processed,
            summary.cells_split,
            summary.children_created,
            summary.results
        );
        Ok(summary)
    }

    /// Page through one cell, resuming from its stored progress.
    pub fn crawl_cell(&self, id: CellId) -> Result<CellOutcome> {
        self.cancel.check()?;
        let Some(cell) = self.store.get_cell(id)? else {
            return Ok(CellOutcome::Missing);
        };

        let mut progress = cell.crawl_progress.clone().unwrap_or_default();
        loop {
            if progress.total_results >= self.config.result_cap {
                return self.split(id, &progress);
            }
            if progress.current_page > 0 && progress.next_page_token.is_none() {
                self.cancel.check()?;
                self.store.mark_processed(id)?;
                log::debug!(
                    "Cell {} done after {} pages, {} results",
                    id,
                    progress.current_page,
                    progress.total_results
                );
                return Ok(CellOutcome::Processed {
                    results: progress.total_results,
                });
            }

            self.cancel.check()?;
            let page = self
                .search
                .search(&cell, progress.next_page_token.as_deref())?;
            progress = CrawlProgress {
                current_page: progress.current_page + 1,
                next_page_token: page.next_page_token,
                total_results: progress.total_results + page.result_count,
            };

            self.cancel.check()?;
            self.store.update_progress(id, progress.clone())?;
        }
    }

    fn split(&self, id: CellId, progress: &CrawlProgress) -> Result<CellOutcome> {
        log::info!(
            "Cell {} saturated at {} results, subdividing",
            id,
            progress.total_results
        );
        let children = Subdivider::new(self.boundary, self.store, self.config)
            .with_cancel_token(self.cancel.clone())
            .split_cell(id)?;
        Ok(CellOutcome::Split { children })
    }
}
