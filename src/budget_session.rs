use log::{debug, warn};

use crate::budget_api::*;
use crate::errors::*;
use crate::types::*;

/// Scoped owner of a budget API session.
///
/// The underlying `shutdown` runs exactly once: through `close` on the normal path, or from
/// `Drop` if the session goes out of scope without being closed.
pub struct BudgetSession<'a, A: BudgetApi> {
    api: &'a mut A,
    closed: bool,
}

impl<'a, A: BudgetApi> BudgetSession<'a, A> {
    pub fn new(api: &'a mut A) -> BudgetSession<'a, A> {
        BudgetSession { api, closed: false }
    }

    pub fn open(&mut self, config: &SessionConfig) -> Result<()> {
        debug!("Opening budget session: {:?}", config);
        self.api
            .init(config)
            .chain_err(|| "Failed to open budget session")
    }

    pub fn download_budget(&mut self, sync_id: &SyncId) -> Result<()> {
        self.api
            .download_budget(sync_id)
            .chain_err(|| format!("Failed to download budget with sync id {}", sync_id))
    }

    pub fn get_budget_month(&self, month: &str) -> Result<BudgetSnapshot> {
        self.api
            .get_budget_month(month)
            .chain_err(|| format!("Failed to load budget month {}", month))
    }

    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Closing budget session");
        self.api
            .shutdown()
            .chain_err(|| "Failed to close budget session")
    }
}

impl<'a, A: BudgetApi> Drop for BudgetSession<'a, A> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("{}", err);
        }
    }
}
