use log::{error, info, warn};
use std::io::Write;

use crate::budget_api::*;
use crate::budget_session::*;
use crate::constants::*;
use crate::errors::*;
use crate::types::*;

pub struct BudgetFetcher;

impl BudgetFetcher {
    /// Opens a session, downloads the configured budget, prints the snapshot for `month` to
    /// `out` and closes the session.  Failures are reported to `err` rather than returned; the
    /// session is closed either way.
    pub fn run<A: BudgetApi, O: Write, E: Write>(
        api: &mut A,
        config: &SessionConfig,
        month: &str,
        out: &mut O,
        err: &mut E,
    ) -> FetchOutcome {
        let mut session = BudgetSession::new(api);
        let outcome = match Self::fetch_and_print(&mut session, config, month, out) {
            Ok(()) => FetchOutcome::Printed,
            Err(fetch_err) => {
                let message = format_error_chain(&fetch_err);
                error!("{}", message);
                writeln!(err, "{} {}", RUNTIME_ERROR_PREFIX, message).ok();
                FetchOutcome::Failed
            }
        };
        if let Err(close_err) = session.close() {
            warn!("{}", format_error_chain(&close_err));
        }
        outcome
    }

    fn fetch_and_print<A: BudgetApi, O: Write>(
        session: &mut BudgetSession<A>,
        config: &SessionConfig,
        month: &str,
        out: &mut O,
    ) -> Result<()> {
        session.open(config)?;
        session.download_budget(&config.sync_id)?;
        info!("Loading budget month {}...", month);
        let snapshot = session.get_budget_month(month)?;
        let rendered = serde_json::to_string_pretty(&snapshot)
            .chain_err(|| "Failed to render budget snapshot")?;
        writeln!(out, "{}", rendered).chain_err(|| "Failed to write budget snapshot")
    }
}

pub fn format_error_chain(err: &Error) -> String {
    err.iter()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
