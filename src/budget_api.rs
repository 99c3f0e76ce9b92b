use crate::errors::*;
use crate::types::*;

/// Session-oriented access to a budgeting service.
///
/// Calls are expected in the order `init`, `download_budget`, `get_budget_month`, with
/// `shutdown` last.  `shutdown` must be safe to call after any of the others failed, including
/// `init`.
pub trait BudgetApi {
    fn init(&mut self, config: &SessionConfig) -> Result<()>;

    fn download_budget(&mut self, sync_id: &SyncId) -> Result<()>;

    /// `month` is passed through untouched; rejecting a malformed token is the service's job.
    fn get_budget_month(&self, month: &str) -> Result<BudgetSnapshot>;

    fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
pub mod stub {
    use std::cell::RefCell;

    use super::*;

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum Call {
        Init(SessionConfig),
        DownloadBudget(SyncId),
        GetBudgetMonth(String),
        Shutdown,
    }

    /// Records every call and answers with scripted results.
    #[derive(Default)]
    pub struct StubBudgetApi {
        pub init_error: Option<String>,
        pub download_error: Option<String>,
        pub month_error: Option<String>,
        pub shutdown_error: Option<String>,
        pub snapshot: BudgetSnapshot,
        pub recorded: RefCell<Vec<Call>>,
    }

    impl StubBudgetApi {
        pub fn returning(snapshot: BudgetSnapshot) -> StubBudgetApi {
            StubBudgetApi {
                snapshot,
                ..StubBudgetApi::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.recorded.borrow().clone()
        }

        pub fn shutdown_count(&self) -> usize {
            self.recorded
                .borrow()
                .iter()
                .filter(|call| **call == Call::Shutdown)
                .count()
        }

        fn record(&self, call: Call) {
            self.recorded.borrow_mut().push(call);
        }
    }

    fn scripted(error: &Option<String>) -> Result<()> {
        match error {
            Some(message) => Err(Error::from(message.as_str())),
            None => Ok(()),
        }
    }

    impl BudgetApi for StubBudgetApi {
        fn init(&mut self, config: &SessionConfig) -> Result<()> {
            self.record(Call::Init(config.clone()));
            scripted(&self.init_error)
        }

        fn download_budget(&mut self, sync_id: &SyncId) -> Result<()> {
            self.record(Call::DownloadBudget(sync_id.clone()));
            scripted(&self.download_error)
        }

        fn get_budget_month(&self, month: &str) -> Result<BudgetSnapshot> {
            self.record(Call::GetBudgetMonth(month.to_string()));
            scripted(&self.month_error)?;
            Ok(self.snapshot.clone())
        }

        fn shutdown(&mut self) -> Result<()> {
            self.record(Call::Shutdown);
            scripted(&self.shutdown_error)
        }
    }
}
