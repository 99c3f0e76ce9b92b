use std::fmt;
use std::path::PathBuf;

/// Opaque budget month document, printed as-is.
pub type BudgetSnapshot = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SyncId(pub String);

/// Connection parameters for one budget session.  Built once at start-up and never mutated.
#[derive(Clone, Eq, PartialEq)]
pub struct SessionConfig {
    pub data_dir: PathBuf,
    pub server_url: String,
    pub password: String,
    pub sync_id: SyncId,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchOutcome {
    Printed,
    Failed,
}

impl FetchOutcome {
    /// A failure already reported by the top-level handler still ends the process normally.
    pub fn exit_code(self) -> i32 {
        match self {
            FetchOutcome::Printed | FetchOutcome::Failed => 0,
        }
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Hand-written so the password never ends up in debug logs.
impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("data_dir", &self.data_dir)
            .field("server_url", &self.server_url)
            .field("password", &"<hidden>")
            .field("sync_id", &self.sync_id)
            .finish()
    }
}
