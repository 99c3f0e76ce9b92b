pub const MONTH_ARG: &str = "month";
pub const DATA_DIR_ARG: &str = "data-dir";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const SERVER_URL_ARG: &str = "server-url";
pub const SERVER_URL_ENV: &str = "SERVER_URL";
pub const PASSWORD_ARG: &str = "password";
pub const PASSWORD_ENV: &str = "PASSWORD";
pub const SYNC_ID_ARG: &str = "sync-id";
pub const SYNC_ID_ENV: &str = "SYNC_ID";
pub const BANK_ARG: &str = "bank";
pub const INPUT_FILE_ARG: &str = "input-file";

pub const RUNTIME_ERROR_PREFIX: &str = "An error occurred:";

pub const LOGIN_PATH: &str = "account/login";
pub const LIST_USER_FILES_PATH: &str = "sync/list-user-files";
pub const DOWNLOAD_USER_FILE_PATH: &str = "sync/download-user-file";
pub const TOKEN_HEADER: &str = "X-ACTUAL-TOKEN";
pub const FILE_ID_HEADER: &str = "X-ACTUAL-FILE-ID";
pub const PASSWORD_LOGIN_METHOD: &str = "password";
pub const STATUS_OK: &str = "ok";

pub const BUDGET_DATABASE_FILENAME: &str = "db.sqlite";
pub const BUDGET_METADATA_FILENAME: &str = "metadata.json";
pub const BUDGET_SHEET_PREFIX: &str = "budget";
pub const SNAPSHOT_MONTH_KEY: &str = "month";
pub const SNAPSHOT_CATEGORY_GROUPS_KEY: &str = "categoryGroups";
pub const SNAPSHOT_CATEGORIES_KEY: &str = "categories";
pub const GROUP_CELL_PREFIX: &str = "group-";
