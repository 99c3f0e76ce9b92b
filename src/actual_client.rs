use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::budget_api::*;
use crate::budget_file::*;
use crate::budget_month::*;
use crate::constants::*;
use crate::database::*;
use crate::errors::*;
use crate::types::*;

/// `BudgetApi` backed by an Actual Budget sync server.
pub struct ActualClient {
    http: reqwest::Client,
    session: Option<ServerSession>,
    budget: Option<OpenBudget>,
}

struct ServerSession {
    server_url: String,
    data_dir: PathBuf,
    token: String,
}

struct OpenBudget {
    file: BudgetFile,
    database: BudgetDatabase,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    login_method: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserFile {
    file_id: String,
    group_id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    deleted: serde_json::Value,
    encrypt_key_id: Option<String>,
}

impl ActualClient {
    pub fn new() -> Result<ActualClient> {
        let http = reqwest::Client::builder()
            .build()
            .chain_err(|| "Failed to create HTTP client")?;
        Ok(ActualClient {
            http,
            session: None,
            budget: None,
        })
    }

    fn get_envelope<T: DeserializeOwned>(&self, session: &ServerSession, path: &str) -> Result<T> {
        let url = endpoint(&session.server_url, path);
        debug!("Budget server request: GET {}", url);
        let mut response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, session.token.as_str())
            .send()
            .chain_err(|| format!("Failed to send request to {}", url))?;
        let status = response.status();
        let envelope = response
            .json::<Envelope<T>>()
            .chain_err(|| format!("Unexpected {} response from {}", status, url))?;
        envelope_data(envelope).chain_err(|| format!("Request to {} failed", url))
    }

    fn download_user_file(&self, session: &ServerSession, file_id: &str) -> Result<Vec<u8>> {
        let url = endpoint(&session.server_url, DOWNLOAD_USER_FILE_PATH);
        debug!("Budget server request: GET {} ({})", url, file_id);
        let mut response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, session.token.as_str())
            .header(FILE_ID_HEADER, file_id)
            .send()
            .chain_err(|| format!("Failed to send request to {}", url))?;
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            bail!("{} response from {}: {}", response.status(), url, body.trim());
        }
        let mut archive_bytes = Vec::new();
        response
            .copy_to(&mut archive_bytes)
            .chain_err(|| format!("Failed to read budget file {}", file_id))?;
        debug!("Downloaded {} bytes", archive_bytes.len());
        Ok(archive_bytes)
    }
}

impl BudgetApi for ActualClient {
    fn init(&mut self, config: &SessionConfig) -> Result<()> {
        fs::create_dir_all(&config.data_dir).chain_err(|| {
            format!(
                "Failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;
        info!("Logging in to budget server {}...", config.server_url);
        let url = endpoint(&config.server_url, LOGIN_PATH);
        let mut response = self
            .http
            .post(&url)
            .json(&LoginRequest {
                login_method: PASSWORD_LOGIN_METHOD,
                password: &config.password,
            })
            .send()
            .chain_err(|| format!("Failed to connect to budget server at {}", config.server_url))?;
        let status = response.status();
        let envelope = response
            .json::<Envelope<LoginData>>()
            .chain_err(|| format!("Unexpected {} response from budget server login", status))?;
        let token = login_token(envelope)?;
        self.session = Some(ServerSession {
            server_url: config.server_url.trim_end_matches('/').to_string(),
            data_dir: config.data_dir.clone(),
            token,
        });
        Ok(())
    }

    fn download_budget(&mut self, sync_id: &SyncId) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .chain_err(|| "No budget server session is open")?;
        info!("Listing budget files...");
        let user_files: Vec<UserFile> = self.get_envelope(session, LIST_USER_FILES_PATH)?;
        let user_file = select_user_file(&user_files, sync_id)?;
        info!(
            "Downloading budget file {}...",
            user_file.name.as_deref().unwrap_or(&user_file.file_id)
        );
        let archive_bytes = self.download_user_file(session, &user_file.file_id)?;
        let budget_dir = session.data_dir.join(&user_file.file_id);
        let file = BudgetFile::extract(&archive_bytes, &budget_dir)?;
        file.verify_group_id(sync_id)?;
        let database = BudgetDatabase::open(&file.database_file())?;
        info!("Opened budget \"{}\"", file.display_name());
        self.budget = Some(OpenBudget { file, database });
        Ok(())
    }

    fn get_budget_month(&self, month: &str) -> Result<BudgetSnapshot> {
        let budget = self
            .budget
            .as_ref()
            .chain_err(|| "No budget has been downloaded")?;
        let sheet = sheet_for_month(month);
        let cells = budget.database.get_sheet_cells(&sheet)?;
        debug!(
            "Loaded {} cells of sheet {} from {}",
            cells.len(),
            sheet,
            budget.file.dir.display()
        );
        ensure!(
            !cells.is_empty(),
            format!("No budget exists for month: {}", month)
        );
        let groups = budget.database.get_category_groups()?;
        let categories = budget.database.get_categories()?;
        Ok(build_snapshot(month, cells, &groups, &categories))
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(budget) = self.budget.take() {
            debug!("Closing budget \"{}\"", budget.file.display_name());
        }
        self.session = None;
        Ok(())
    }
}

fn endpoint(server_url: &str, path: &str) -> String {
    format!("{}/{}", server_url.trim_end_matches('/'), path)
}

fn envelope_data<T>(envelope: Envelope<T>) -> Result<T> {
    match envelope {
        Envelope {
            status,
            data: Some(data),
            ..
        } if status == STATUS_OK => Ok(data),
        Envelope {
            reason: Some(reason),
            ..
        } => bail!("Budget server error: {}", reason),
        Envelope { status, .. } => bail!("Budget server returned status {:?}", status),
    }
}

fn login_token(envelope: Envelope<LoginData>) -> Result<String> {
    match envelope_data(envelope) {
        Ok(LoginData { token: Some(token) }) => Ok(token),
        Ok(LoginData { token: None }) => bail!("Authentication failed: server returned no token"),
        Err(err) => Err(err).chain_err(|| "Authentication failed"),
    }
}

fn select_user_file<'a>(user_files: &'a [UserFile], sync_id: &SyncId) -> Result<&'a UserFile> {
    let user_file = user_files
        .iter()
        .filter(|file| !is_truthy(&file.deleted))
        .find(|file| file.group_id.as_deref() == Some(sync_id.0.as_str()))
        .chain_err(|| format!("No budget file found for sync id {}", sync_id))?;
    ensure!(
        user_file.encrypt_key_id.is_none(),
        format!(
            "Budget file {} is encrypted, which is not supported",
            user_file.file_id
        )
    );
    Ok(user_file)
}

// The server reports 'deleted' as 0/1 or as a boolean depending on its version.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().map_or(false, |n| n != 0.0),
        _ => false,
    }
}

fn sheet_for_month(month: &str) -> String {
    format!("{}{}", BUDGET_SHEET_PREFIX, month.replace('-', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::create_category_tables;
    use diesel::prelude::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    fn envelope<T>(status: &str, data: Option<T>, reason: Option<&str>) -> Envelope<T> {
        Envelope {
            status: status.to_string(),
            data,
            reason: reason.map(str::to_string),
        }
    }

    fn user_files(value: serde_json::Value) -> Vec<UserFile> {
        serde_json::from_value(value).unwrap()
    }

    fn sync_id() -> SyncId {
        SyncId("3b0e4b8b-0a2c-4b4e-9c7e-2f1a2c3d4e5f".to_string())
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("https://actual.example.com/", LOGIN_PATH),
            "https://actual.example.com/account/login"
        );
        assert_eq!(
            endpoint("http://localhost:5006", LIST_USER_FILES_PATH),
            "http://localhost:5006/sync/list-user-files"
        );
    }

    #[test]
    fn test_login_token_ok() {
        let token = login_token(envelope(
            "ok",
            Some(LoginData {
                token: Some("abc123".to_string()),
            }),
            None,
        ))
        .unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_login_token_invalid_password() {
        let err = login_token(envelope("error", None, Some("invalid-password"))).unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed");
        assert_eq!(
            err.iter().nth(1).unwrap().to_string(),
            "Budget server error: invalid-password"
        );
    }

    #[test]
    fn test_login_token_missing_token() {
        let err = login_token(envelope("ok", Some(LoginData { token: None }), None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Authentication failed: server returned no token"
        );
    }

    #[test]
    fn test_login_request_wire_format() {
        let body = serde_json::to_value(&LoginRequest {
            login_method: PASSWORD_LOGIN_METHOD,
            password: "s3cret",
        })
        .unwrap();
        assert_eq!(body, json!({ "loginMethod": "password", "password": "s3cret" }));
    }

    #[test]
    fn test_select_user_file_matches_group_id() {
        let files = user_files(json!([
            { "fileId": "file-old", "groupId": sync_id().0, "name": "Old", "deleted": 1, "encryptKeyId": null },
            { "fileId": "file-other", "groupId": "other", "name": "Other", "deleted": 0, "encryptKeyId": null },
            { "fileId": "file-1", "groupId": sync_id().0, "name": "My Finances", "deleted": 0, "encryptKeyId": null },
        ]));
        assert_eq!(select_user_file(&files, &sync_id()).unwrap().file_id, "file-1");
    }

    #[test]
    fn test_select_user_file_accepts_boolean_deleted_flag() {
        let files = user_files(json!([
            { "fileId": "file-gone", "groupId": sync_id().0, "deleted": true },
            { "fileId": "file-1", "groupId": sync_id().0, "deleted": false },
        ]));
        assert_eq!(select_user_file(&files, &sync_id()).unwrap().file_id, "file-1");
    }

    #[test]
    fn test_select_user_file_unknown_sync_id() {
        let files = user_files(json!([{ "fileId": "file-1", "groupId": "other", "deleted": 0 }]));
        let err = select_user_file(&files, &sync_id()).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("No budget file found for sync id {}", sync_id())
        );
    }

    #[test]
    fn test_select_user_file_rejects_encrypted_budget() {
        let files = user_files(json!([
            { "fileId": "file-1", "groupId": sync_id().0, "deleted": 0, "encryptKeyId": "key-1" },
        ]));
        assert!(select_user_file(&files, &sync_id()).is_err());
    }

    #[test]
    fn test_sheet_for_month_passes_token_through() {
        assert_eq!(sheet_for_month("2024-10"), "budget202410");
        assert_eq!(sheet_for_month("foo"), "budgetfoo");
    }

    #[test]
    fn test_download_budget_requires_session() {
        let mut client = ActualClient::new().unwrap();
        let err = client.download_budget(&sync_id()).unwrap_err();
        assert_eq!(err.to_string(), "No budget server session is open");
    }

    #[test]
    fn test_get_budget_month_requires_download() {
        let client = ActualClient::new().unwrap();
        let err = client.get_budget_month("2024-10").unwrap_err();
        assert_eq!(err.to_string(), "No budget has been downloaded");
    }

    // Answers a single HTTP request with `status_line` and `body`, returning the request text.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.is_empty() || line == "\r\n" {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            request.push_str(&String::from_utf8(request_body).unwrap());
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            request
        });
        (url, handle)
    }

    fn session_config(data_dir: PathBuf, server_url: String) -> SessionConfig {
        SessionConfig {
            data_dir,
            server_url,
            password: "s3cret".to_string(),
            sync_id: sync_id(),
        }
    }

    #[test]
    fn test_init_logs_in_and_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("actual-data");
        let (url, server) = serve_once("200 OK", r#"{"status":"ok","data":{"token":"tok-1"}}"#);
        let mut client = ActualClient::new().unwrap();
        client
            .init(&session_config(data_dir.clone(), format!("{}/", url)))
            .unwrap();
        let request = server.join().unwrap();
        assert!(request.starts_with("POST /account/login HTTP/1.1"));
        assert!(request.ends_with(r#"{"loginMethod":"password","password":"s3cret"}"#));
        assert!(data_dir.is_dir());
        let session = client.session.as_ref().unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.server_url, url);
    }

    #[test]
    fn test_init_rejected_password_fails_without_session() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("actual-data");
        let (url, server) = serve_once(
            "400 Bad Request",
            r#"{"status":"error","reason":"invalid-password"}"#,
        );
        let mut client = ActualClient::new().unwrap();
        let err = client
            .init(&session_config(data_dir.clone(), url))
            .unwrap_err();
        server.join().unwrap();
        assert_eq!(err.to_string(), "Authentication failed");
        assert!(err.iter().any(|cause| cause.to_string().contains("invalid-password")));
        assert!(data_dir.is_dir());
        assert!(client.session.is_none());
    }

    #[test]
    fn test_get_budget_month_from_downloaded_budget() {
        let dir = TempDir::new().unwrap();
        let database_file = dir.path().join(BUDGET_DATABASE_FILENAME);
        let connection = SqliteConnection::establish(database_file.to_str().unwrap()).unwrap();
        diesel::sql_query(
            "CREATE TABLE spreadsheet_cells (name TEXT PRIMARY KEY, expr TEXT, cachedValue TEXT)",
        )
        .execute(&connection)
        .unwrap();
        diesel::sql_query(
            "INSERT INTO spreadsheet_cells (name, cachedValue) VALUES \
             ('budget202410!to-budget', '12500'), \
             ('budget202410!total-spent', '-87500'), \
             ('budget202410!budget-cat-rent', '90000'), \
             ('budget202410!group-budget-grp-bills', '90000'), \
             ('budget202411!to-budget', '0')",
        )
        .execute(&connection)
        .unwrap();
        create_category_tables(&database_file);

        let mut client = ActualClient::new().unwrap();
        client.budget = Some(OpenBudget {
            file: BudgetFile {
                dir: dir.path().to_path_buf(),
                metadata: serde_json::from_value(json!({ "budgetName": "My Finances" })).unwrap(),
            },
            database: BudgetDatabase::open(&database_file).unwrap(),
        });

        let snapshot = client.get_budget_month("2024-10").unwrap();
        assert_eq!(snapshot["to-budget"], json!(12500));
        assert_eq!(snapshot["total-spent"], json!(-87500));
        assert_eq!(snapshot["month"], json!("2024-10"));
        let groups = snapshot["categoryGroups"].as_array().unwrap();
        assert_eq!(
            groups
                .iter()
                .map(|group| group["name"].as_str().unwrap())
                .collect::<Vec<_>>(),
            vec!["Bills", "Income"]
        );
        assert_eq!(groups[0]["budget"], json!(90000));
        assert_eq!(
            groups[0]["categories"],
            json!([
                { "id": "cat-rent", "name": "Rent", "group_id": "grp-bills", "is_income": false, "budget": 90000 },
                { "id": "cat-power", "name": "Power", "group_id": "grp-bills", "is_income": false },
            ])
        );

        let err = client.get_budget_month("foo").unwrap_err();
        assert_eq!(err.to_string(), "No budget exists for month: foo");

        client.shutdown().unwrap();
        client.shutdown().unwrap();
        assert!(client.budget.is_none());
    }
}
