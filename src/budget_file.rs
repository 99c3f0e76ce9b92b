use log::debug;
use serde::Deserialize;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::errors::*;
use crate::types::*;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetMetadata {
    pub id: Option<String>,
    pub budget_name: Option<String>,
    pub group_id: Option<String>,
}

/// A budget file downloaded from the sync server and unpacked on disk.
#[derive(Debug)]
pub struct BudgetFile {
    pub dir: PathBuf,
    pub metadata: BudgetMetadata,
}

impl BudgetFile {
    pub fn extract(archive_bytes: &[u8], budget_dir: &Path) -> Result<BudgetFile> {
        let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
            .chain_err(|| "Failed to read downloaded budget archive")?;
        fs::create_dir_all(budget_dir).chain_err(|| {
            format!(
                "Failed to create budget directory: {}",
                budget_dir.display()
            )
        })?;
        for entry_name in &[BUDGET_DATABASE_FILENAME, BUDGET_METADATA_FILENAME] {
            let mut entry = archive
                .by_name(entry_name)
                .chain_err(|| format!("Budget archive is missing {}", entry_name))?;
            let target = budget_dir.join(entry_name);
            let mut file = fs::File::create(&target)
                .chain_err(|| format!("Failed to create {}", target.display()))?;
            let written = io::copy(&mut entry, &mut file)
                .chain_err(|| format!("Failed to extract {}", target.display()))?;
            debug!("Extracted {} ({} bytes)", target.display(), written);
        }
        let metadata_file = budget_dir.join(BUDGET_METADATA_FILENAME);
        let metadata_json = fs::read_to_string(&metadata_file)
            .chain_err(|| format!("Failed to read {}", metadata_file.display()))?;
        let metadata = serde_json::from_str(&metadata_json)
            .chain_err(|| format!("Failed to parse {}", metadata_file.display()))?;
        Ok(BudgetFile {
            dir: budget_dir.to_path_buf(),
            metadata,
        })
    }

    /// Fails when the unpacked budget belongs to a different sync group than the one requested.
    /// Metadata without a group id is accepted.
    pub fn verify_group_id(&self, sync_id: &SyncId) -> Result<()> {
        if let Some(group_id) = &self.metadata.group_id {
            ensure!(
                *group_id == sync_id.0,
                format!(
                    "Downloaded budget belongs to sync id {}, expected {}",
                    group_id, sync_id
                )
            );
        }
        Ok(())
    }

    pub fn database_file(&self) -> PathBuf {
        self.dir.join(BUDGET_DATABASE_FILENAME)
    }

    pub fn display_name(&self) -> &str {
        self.metadata
            .budget_name
            .as_deref()
            .or_else(|| self.metadata.id.as_deref())
            .unwrap_or("unnamed budget")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (entry_name, contents) in entries {
            writer.start_file(*entry_name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_writes_database_and_metadata() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(&[
            ("db.sqlite", &b"not really sqlite"[..]),
            (
                "metadata.json",
                &br#"{"id":"My-Finances-4d1b2a3","budgetName":"My Finances","groupId":"sync-1","cloudFileId":"file-1"}"#[..],
            ),
        ]);
        let budget_dir = dir.path().join("file-1");
        let budget_file = BudgetFile::extract(&archive, &budget_dir).unwrap();
        assert_eq!(
            fs::read(budget_file.database_file()).unwrap(),
            b"not really sqlite".to_vec()
        );
        assert_eq!(
            budget_file.metadata,
            BudgetMetadata {
                id: Some("My-Finances-4d1b2a3".to_string()),
                budget_name: Some("My Finances".to_string()),
                group_id: Some("sync-1".to_string()),
            }
        );
        assert_eq!(budget_file.display_name(), "My Finances");
    }

    fn budget_file_in_group(group_id: Option<&str>) -> BudgetFile {
        BudgetFile {
            dir: PathBuf::from("/tmp/actual/file-1"),
            metadata: BudgetMetadata {
                id: None,
                budget_name: None,
                group_id: group_id.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_verify_group_id() {
        let sync_id = SyncId("sync-1".to_string());
        assert!(budget_file_in_group(Some("sync-1"))
            .verify_group_id(&sync_id)
            .is_ok());
        assert!(budget_file_in_group(None).verify_group_id(&sync_id).is_ok());
        let err = budget_file_in_group(Some("sync-2"))
            .verify_group_id(&sync_id)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Downloaded budget belongs to sync id sync-2, expected sync-1"
        );
    }

    #[test]
    fn test_extract_rejects_archive_without_database() {
        let dir = TempDir::new().unwrap();
        let archive = build_archive(&[("metadata.json", &b"{}"[..])]);
        let err = BudgetFile::extract(&archive, dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "Budget archive is missing db.sqlite");
    }

    #[test]
    fn test_extract_rejects_non_zip_payload() {
        let dir = TempDir::new().unwrap();
        assert!(BudgetFile::extract(b"<html>502 Bad Gateway</html>", dir.path()).is_err());
    }
}
