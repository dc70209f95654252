//! Writing configuration backups to disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

const DEFAULT_DIR: &str = "backup";

/// Where and how a backup is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackupOptions {
    /// Fixed file name. When unset the name is `<host>_config.<timestamp>`.
    pub filename: Option<String>,
    /// Target directory, created if missing (default `backup`).
    pub dir_path: Option<PathBuf>,
    /// Terminate the file with an `eof` line.
    pub append_eof: bool,
}

/// Where a backup ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub backup_path: PathBuf,
    /// Generated file name; absent when a fixed name was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Path without the timestamp suffix; absent for fixed names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortname: Option<PathBuf>,
    pub date: String,
    pub time: String,
}

/// `<base>.<YYYY-MM-DD>@<HH-MM-SS>`
pub fn backup_filename(base: &str, at: DateTime<Local>) -> String {
    format!("{}.{}", base, at.format("%Y-%m-%d@%H-%M-%S"))
}

/// Write `contents` to the backup location described by `options`.
pub async fn write_backup(
    contents: &str,
    host: &str,
    options: &BackupOptions,
    at: DateTime<Local>,
) -> Result<BackupInfo> {
    let dir = options
        .dir_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));

    let (backup_path, filename, shortname) = match &options.filename {
        Some(name) => (dir.join(name), None, None),
        None => {
            let base = format!("{}_config", host);
            let name = backup_filename(&base, at);
            (dir.join(&name), Some(name), Some(dir.join(base)))
        }
    };

    let mut data = contents.to_string();
    if options.append_eof {
        if !data.ends_with('\n') {
            data.push('\n');
        }
        data.push_str("eof\n");
    }

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| backup_error(&dir, source))?;
    tokio::fs::write(&backup_path, data)
        .await
        .map_err(|source| backup_error(&backup_path, source))?;
    info!("configuration backed up to {}", backup_path.display());

    Ok(BackupInfo {
        backup_path,
        filename,
        shortname,
        date: at.format("%Y-%m-%d").to_string(),
        time: at.format("%H:%M:%S").to_string(),
    })
}

fn backup_error(path: &Path, source: std::io::Error) -> crate::error::Error {
    TaskError::Backup {
        path: path.to_path_buf(),
        source,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 8, 5, 9).unwrap()
    }

    #[test]
    fn test_filename_format() {
        assert_eq!(
            backup_filename("edge01_config", at()),
            "edge01_config.2026-10-19@08-05-09"
        );
    }

    #[tokio::test]
    async fn test_generated_name_in_new_directory() {
        let root = tempfile::tempdir().unwrap();
        let options = BackupOptions {
            dir_path: Some(root.path().join("nested")),
            ..Default::default()
        };

        let info = write_backup("lan 0 ip dhcp service server", "edge01", &options, at())
            .await
            .unwrap();
        assert_eq!(info.filename.as_deref(), Some("edge01_config.2026-10-19@08-05-09"));
        assert_eq!(info.shortname, Some(root.path().join("nested/edge01_config")));
        assert_eq!(info.date, "2026-10-19");
        assert_eq!(info.time, "08:05:09");

        let written = std::fs::read_to_string(&info.backup_path).unwrap();
        assert_eq!(written, "lan 0 ip dhcp service server");
    }

    #[tokio::test]
    async fn test_fixed_name_with_eof() {
        let root = tempfile::tempdir().unwrap();
        let options = BackupOptions {
            filename: Some("edge01.cfg".to_string()),
            dir_path: Some(root.path().to_path_buf()),
            append_eof: true,
        };

        let info = write_backup("a\nb", "edge01", &options, at()).await.unwrap();
        assert_eq!(info.backup_path, root.path().join("edge01.cfg"));
        assert!(info.filename.is_none());
        assert_eq!(std::fs::read_to_string(&info.backup_path).unwrap(), "a\nb\neof\n");
    }

    #[tokio::test]
    async fn test_unwritable_location_is_backup_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let options = BackupOptions {
            dir_path: Some(blocker.join("sub")),
            ..Default::default()
        };

        let err = write_backup("a", "edge01", &options, at()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Task(TaskError::Backup { .. })
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: BackupOptions = serde_json::from_str(r#"{"filename": "x.cfg"}"#).unwrap();
        assert_eq!(options.filename.as_deref(), Some("x.cfg"));
        assert!(options.dir_path.is_none());
        assert!(!options.append_eof);
    }
}
