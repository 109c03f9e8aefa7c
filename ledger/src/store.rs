use common::snapshot::LedgerSnapshot;
use common::SnapshotError;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_FILE_NAME: &str = "saltybet_users.json";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Use this file as-is instead of probing for a writable directory.
    pub data_file: Option<PathBuf>,
    pub file_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("permission denied: cannot access {}", .path.display())]
    PermissionDenied { path: PathBuf, source: io::Error },
    #[error("file system error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed user data in {}: {source}", .path.display())]
    Malformed { path: PathBuf, source: SnapshotError },
    #[error("could not encode user data for {}: {source}", .path.display())]
    Encode { path: PathBuf, source: SnapshotError },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        if source.kind() == ErrorKind::PermissionDenied {
            StoreError::PermissionDenied { path, source }
        } else {
            StoreError::Io { path, source }
        }
    }
}

/// Flat-file home of the ledger snapshot. The path is fixed once resolved.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Picks the snapshot location for this process. An explicit data file
    /// wins; otherwise the first candidate directory that passes a write
    /// test, falling back to the first candidate when none does.
    pub fn resolve(config: &StoreConfig) -> Self {
        if let Some(path) = &config.data_file {
            return Self::at(path.clone());
        }
        Self::resolve_from(candidate_paths(&config.file_name), &config.file_name)
    }

    /// First writable entry of `candidates`, else the first entry, else the
    /// bare `file_name` relative to the working directory.
    pub fn resolve_from(candidates: Vec<PathBuf>, file_name: &str) -> Self {
        let path = match probe(&candidates) {
            Some(path) => path.clone(),
            None => candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| PathBuf::from(file_name)),
        };
        Self::at(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with `snapshot`, creating parent directories first.
    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let encoded = snapshot.to_json().map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = non_empty_parent(&self.path) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&self.path, encoded).map_err(|e| StoreError::io(&self.path, e))
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<LedgerSnapshot>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        LedgerSnapshot::from_json(&text)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })
    }
}

/// Next to the executable, the working directory, the home directory, then
/// the system temp directory.
pub fn candidate_paths(file_name: &str) -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();

    [exe_dir, cwd, dirs::home_dir(), Some(std::env::temp_dir())]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(file_name))
        .collect()
}

/// First candidate whose directory accepts a throwaway write.
pub fn probe(candidates: &[PathBuf]) -> Option<&PathBuf> {
    candidates.iter().find(|path| {
        let writable = is_writable(path);
        debug!(path = %path.display(), writable, "probed snapshot location");
        writable
    })
}

fn is_writable(path: &Path) -> bool {
    let Some(file_name) = path.file_name() else {
        return false;
    };
    let dir = non_empty_parent(path).unwrap_or(Path::new("."));
    let test_file = dir.join(format!(".test_write_{}", file_name.to_string_lossy()));
    fs::write(&test_file, "test").is_ok() && fs::remove_file(&test_file).is_ok()
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}
