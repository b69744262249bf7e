//! Validated file access: reads, atomic writes, backups, rollback and
//! backup retention.
//!
//! Every public operation runs its paths through the [`PathValidator`]
//! before touching the filesystem. A rejected path performs no I/O.

use crate::config::UpdaterConfig;
use crate::error::ErrorKind;
use crate::safety::{PathValidator, SecurityError};
use crate::yaml::YamlError;
use filetime::FileTime;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const BACKUP_EXTENSION: &str = "backup";
/// Collision counters tried before giving up on a backup name.
const MAX_BACKUP_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("file {} is {size} bytes, exceeding the limit of {limit} bytes", path.display())]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: usize,
    },

    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup {} is not valid YAML: {source}", path.display())]
    InvalidBackup {
        path: PathBuf,
        #[source]
        source: YamlError,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Security(_) => ErrorKind::Security,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::TooLarge { .. } => ErrorKind::Validation,
            StoreError::Io { .. } => ErrorKind::FileSystem,
            StoreError::InvalidBackup { .. } => ErrorKind::Syntax,
        }
    }
}

fn io_error<'a>(
    operation: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |source| StoreError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

/// The filesystem primitives the store is built on.
///
/// [`StdFileSystem`] is the real implementation; tests substitute their own
/// to simulate failures such as a rename that never lands.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn file_size(&self, path: &Path) -> io::Result<u64>;
    fn modified(&self, path: &Path) -> io::Result<FileTime>;
    /// Write `contents` to a new, synced temp file in `dir` whose name starts
    /// with `.<name>.`, and return its path.
    fn write_temp(&self, dir: &Path, name: &str, contents: &[u8]) -> io::Result<PathBuf>;
    /// Create `path` with `contents`; fails with `AlreadyExists` instead of
    /// replacing an existing file.
    fn write_new(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Regular files directly inside `dir`.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn modified(&self, path: &Path) -> io::Result<FileTime> {
        let metadata = fs::metadata(path)?;
        Ok(FileTime::from_last_modification_time(&metadata))
    }

    fn write_temp(&self, dir: &Path, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.into_temp_path().keep().map_err(|e| e.error)
    }

    fn write_new(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = parent_dir(path);
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// Parent directory of `path`; a bare file name lives in `.`.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> Result<String, StoreError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::Io {
            operation: "resolve file name of",
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        })
}

/// `YYYYMMDD_HHMMSS`, optionally followed by a `-N` collision counter.
fn is_backup_stamp(stamp: &str) -> bool {
    let (stamp, counter) = match stamp.split_once('-') {
        Some((stamp, counter)) => (stamp, Some(counter)),
        None => (stamp, None),
    };
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    let stamp_ok = stamp
        .split_once('_')
        .is_some_and(|(date, clock)| digits(date, 8) && digits(clock, 6));
    stamp_ok
        && counter.map_or(true, |counter| {
            !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Timestamp used in backup names, in UTC.
pub fn backup_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))
}

pub struct FileStore<F = StdFileSystem> {
    fs: F,
    validator: PathValidator,
    config: UpdaterConfig,
}

impl FileStore<StdFileSystem> {
    pub fn new(config: UpdaterConfig) -> Self {
        Self::with_file_system(config, StdFileSystem)
    }
}

impl<F: FileSystem> FileStore<F> {
    pub fn with_file_system(config: UpdaterConfig, fs: F) -> Self {
        let validator = PathValidator::with_allowed_prefixes(&config.allowed_prefixes);
        Self {
            fs,
            validator,
            config,
        }
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn read_validated(&self, path: impl AsRef<Path>) -> Result<String, StoreError> {
        let path = self.validator.validate(path)?;

        let size = match self.fs.file_size(&path) {
            Ok(size) => size,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path });
            }
            Err(err) => return Err(io_error("inspect", &path)(err)),
        };

        let limit = self.config.parser.max_document_bytes;
        if size > limit as u64 {
            return Err(StoreError::TooLarge { path, size, limit });
        }

        let text = self
            .fs
            .read_to_string(&path)
            .map_err(io_error("read", &path))?;
        debug!(path = %path.display(), bytes = text.len(), "read file");
        Ok(text)
    }

    /// Replace the file contents in one step: a synced sibling temp file is
    /// renamed over the target. On failure the temp file is removed and the
    /// target is left as it was.
    pub fn write_atomic(&self, path: impl AsRef<Path>, contents: &str) -> Result<(), StoreError> {
        let path = self.validator.validate(path)?;

        if !self.config.atomic_write {
            self.fs
                .write(&path, contents.as_bytes())
                .map_err(io_error("write", &path))?;
            info!(path = %path.display(), bytes = contents.len(), "wrote file");
            return Ok(());
        }

        let name = file_name(&path)?;
        let dir = parent_dir(&path);
        let temp = self
            .fs
            .write_temp(&dir, &name, contents.as_bytes())
            .map_err(io_error("write temp file for", &path))?;

        if let Err(err) = self.fs.rename(&temp, &path) {
            if let Err(cleanup) = self.fs.remove_file(&temp) {
                warn!(
                    temp = %temp.display(),
                    error = %cleanup,
                    "failed to remove temp file after rename failure"
                );
            }
            return Err(io_error("replace", &path)(err));
        }

        info!(path = %path.display(), bytes = contents.len(), "wrote file atomically");
        Ok(())
    }

    /// Directory that holds the backups of `path`.
    pub fn backup_dir_for(&self, path: &Path) -> PathBuf {
        self.config
            .backup_dir
            .clone()
            .unwrap_or_else(|| parent_dir(path))
    }

    /// Save `contents` as `<name>.<YYYYMMDD_HHMMSS>.backup`. Backups are never
    /// overwritten; a name already taken gets a `-N` counter.
    pub fn create_backup(&self, path: impl AsRef<Path>, contents: &str) -> Result<PathBuf, StoreError> {
        let path = self.validator.validate(path)?;
        let name = file_name(&path)?;
        let dir = self.backup_dir_for(&path);
        let stamp = backup_timestamp(OffsetDateTime::now_utc()).map_err(|err| StoreError::Io {
            operation: "timestamp backup of",
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::Other, err),
        })?;

        let dir = self.validator.validate(&dir)?;
        self.fs
            .create_dir_all(&dir)
            .map_err(io_error("create backup directory", &dir))?;

        for attempt in 0..MAX_BACKUP_ATTEMPTS {
            let candidate = if attempt == 0 {
                format!("{name}.{stamp}.{BACKUP_EXTENSION}")
            } else {
                format!("{name}.{stamp}-{attempt}.{BACKUP_EXTENSION}")
            };
            let backup = self.validator.validate(dir.join(candidate))?;
            match self.fs.write_new(&backup, contents.as_bytes()) {
                Ok(()) => {
                    info!(
                        path = %path.display(),
                        backup = %backup.display(),
                        "created backup"
                    );
                    return Ok(backup);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(io_error("write backup", &backup)(err)),
            }
        }

        Err(StoreError::Io {
            operation: "find a free backup name for",
            path,
            source: io::Error::new(io::ErrorKind::AlreadyExists, "all backup names are taken"),
        })
    }

    /// Restore `path` from `backup`. The backup must pass `validate` first;
    /// a failing backup leaves the live file untouched.
    pub fn rollback<V>(
        &self,
        path: impl AsRef<Path>,
        backup: impl AsRef<Path>,
        validate: V,
    ) -> Result<(), StoreError>
    where
        V: FnOnce(&str) -> Result<(), YamlError>,
    {
        let path = self.validator.validate(path)?;
        let backup = self.validator.validate(backup)?;

        let contents = self.read_validated(&backup)?;
        validate(&contents).map_err(|source| StoreError::InvalidBackup {
            path: backup.clone(),
            source,
        })?;

        self.write_atomic(&path, &contents)?;
        info!(
            path = %path.display(),
            backup = %backup.display(),
            "restored file from backup"
        );
        Ok(())
    }

    /// Remove the oldest backups of `path` beyond `max_backups`, judged by
    /// modification time with the name as tie-breaker. Returns what was
    /// removed; individual removal failures are logged and skipped.
    pub fn cleanup_old_backups(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, StoreError> {
        let path = self.validator.validate(path)?;
        let name = file_name(&path)?;
        let dir = self.validator.validate(self.backup_dir_for(&path))?;

        let files = match self.fs.list_files(&dir) {
            Ok(files) => files,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error("list backups in", &dir)(err)),
        };

        let prefix = format!("{name}.");
        let suffix = format!(".{BACKUP_EXTENSION}");
        let mut backups: Vec<(FileTime, PathBuf)> = files
            .into_iter()
            .filter(|file| {
                file.file_name()
                    .map(|file_name| file_name.to_string_lossy())
                    .and_then(|file_name| {
                        file_name
                            .strip_prefix(prefix.as_str())
                            .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                            .map(is_backup_stamp)
                    })
                    .unwrap_or(false)
            })
            .filter_map(|file| match self.fs.modified(&file) {
                Ok(modified) => Some((modified, file)),
                Err(err) => {
                    warn!(backup = %file.display(), error = %err, "skipping unreadable backup");
                    None
                }
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let mut removed = Vec::new();
        for (_, backup) in backups.into_iter().skip(self.config.max_backups) {
            match self.fs.remove_file(&backup) {
                Ok(()) => {
                    info!(backup = %backup.display(), "removed old backup");
                    removed.push(backup);
                }
                Err(err) => {
                    warn!(backup = %backup.display(), error = %err, "failed to remove old backup");
                }
            }
        }
        Ok(removed)
    }
}
