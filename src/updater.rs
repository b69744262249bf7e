//! File-level update workflow: read, parse, edit, validate, back up and
//! write, with each failure tagged by the stage it happened in.

use crate::config::UpdaterConfig;
use crate::error::ErrorKind;
use crate::store::{FileStore, FileSystem, StdFileSystem, StoreError};
use crate::yaml::{validate_tag_value, TagEditor, TagHeuristic, TagLocation, TagPath, YamlError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Field names preferred when a request does not name a path.
const PREFERRED_FIELDS: &[&str] = &["tag", "version", "image"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Read,
    Parse,
    DetectPath,
    Update,
    Validate,
    Backup,
    Write,
    Rollback,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Request => "request validation",
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::DetectPath => "tag path detection",
            Stage::Update => "update",
            Stage::Validate => "validation",
            Stage::Backup => "backup",
            Stage::Write => "write",
            Stage::Rollback => "rollback",
            Stage::Cleanup => "backup cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Yaml(#[from] YamlError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{stage} failed for {}: {source}", path.display())]
    Context {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: Box<UpdateError>,
    },
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::InvalidRequest { .. } => ErrorKind::Validation,
            UpdateError::Yaml(err) => err.kind(),
            UpdateError::Store(err) => err.kind(),
            UpdateError::Context { source, .. } => source.kind(),
        }
    }

    /// Stage of the outermost context, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            UpdateError::Context { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        UpdateError::InvalidRequest {
            message: message.into(),
        }
    }
}

trait StageContext<T> {
    fn stage(self, stage: Stage, path: &Path) -> Result<T, UpdateError>;
}

impl<T, E: Into<UpdateError>> StageContext<T> for Result<T, E> {
    fn stage(self, stage: Stage, path: &Path) -> Result<T, UpdateError> {
        self.map_err(|err| UpdateError::Context {
            stage,
            path: path.to_path_buf(),
            source: Box::new(err.into()),
        })
    }
}

/// One file update. Built with [`UpdateRequest::new`] and the chained
/// setters; defaults are backup on, validation on, no dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub file_path: PathBuf,
    pub new_value: String,
    /// Explicit target; auto-detected when `None`.
    pub tag_path: Option<TagPath>,
    pub create_backup: bool,
    pub validate_after: bool,
    pub dry_run: bool,
}

impl UpdateRequest {
    pub fn new(file_path: impl Into<PathBuf>, new_value: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            new_value: new_value.into(),
            tag_path: None,
            create_backup: true,
            validate_after: true,
            dry_run: false,
        }
    }

    pub fn tag_path(mut self, path: TagPath) -> Self {
        self.tag_path = Some(path);
        self
    }

    pub fn create_backup(mut self, enabled: bool) -> Self {
        self.create_backup = enabled;
        self
    }

    pub fn validate_after(mut self, enabled: bool) -> Self {
        self.validate_after = enabled;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// False when the updated text failed validation and was not written.
    pub success: bool,
    pub updated_text: String,
    pub backup_path: Option<PathBuf>,
    pub original_text: String,
    pub validation_error: Option<YamlError>,
    /// `updated_text != original_text`, byte for byte.
    pub changes_detected: bool,
    /// Path that was updated, explicit or detected.
    pub tag_path: TagPath,
}

/// Runs tag updates against files on disk.
pub struct Updater<F = StdFileSystem> {
    editor: TagEditor,
    store: FileStore<F>,
}

impl Default for Updater<StdFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl Updater<StdFileSystem> {
    pub fn new() -> Self {
        Self::from_config(UpdaterConfig::default())
    }

    pub fn from_config(config: UpdaterConfig) -> Self {
        Self::with_file_system(config, StdFileSystem)
    }
}

impl<F: FileSystem> Updater<F> {
    pub fn with_file_system(config: UpdaterConfig, fs: F) -> Self {
        Self {
            editor: TagEditor::with_config(config.parser.clone()),
            store: FileStore::with_file_system(config, fs),
        }
    }

    pub fn with_heuristic(mut self, heuristic: impl TagHeuristic + 'static) -> Self {
        self.editor = self.editor.with_heuristic(heuristic);
        self
    }

    pub fn editor(&self) -> &TagEditor {
        &self.editor
    }

    pub fn store(&self) -> &FileStore<F> {
        &self.store
    }

    pub fn update_tag_in_file(&self, request: &UpdateRequest) -> Result<UpdateResult, UpdateError> {
        let path = request.file_path.as_path();
        if path.as_os_str().is_empty() {
            return Err(UpdateError::invalid("file path cannot be empty"));
        }
        validate_tag_value(&request.new_value).stage(Stage::Request, path)?;
        debug!(path = %path.display(), dry_run = request.dry_run, "updating tag in file");

        let original = self.store.read_validated(path).stage(Stage::Read, path)?;
        let parsed = self
            .editor
            .parse_content(&original)
            .stage(Stage::Parse, path)?;

        let tag_path = match &request.tag_path {
            Some(tag_path) => tag_path.clone(),
            None => detect_tag_path(&parsed.locations).stage(Stage::DetectPath, path)?,
        };
        let updated = self
            .editor
            .update_tag(parsed, &tag_path, &request.new_value)
            .stage(Stage::Update, path)?;

        let validation_error = if request.validate_after {
            self.editor.validate_yaml(&updated).err()
        } else {
            None
        };

        let mut result = UpdateResult {
            success: validation_error.is_none(),
            changes_detected: updated != original,
            updated_text: updated,
            backup_path: None,
            original_text: original,
            validation_error,
            tag_path,
        };

        if let Some(err) = &result.validation_error {
            warn!(path = %path.display(), error = %err, "updated document failed validation, not writing");
            return Ok(result);
        }

        if request.dry_run {
            debug!(
                path = %path.display(),
                changes = result.changes_detected,
                "dry run, nothing written"
            );
            return Ok(result);
        }

        if request.create_backup && self.store.config().keep_backups {
            let backup = self
                .store
                .create_backup(path, &result.original_text)
                .stage(Stage::Backup, path)?;
            result.backup_path = Some(backup);
        }

        self.store
            .write_atomic(path, &result.updated_text)
            .stage(Stage::Write, path)?;

        info!(
            path = %path.display(),
            tag_path = %result.tag_path,
            changes = result.changes_detected,
            "updated tag"
        );
        Ok(result)
    }

    /// Update with path auto-detection and validation.
    pub fn update_tag_simple_in_file(
        &self,
        path: impl AsRef<Path>,
        new_value: &str,
        create_backup: bool,
    ) -> Result<UpdateResult, UpdateError> {
        let request = UpdateRequest::new(path.as_ref(), new_value).create_backup(create_backup);
        self.update_tag_in_file(&request)
    }

    /// Run `request` as a dry run without a backup. Never writes.
    pub fn preview_update(&self, request: &UpdateRequest) -> Result<UpdateResult, UpdateError> {
        let preview = request.clone().dry_run(true).create_backup(false);
        self.update_tag_in_file(&preview)
    }

    pub fn rollback_from_backup(
        &self,
        path: impl AsRef<Path>,
        backup: impl AsRef<Path>,
    ) -> Result<(), UpdateError> {
        let (path, backup) = (path.as_ref(), backup.as_ref());
        if path.as_os_str().is_empty() {
            return Err(UpdateError::invalid("file path cannot be empty"));
        }
        if backup.as_os_str().is_empty() {
            return Err(UpdateError::invalid("backup path cannot be empty"));
        }
        self.store
            .rollback(path, backup, |text| self.editor.validate_yaml(text))
            .stage(Stage::Rollback, path)
    }

    pub fn cleanup_old_backups(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, UpdateError> {
        let path = path.as_ref();
        self.store
            .cleanup_old_backups(path)
            .stage(Stage::Cleanup, path)
    }

    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<(), UpdateError> {
        let path = path.as_ref();
        let text = self.store.read_validated(path).stage(Stage::Read, path)?;
        self.editor.validate_yaml(&text).stage(Stage::Validate, path)
    }

    /// Tag fields of the file. The returned node references belong to a
    /// parse that has already been dropped; use the paths to address fields.
    pub fn get_file_tag_locations(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<TagLocation>, UpdateError> {
        let path = path.as_ref();
        let text = self.store.read_validated(path).stage(Stage::Read, path)?;
        let parsed = self.editor.parse_content(&text).stage(Stage::Parse, path)?;
        Ok(parsed.locations)
    }
}

/// First location named `tag`, then `version`, then `image`; otherwise the
/// first location found.
pub fn detect_tag_path(locations: &[TagLocation]) -> Result<TagPath, YamlError> {
    let first = locations
        .first()
        .ok_or_else(|| YamlError::validation("no tag fields found in YAML content"))?;

    let preferred = PREFERRED_FIELDS.iter().find_map(|field| {
        locations.iter().find(|location| {
            location
                .path
                .last()
                .is_some_and(|last| last.eq_ignore_ascii_case(field))
        })
    });

    Ok(preferred.unwrap_or(first).path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations(text: &str) -> Vec<TagLocation> {
        TagEditor::new().parse_content(text).unwrap().locations
    }

    #[test]
    fn detect_prefers_tag_then_version_then_image() {
        let found = detect_tag_path(&locations("image: nginx\nversion: 1.0.0\nnested:\n  tag: v1\n"))
            .unwrap();
        assert_eq!(found.to_string(), "nested.tag");

        let found = detect_tag_path(&locations("image: nginx\nappVersion: 1\nversion: 2\n")).unwrap();
        assert_eq!(found.to_string(), "version");

        let found = detect_tag_path(&locations("releaseName: prod\nimage: nginx\n")).unwrap();
        assert_eq!(found.to_string(), "image");
    }

    #[test]
    fn detect_falls_back_to_first_location() {
        let found = detect_tag_path(&locations("releaseName: prod\nappVersion: 1\n")).unwrap();
        assert_eq!(found.to_string(), "releaseName");
    }

    #[test]
    fn detect_without_locations_is_a_validation_error() {
        let err = detect_tag_path(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn request_builder_defaults() {
        let request = UpdateRequest::new("app.yaml", "v2");
        assert!(request.create_backup);
        assert!(request.validate_after);
        assert!(!request.dry_run);
        assert!(request.tag_path.is_none());

        let request = request
            .tag_path(TagPath::parse("image.tag").unwrap())
            .dry_run(true)
            .create_backup(false);
        assert!(request.dry_run);
        assert!(!request.create_backup);
        assert_eq!(request.tag_path.unwrap().to_string(), "image.tag");
    }

    #[test]
    fn context_errors_keep_the_inner_kind() {
        let err: Result<(), UpdateError> =
            Err(YamlError::validation("bad")).stage(Stage::Update, Path::new("app.yaml"));
        let err = err.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Update));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "update failed for app.yaml: bad");
    }
}
