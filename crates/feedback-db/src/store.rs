use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    config::{StoreConfig, WriteMode},
    document::{normalize_text, Comment, Document},
    error::{StoreError, StoreResult, ValidationError},
};

/// File-backed store for the single feedback document.
///
/// Every mutation is a full load-modify-save cycle against the backing file;
/// nothing is cached between calls. In [`WriteMode::Serialized`] the cycles
/// of all clones of a store run one at a time. In
/// [`WriteMode::Unsynchronized`] overlapping cycles race and the later save
/// overwrites the earlier one.
#[derive(Clone)]
pub struct DocumentStore {
    path: PathBuf,
    write_lock: Option<Arc<Mutex<()>>>,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        let write_lock = match mode {
            WriteMode::Serialized => Some(Arc::new(Mutex::new(()))),
            WriteMode::Unsynchronized => None,
        };
        Self {
            path: path.into(),
            write_lock,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.path.clone(), config.write_mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.write_lock.is_some() {
            WriteMode::Serialized
        } else {
            WriteMode::Unsynchronized
        }
    }

    /// Writes the default document if the backing file does not exist yet.
    ///
    /// The default is linked into place only if no document exists by then,
    /// so a document written concurrently is never replaced.
    pub fn ensure_exists(&self) -> StoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        let staged = self.stage(&Document::default())?;
        match staged.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(path = %self.path.display(), "created feedback document");
                Ok(())
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(StoreError::Write(err.error.to_string())),
        }
    }

    pub fn load(&self) -> StoreResult<Document> {
        self.ensure_exists().map_err(|err| match err {
            StoreError::Write(reason) => StoreError::Read(reason),
            other => other,
        })?;
        let raw = fs::read_to_string(&self.path).map_err(|err| StoreError::Read(err.to_string()))?;
        serde_json::from_str(&raw).map_err(|err| StoreError::Read(err.to_string()))
    }

    /// Reads the document without creating the backing file.
    pub fn load_existing(&self) -> StoreResult<Option<Document>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| StoreError::Read(err.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Read(err.to_string())),
        }
    }

    /// Replaces the backing file in full. Readers see either the previous
    /// or the new document, never a partial write.
    pub fn save(&self, document: &Document) -> StoreResult<()> {
        self.stage(document)?
            .persist(&self.path)
            .map(|_| ())
            .map_err(|err| StoreError::Write(err.error.to_string()))
    }

    /// Writes `document` to a temporary file next to the backing file.
    fn stage(&self, document: &Document) -> StoreResult<NamedTempFile> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|err| StoreError::Write(err.to_string()))?;
                parent
            }
            None => Path::new("."),
        };
        let serialized = serde_json::to_string_pretty(document)
            .map_err(|err| StoreError::Write(err.to_string()))?;
        let mut staged =
            NamedTempFile::new_in(dir).map_err(|err| StoreError::Write(err.to_string()))?;
        staged
            .write_all(serialized.as_bytes())
            .map_err(|err| StoreError::Write(err.to_string()))?;
        Ok(staged)
    }

    pub fn increment_likes(&self) -> StoreResult<u64> {
        self.mutate(|document| Ok(document.like()))
    }

    pub fn increment_dislikes(&self) -> StoreResult<u64> {
        self.mutate(|document| Ok(document.dislike()))
    }

    pub fn add_comment(&self, text: &str) -> StoreResult<Comment> {
        let text = normalize_text(text).ok_or(ValidationError::Empty)?;
        self.mutate(|document| Ok(document.push_comment(text).clone()))
    }

    pub fn delete_comment(&self, index: usize) -> StoreResult<Comment> {
        self.mutate(|document| Ok(document.remove_comment(index)?))
    }

    pub fn edit_comment(&self, index: usize, new_text: &str) -> StoreResult<Comment> {
        let text = normalize_text(new_text).ok_or(ValidationError::EmptyNewText)?;
        self.mutate(|document| Ok(document.edit_comment(index, text)?.clone()))
    }

    /// Runs one load-modify-save cycle. The document is saved only when
    /// `apply` succeeds.
    fn mutate<T>(&self, apply: impl FnOnce(&mut Document) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.write_lock.as_ref().map(|lock| lock.lock());
        let mut document = self.load()?;
        let result = apply(&mut document)?;
        self.save(&document)?;
        debug!(
            likes = document.likes,
            dislikes = document.dislikes,
            comments = document.comments.len(),
            "saved feedback document"
        );
        Ok(result)
    }
}
