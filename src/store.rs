// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document store management and manipulation.
//!
//! A __document__ is a directory holding a markdown content file and a JSON
//! metadata file. Documents are grouped into categories, and are identified by
//! the name of their directory within the documents directory of their
//! category. See [`crate::path`] for the full layout.
//!
//! # Guarded Mutations
//!
//! Every mutating operation of the store runs through the same steps:
//!
//! 1. Validate names, so that no name can escape its category.
//! 2. Take the store lock, so that at most one mutation is in flight for this
//!    process.
//! 3. Make sure the working directory is clean when versioned.
//! 4. Apply the change to the file system.
//! 5. Stage and commit the working directory when versioned.
//!
//! Failure to commit after a successful write is reported, but the write is
//! never rolled back. The next mutation will then refuse to run until the
//! working directory is made clean again.

use crate::{
    files::{FileStore, OsFileStore},
    metadata::Metadata,
    path::Layout,
    query,
    vcs::{GitCli, VcsError, VersionControl, VersionControlContext},
    workflow::WorkflowConfiguration,
};

use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info, instrument, warn};

/// Result of a content update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// New content was written and committed.
    Applied,

    /// New content matched stored content, so nothing was touched.
    Unchanged,
}

/// Store of documents over a working directory.
#[derive(Debug)]
pub struct DocumentStore<F = OsFileStore, V = GitCli>
where
    F: FileStore,
    V: VersionControl,
{
    layout: Layout,
    context: VersionControlContext,
    files: F,
    vcs: V,
    lock: Mutex<()>,
}

impl DocumentStore {
    /// Open store over the real file system, calling Git for versioning.
    pub fn open(context: VersionControlContext, git: GitCli) -> Self {
        Self::new(context, OsFileStore, git)
    }
}

impl<F, V> DocumentStore<F, V>
where
    F: FileStore,
    V: VersionControl,
{
    /// Construct new document store.
    pub fn new(context: VersionControlContext, files: F, vcs: V) -> Self {
        Self {
            layout: Layout::new(context.working_dir()),
            context,
            files,
            vcs,
            lock: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn context(&self) -> &VersionControlContext {
        &self.context
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// List names of all documents in category.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if category has no documents
    ///   directory.
    /// - Return [`StoreError::Read`] if documents directory cannot be read.
    pub fn list(&self, category: &str) -> Result<Vec<String>> {
        let path = self.layout.documents_dir(category);
        self.files
            .list_dirs(&path)
            .map_err(|source| read_error(source, path))
    }

    /// List names of documents in category whose tags satisfy a query.
    ///
    /// See [`crate::query`] for the query syntax. The query is lowercased
    /// first, so uppercase exact matching only applies to workflow conditions.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if category or metadata of any listed
    ///   document is missing.
    /// - Return [`StoreError::Parse`] if metadata of any listed document is
    ///   malformed.
    pub fn search(&self, category: &str, query: &str) -> Result<Vec<String>> {
        let query = query.to_lowercase();
        let mut result = Vec::new();
        for name in self.list(category)? {
            let metadata = self.metadata(category, &name)?;
            if query::matches(&query, &metadata.tags) {
                result.push(name);
            }
        }

        Ok(result)
    }

    pub fn metadata(&self, category: &str, name: &str) -> Result<Metadata> {
        let path = self.layout.metadata_file(category, name);
        let data = self
            .files
            .read(&path)
            .map_err(|source| read_error(source, path.clone()))?;

        data.parse()
            .map_err(|source| StoreError::Parse { source, path })
    }

    pub fn content(&self, category: &str, name: &str) -> Result<String> {
        let path = self.layout.content_file(category, name);
        self.files
            .read(&path)
            .map_err(|source| read_error(source, path))
    }

    /// Workflow configuration of category.
    ///
    /// A category without workflow file has an empty workflow.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Parse`] if workflow file is malformed.
    pub fn workflow(&self, category: &str) -> Result<WorkflowConfiguration> {
        let path = self.layout.workflow_file(category);
        match self.read_optional(&path)? {
            Some(data) => data
                .parse()
                .map_err(|source| StoreError::Parse { source, path }),
            None => Ok(WorkflowConfiguration::default()),
        }
    }

    /// Replace content of document.
    ///
    /// Nothing is written or committed when the new content equals the stored
    /// content. A document without content file counts as differing.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if category or name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::NotFound`] if document does not exist.
    /// - Return [`StoreError::Write`] if content cannot be written.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self, content), level = "debug")]
    pub fn set_content(&self, category: &str, name: &str, content: &str) -> Result<Change> {
        validate_name(category)?;
        validate_name(name)?;
        let _lock = self.lock();
        self.ensure_clean()?;
        self.require_document(category, name)?;

        let path = self.layout.content_file(category, name);
        if self.read_optional(&path)?.as_deref() == Some(content) {
            debug!("content of {name:?} unchanged");
            return Ok(Change::Unchanged);
        }

        self.write_file(&path, content)?;
        self.commit(&format!("documents() - updated document content {name}"))?;
        info!("update content of {category}/{name}");

        Ok(Change::Applied)
    }

    /// Replace metadata of document, firing workflow triggers on the way.
    ///
    /// Tags added or removed relative to the stored metadata select which
    /// workflow rules of the category fire. The optional action name picks the
    /// element of each rule to fire. The metadata actually written is
    /// returned.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if category or name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::NotFound`] if document does not exist.
    /// - Return [`StoreError::Parse`] if workflow of category is malformed.
    /// - Return [`StoreError::Write`] if metadata cannot be written.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self, metadata), level = "debug")]
    pub fn set_metadata(
        &self,
        category: &str,
        name: &str,
        metadata: Metadata,
        action: Option<&str>,
    ) -> Result<Metadata> {
        validate_name(category)?;
        validate_name(name)?;
        let _lock = self.lock();
        self.ensure_clean()?;
        self.require_document(category, name)?;

        let path = self.layout.metadata_file(category, name);
        let current = match self.files.read(&path) {
            Ok(data) => data.parse().unwrap_or_else(|error| {
                warn!("stored metadata of {name:?} is malformed, treat as empty: {error}");
                Metadata::default()
            }),
            Err(_) => Metadata::default(),
        };

        let workflow = self.workflow(category)?;
        let mut metadata = metadata;
        let fired = workflow.apply(&current, &mut metadata, action);
        debug!("{fired} workflow element(s) fired for {name:?}");

        let data = serde_json::to_string(&metadata).map_err(StoreError::Serialize)?;
        self.write_file(&path, &data)?;
        self.commit(&format!("documents() - updated document metadata {name}"))?;
        info!("update metadata of {category}/{name}");

        Ok(metadata)
    }

    /// Add new document to category.
    ///
    /// Metadata and content are seeded from the templates of the category.
    /// Missing templates are skipped.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if category or name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::AlreadyExists`] if document already exists.
    /// - Return [`StoreError::NotFound`] if category has no documents
    ///   directory.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self), level = "debug")]
    pub fn add(&self, category: &str, name: &str) -> Result<()> {
        validate_name(category)?;
        validate_name(name)?;
        let _lock = self.lock();
        self.ensure_clean()?;

        let dir = self.layout.document_dir(category, name);
        if self.files.exists(&dir) {
            return Err(StoreError::AlreadyExists { path: dir });
        }
        let documents = self.layout.documents_dir(category);
        if !self.files.exists(&documents) {
            return Err(StoreError::NotFound { path: documents });
        }

        self.files
            .create_dir(&dir)
            .map_err(|source| StoreError::Write {
                source,
                path: dir.clone(),
            })?;

        let templates = [
            (
                self.layout.metadata_template_file(category),
                self.layout.metadata_file(category, name),
            ),
            (
                self.layout.content_template_file(category),
                self.layout.content_file(category, name),
            ),
        ];
        for (template, target) in templates {
            match self.read_optional(&template)? {
                Some(data) => self.write_file(&target, &data)?,
                None => debug!("no template at {:?}", template.display()),
            }
        }

        self.commit(&format!("documents() - added document {name}"))?;
        info!("add document {category}/{name}");

        Ok(())
    }

    /// Rename document within its category.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if any name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::NotFound`] if document does not exist.
    /// - Return [`StoreError::AlreadyExists`] if new name is taken.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self), level = "debug")]
    pub fn rename(&self, category: &str, name: &str, new_name: &str) -> Result<()> {
        validate_name(category)?;
        validate_name(name)?;
        validate_name(new_name)?;
        let _lock = self.lock();
        self.ensure_clean()?;

        let from = self.require_document(category, name)?;
        let to = self.layout.document_dir(category, new_name);
        if self.files.exists(&to) {
            return Err(StoreError::AlreadyExists { path: to });
        }

        self.files
            .rename(&from, &to)
            .map_err(|source| StoreError::Write { source, path: to })?;
        self.commit(&format!(
            "documents() - renamed document {name} to {new_name}"
        ))?;
        info!("rename document {category}/{name} to {category}/{new_name}");

        Ok(())
    }

    /// Delete document along with all of its files.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if category or name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::NotFound`] if document does not exist.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self), level = "debug")]
    pub fn delete(&self, category: &str, name: &str) -> Result<()> {
        validate_name(category)?;
        validate_name(name)?;
        let _lock = self.lock();
        self.ensure_clean()?;

        let dir = self.require_document(category, name)?;
        self.files
            .remove_dir_all(&dir)
            .map_err(|source| StoreError::Write { source, path: dir })?;
        self.commit(&format!("documents() - deleted document {name}"))?;
        info!("delete document {category}/{name}");

        Ok(())
    }

    /// Check if working directory is clean.
    ///
    /// Unversioned working directories are always clean. Failing to query
    /// version control counts as dirty, except for timeouts.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Vcs`] if version control timed out.
    pub fn is_clean(&self) -> Result<bool> {
        let VersionControlContext::Versioned { root, working_dir } = &self.context else {
            return Ok(true);
        };

        match self.vcs.is_clean(root, working_dir) {
            Ok(clean) => Ok(clean),
            Err(error @ VcsError::Timeout { .. }) => Err(error.into()),
            Err(error) => {
                warn!("cannot query version control, treat as dirty: {error}");
                Ok(false)
            }
        }
    }

    /// Version control status text.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Vcs`] if status cannot be queried.
    pub fn status(&self) -> Result<String> {
        match self.context.root() {
            Some(root) => Ok(self.vcs.status(root)?),
            None => Ok("git repository not set".into()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ensure_clean(&self) -> Result<()> {
        if !self.is_clean()? {
            warn!("{:?} is dirty", self.context.working_dir().display());
            return Err(StoreError::Dirty {
                working_dir: self.context.working_dir().to_path_buf(),
            });
        }

        Ok(())
    }

    pub(crate) fn commit(&self, message: &str) -> Result<()> {
        if let VersionControlContext::Versioned { root, working_dir } = &self.context {
            self.vcs.commit(root, message, working_dir)?;
        }

        Ok(())
    }

    /// Read file, treating a missing file as `None`.
    pub(crate) fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        match self.files.read(path) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                source,
                path: path.to_path_buf(),
            }),
        }
    }

    pub(crate) fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .write(path, contents)
            .map_err(|source| StoreError::Write {
                source,
                path: path.to_path_buf(),
            })
    }

    pub(crate) fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.files
            .create_dir_all(path)
            .map_err(|source| StoreError::Write {
                source,
                path: path.to_path_buf(),
            })
    }

    fn require_document(&self, category: &str, name: &str) -> Result<PathBuf> {
        let dir = self.layout.document_dir(category, name);
        if !self.files.exists(&dir) {
            return Err(StoreError::NotFound { path: dir });
        }

        Ok(dir)
    }
}

/// Check that a category or document name stays a single path component.
///
/// # Errors
///
/// - Return [`StoreError::InvalidName`] if name is empty, is a relative
///   component, or contains a path separator.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName { name: name.into() });
    }

    Ok(())
}

fn read_error(source: io::Error, path: PathBuf) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound { path }
    } else {
        StoreError::Read { source, path }
    }
}

/// Outcome of an operation as handed to API layers.
///
/// Carries the value on success, or a short message on failure. Expected
/// failures never cross this boundary any other way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub success: bool,
    pub message: Option<String>,
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self {
                value: Some(value),
                success: true,
                message: None,
            },
            Err(error) => Self {
                value: None,
                success: false,
                message: Some(error.to_string()),
            },
        }
    }
}

/// Broad classification of store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PreconditionFailed,
    NotFound,
    Io,
    Parse,
    Subprocess,
    Timeout,
}

/// All possible error types for document store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name would escape its directory.
    #[error("invalid name {name:?}")]
    InvalidName { name: String },

    /// Working directory has pending changes.
    #[error("working directory {:?} is dirty", working_dir.display())]
    Dirty { working_dir: PathBuf },

    #[error("{:?} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("{:?} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// File content is not valid JSON for its layout.
    #[error("failed to parse {:?}", path.display())]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("failed to serialize json")]
    Serialize(#[source] serde_json::Error),

    /// Static asset is missing from asset source.
    #[error("missing asset {name:?}")]
    MissingAsset { name: String },

    /// Version control operations fail.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } => ErrorKind::Validation,
            Self::Dirty { .. } | Self::AlreadyExists { .. } => ErrorKind::PreconditionFailed,
            Self::NotFound { .. } | Self::MissingAsset { .. } => ErrorKind::NotFound,
            Self::Read { .. } | Self::Write { .. } => ErrorKind::Io,
            Self::Parse { .. } | Self::Serialize(_) => ErrorKind::Parse,
            Self::Vcs(VcsError::Timeout { .. }) => ErrorKind::Timeout,
            Self::Vcs(_) => ErrorKind::Subprocess,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
