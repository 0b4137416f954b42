// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    files::{FileStore, MemoryFileStore},
    store::DocumentStore,
    vcs::{VcsError, VersionControl, VersionControlContext},
};

use indoc::indoc;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

pub(crate) const ROOT: &str = "/repo";
pub(crate) const WORKING_DIR: &str = "/repo/notes";

pub(crate) const WORKFLOW: &str = indoc! {r#"
    {
        "when-added-public": [
            { "addTags": ["reviewed"] }
        ],
        "when-removed-draft": [
            { "name": "approve", "addTags": ["approved"] },
            { "name": "reject", "addTags": ["rejected"] }
        ]
    }
"#};

/// Version control that records commit messages.
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeVcs {
    commits: Arc<Mutex<Vec<String>>>,
    dirty: Arc<AtomicBool>,
    clean_check_error: Arc<AtomicBool>,
    commit_failure: Arc<AtomicBool>,
    timeout: Arc<AtomicBool>,
}

impl FakeVcs {
    pub(crate) fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::SeqCst);
    }

    pub(crate) fn set_clean_check_error(&self, error: bool) {
        self.clean_check_error.store(error, Ordering::SeqCst);
    }

    pub(crate) fn set_commit_failure(&self, failure: bool) {
        self.commit_failure.store(failure, Ordering::SeqCst);
    }

    pub(crate) fn set_timeout(&self, timeout: bool) {
        self.timeout.store(timeout, Ordering::SeqCst);
    }
}

impl VersionControl for FakeVcs {
    fn is_clean(&self, _root: &Path, _working_dir: &Path) -> Result<bool, VcsError> {
        if self.timeout.load(Ordering::SeqCst) {
            return Err(VcsError::Timeout {
                command: "git status --porcelain".into(),
                timeout: Duration::from_secs(1),
            });
        }
        if self.clean_check_error.load(Ordering::SeqCst) {
            return Err(VcsError::Failed {
                command: "git status --porcelain".into(),
                message: "fatal: not a git repository".into(),
            });
        }

        Ok(!self.dirty.load(Ordering::SeqCst))
    }

    fn commit(&self, _root: &Path, message: &str, _path: &Path) -> Result<(), VcsError> {
        if self.commit_failure.load(Ordering::SeqCst) {
            return Err(VcsError::Failed {
                command: "git commit".into(),
                message: "fatal: unable to auto-detect email address".into(),
            });
        }

        self.commits.lock().unwrap().push(message.into());
        Ok(())
    }

    fn status(&self, _root: &Path) -> Result<String, VcsError> {
        Ok("On branch main\nnothing to commit, working tree clean\n".into())
    }
}

/// Versioned in-memory store without any category.
pub(crate) fn empty_store(vcs: FakeVcs) -> anyhow::Result<DocumentStore<MemoryFileStore, FakeVcs>> {
    let context = VersionControlContext::versioned(ROOT, WORKING_DIR)?;
    let files = MemoryFileStore::new(ROOT);

    Ok(DocumentStore::new(context, files, vcs))
}

/// Versioned in-memory store holding a "recipes" category with templates and
/// a workflow.
pub(crate) fn fixture_store(
    vcs: FakeVcs,
) -> anyhow::Result<DocumentStore<MemoryFileStore, FakeVcs>> {
    let store = empty_store(vcs)?;
    let layout = store.layout().clone();
    let files = store.files();

    files.create_dir_all(&layout.documents_dir("recipes"))?;
    files.create_dir_all(&layout.config_dir("recipes"))?;
    files.write(&layout.metadata_template_file("recipes"), r#"{"tags":["draft"]}"#)?;
    files.write(&layout.content_template_file("recipes"), "# Title\n")?;
    files.write(&layout.workflow_file("recipes"), WORKFLOW)?;
    files.write(&layout.tags_file("recipes"), r#"["draft","public"]"#)?;
    files.write(&layout.root_config_file(), r#"{"categories":["recipes"]}"#)?;

    Ok(store)
}
