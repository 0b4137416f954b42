// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where every file of a document repository lives on disk. All
//! joins here are pure, i.e., nothing checks if the path returned actually
//! exists.
//!
//! # Repository Layout
//!
//! ```text
//! <working_dir>/
//! ├── git-docs.json
//! └── <category>/
//!     ├── conf/
//!     │   ├── model.json
//!     │   ├── model.md
//!     │   ├── tags.json
//!     │   └── workflow.json
//!     └── docs/
//!         └── <name>/
//!             ├── content.md
//!             └── metadata.json
//! ```

use std::path::{Path, PathBuf};

const ROOT_CONFIG_FILE: &str = "git-docs.json";
const CONFIG_DIR: &str = "conf";
const DOCUMENTS_DIR: &str = "docs";
const WORKFLOW_FILE: &str = "workflow.json";
const CONTENT_TEMPLATE_FILE: &str = "model.md";
const METADATA_TEMPLATE_FILE: &str = "model.json";
const TAGS_FILE: &str = "tags.json";
const METADATA_FILE: &str = "metadata.json";
const CONTENT_FILE: &str = "content.md";

/// Path layout of a document repository rooted at a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    working_dir: PathBuf,
}

impl Layout {
    /// Construct new layout over target working directory.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_path()
    }

    /// Root configuration file listing all registered categories.
    pub fn root_config_file(&self) -> PathBuf {
        self.working_dir.join(ROOT_CONFIG_FILE)
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.working_dir.join(category)
    }

    /// Configuration directory holding templates and workflow of a category.
    pub fn config_dir(&self, category: &str) -> PathBuf {
        self.category_dir(category).join(CONFIG_DIR)
    }

    pub fn workflow_file(&self, category: &str) -> PathBuf {
        self.config_dir(category).join(WORKFLOW_FILE)
    }

    pub fn content_template_file(&self, category: &str) -> PathBuf {
        self.config_dir(category).join(CONTENT_TEMPLATE_FILE)
    }

    pub fn metadata_template_file(&self, category: &str) -> PathBuf {
        self.config_dir(category).join(METADATA_TEMPLATE_FILE)
    }

    /// Known tags of a category, listed regardless of document usage.
    pub fn tags_file(&self, category: &str) -> PathBuf {
        self.config_dir(category).join(TAGS_FILE)
    }

    pub fn documents_dir(&self, category: &str) -> PathBuf {
        self.category_dir(category).join(DOCUMENTS_DIR)
    }

    pub fn document_dir(&self, category: &str, name: &str) -> PathBuf {
        self.documents_dir(category).join(name)
    }

    pub fn metadata_file(&self, category: &str, name: &str) -> PathBuf {
        self.document_dir(category, name).join(METADATA_FILE)
    }

    pub fn content_file(&self, category: &str, name: &str) -> PathBuf {
        self.document_dir(category, name).join(CONTENT_FILE)
    }
}

/// Determine default absolute path to settings file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/git-docs/settings.toml` as
/// the default location. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("git-docs").join("settings.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn layout_resolves_document_files() {
        let layout = Layout::new("/srv/notes");

        assert_eq!(
            layout.metadata_file("recipes", "pancakes"),
            PathBuf::from("/srv/notes/recipes/docs/pancakes/metadata.json")
        );
        assert_eq!(
            layout.content_file("recipes", "pancakes"),
            PathBuf::from("/srv/notes/recipes/docs/pancakes/content.md")
        );
        assert_eq!(
            layout.documents_dir("recipes"),
            PathBuf::from("/srv/notes/recipes/docs")
        );
    }

    #[test]
    fn layout_resolves_category_configuration() {
        let layout = Layout::new("/srv/notes");

        assert_eq!(layout.root_config_file(), PathBuf::from("/srv/notes/git-docs.json"));
        assert_eq!(
            layout.workflow_file("recipes"),
            PathBuf::from("/srv/notes/recipes/conf/workflow.json")
        );
        assert_eq!(
            layout.content_template_file("recipes"),
            PathBuf::from("/srv/notes/recipes/conf/model.md")
        );
        assert_eq!(
            layout.metadata_template_file("recipes"),
            PathBuf::from("/srv/notes/recipes/conf/model.json")
        );
        assert_eq!(
            layout.tags_file("recipes"),
            PathBuf::from("/srv/notes/recipes/conf/tags.json")
        );
    }
}
