// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document repository backed by the file system and Git.
//!
//! Documents live in categories under a __working directory__. Each document
//! is a directory holding markdown content and JSON metadata carrying a list
//! of tags. Tags can be searched through a small boolean query language, and
//! changing them fires the workflow rules of the category.
//!
//! When the working directory sits inside a Git repository, every mutation is
//! guarded by a clean tree check and committed right after it is applied.

pub mod category;
pub mod config;
pub mod files;
pub mod metadata;
pub mod path;
pub mod query;
pub mod store;
pub mod vcs;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use category::{AssetSource, CategoryManager, EmbeddedAssets};
pub use config::{load_settings, RootConfiguration, Settings};
pub use metadata::Metadata;
pub use store::{Change, DocumentStore, ErrorKind, Outcome, StoreError};
pub use vcs::{GitCli, VersionControl, VersionControlContext};
pub use workflow::WorkflowConfiguration;
