// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Category registry and configuration.
//!
//! A __category__ is a named collection of documents sharing templates, a
//! known tag list, and a workflow. Categories are registered in the root
//! configuration file of the working directory, and are bootstrapped from a
//! set of static assets when first added.

use crate::{
    config::RootConfiguration,
    files::{FileStore, OsFileStore},
    store::{validate_name, DocumentStore, Result, StoreError},
    vcs::{GitCli, VersionControl},
    workflow::WorkflowConfiguration,
};

use std::{borrow::Cow, collections::HashSet, path::PathBuf};
use tracing::{debug, info, instrument, warn};

/// Name of content template asset.
pub const CONTENT_MODEL: &str = "model.md";

/// Name of metadata template asset.
pub const METADATA_MODEL: &str = "model.json";

/// Name of workflow asset.
pub const WORKFLOW_MODEL: &str = "workflow.json";

/// Name of known tags asset.
pub const TAGS_MODEL: &str = "tags.json";

/// Source of static assets used to bootstrap categories.
pub trait AssetSource {
    fn asset(&self, name: &str) -> Option<Cow<'_, str>>;
}

/// Assets compiled into the program.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn asset(&self, name: &str) -> Option<Cow<'_, str>> {
        let data = match name {
            CONTENT_MODEL => include_str!("../assets/models/model.md"),
            METADATA_MODEL => include_str!("../assets/models/model.json"),
            WORKFLOW_MODEL => include_str!("../assets/models/workflow.json"),
            TAGS_MODEL => include_str!("../assets/models/tags.json"),
            _ => return None,
        };

        Some(Cow::Borrowed(data))
    }
}

/// Category manager built on top of a document store.
#[derive(Debug)]
pub struct CategoryManager<F = OsFileStore, V = GitCli, A = EmbeddedAssets>
where
    F: FileStore,
    V: VersionControl,
    A: AssetSource,
{
    store: DocumentStore<F, V>,
    assets: A,
}

impl<F, V, A> CategoryManager<F, V, A>
where
    F: FileStore,
    V: VersionControl,
    A: AssetSource,
{
    /// Construct new category manager.
    pub fn new(store: DocumentStore<F, V>, assets: A) -> Self {
        Self { store, assets }
    }

    /// Document store of the working directory.
    pub fn store(&self) -> &DocumentStore<F, V> {
        &self.store
    }

    /// Current root configuration.
    ///
    /// A missing or malformed root configuration reads as empty.
    pub fn configuration(&self) -> RootConfiguration {
        let path = self.store.layout().root_config_file();
        match self.store.files().read(&path) {
            Ok(data) => data.parse().unwrap_or_else(|error| {
                warn!("root configuration {:?} is malformed: {error}", path.display());
                RootConfiguration::default()
            }),
            Err(_) => RootConfiguration::default(),
        }
    }

    /// Replace root configuration.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if any category name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::Write`] if root configuration cannot be written.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self), level = "debug")]
    pub fn set_configuration(&self, configuration: &RootConfiguration) -> Result<()> {
        for category in &configuration.categories {
            validate_name(category)?;
        }
        let _lock = self.store.lock();
        self.store.ensure_clean()?;

        self.store.create_dir_all(self.store.layout().working_dir())?;
        self.write_configuration(configuration)?;
        self.store.commit("documents() - updated configuration")?;

        Ok(())
    }

    /// Registered categories in registration order.
    pub fn categories(&self) -> Vec<String> {
        self.configuration().categories
    }

    /// Register and bootstrap new category.
    ///
    /// Creates the documents and configuration directories of the category,
    /// and copies the content template, metadata template, workflow, and known
    /// tags assets into the configuration directory. Adding an already
    /// registered category succeeds without touching anything.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidName`] if category name is invalid.
    /// - Return [`StoreError::Dirty`] if working directory is not clean.
    /// - Return [`StoreError::MissingAsset`] if asset source lacks an asset.
    /// - Return [`StoreError::Write`] if any file cannot be written.
    /// - Return [`StoreError::Vcs`] if commit fails.
    #[instrument(skip(self), level = "debug")]
    pub fn add_category(&self, category: &str) -> Result<()> {
        validate_name(category)?;
        let _lock = self.store.lock();
        self.store.ensure_clean()?;

        let layout = self.store.layout();
        self.store.create_dir_all(layout.working_dir())?;

        let mut configuration = self.configuration();
        if configuration.contains(category) {
            debug!("category {category:?} already registered");
            return Ok(());
        }

        configuration.categories.push(category.into());
        self.write_configuration(&configuration)?;
        self.store.create_dir_all(&layout.documents_dir(category))?;
        self.store.create_dir_all(&layout.config_dir(category))?;

        let assets: [(&str, PathBuf); 4] = [
            (CONTENT_MODEL, layout.content_template_file(category)),
            (METADATA_MODEL, layout.metadata_template_file(category)),
            (WORKFLOW_MODEL, layout.workflow_file(category)),
            (TAGS_MODEL, layout.tags_file(category)),
        ];
        for (name, target) in assets {
            let data = self
                .assets
                .asset(name)
                .ok_or_else(|| StoreError::MissingAsset { name: name.into() })?;
            self.store.write_file(&target, &data)?;
        }

        self.store
            .commit(&format!("documents() - added category {category}"))?;
        info!("add category {category}");

        Ok(())
    }

    /// Workflow configuration of category.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Parse`] if workflow file is malformed.
    pub fn workflow(&self, category: &str) -> Result<WorkflowConfiguration> {
        self.store.workflow(category)
    }

    /// Every tag known to a category.
    ///
    /// Tags of the known tags file come first, followed by tags of each
    /// document in listing order. Each tag appears once, at its first sighting.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if category or metadata of any
    ///   document is missing.
    /// - Return [`StoreError::Parse`] if metadata of any document is malformed.
    pub fn all_tags(&self, category: &str) -> Result<Vec<String>> {
        let documents = self.store.list(category)?;

        let path = self.store.layout().tags_file(category);
        let known: Vec<String> = match self.store.read_optional(&path)? {
            Some(data) => serde_json::from_str(&data).unwrap_or_else(|error| {
                warn!("known tags {:?} are malformed: {error}", path.display());
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut register = |tag: String| {
            if seen.insert(tag.clone()) {
                result.push(tag);
            }
        };

        known.into_iter().for_each(&mut register);
        for name in documents {
            self.store
                .metadata(category, &name)?
                .tags
                .into_iter()
                .for_each(&mut register);
        }

        Ok(result)
    }

    fn write_configuration(&self, configuration: &RootConfiguration) -> Result<()> {
        let path = self.store.layout().root_config_file();
        let data = serde_json::to_string(configuration).map_err(StoreError::Serialize)?;
        self.store.write_file(&path, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::Metadata,
        testing::{empty_store, fixture_store, FakeVcs},
    };
    use pretty_assertions::assert_eq;
    use std::path::Path;

    struct NoAssets;

    impl AssetSource for NoAssets {
        fn asset(&self, _name: &str) -> Option<Cow<'_, str>> {
            None
        }
    }

    #[test]
    fn add_category_bootstraps_directories_and_assets() -> anyhow::Result<()> {
        let vcs = FakeVcs::default();
        let manager = CategoryManager::new(empty_store(vcs.clone())?, EmbeddedAssets);

        manager.add_category("journal")?;

        let layout = manager.store().layout();
        let files = manager.store().files();
        assert_eq!(manager.categories(), vec!["journal"]);
        assert!(files.exists(&layout.documents_dir("journal")));
        for name in [CONTENT_MODEL, METADATA_MODEL, WORKFLOW_MODEL, TAGS_MODEL] {
            let path = layout.config_dir("journal").join(name);
            assert_eq!(
                files.read(&path)?,
                EmbeddedAssets.asset(name).unwrap_or_default()
            );
        }
        assert_eq!(vcs.commits(), vec!["documents() - added category journal"]);

        // The embedded workflow must always parse.
        assert!(!manager.workflow("journal")?.rules.is_empty());

        Ok(())
    }

    #[test]
    fn add_category_is_idempotent() -> anyhow::Result<()> {
        let vcs = FakeVcs::default();
        let manager = CategoryManager::new(empty_store(vcs.clone())?, EmbeddedAssets);

        manager.add_category("journal")?;
        manager.add_category("recipes")?;
        manager.add_category("journal")?;

        assert_eq!(manager.categories(), vec!["journal", "recipes"]);
        assert_eq!(vcs.commits().len(), 2);

        Ok(())
    }

    #[test]
    fn add_category_rejects_invalid_name() -> anyhow::Result<()> {
        let manager = CategoryManager::new(empty_store(FakeVcs::default())?, EmbeddedAssets);
        let mutations = manager.store().files().mutations();

        let error = manager.add_category("../outside").unwrap_err();

        assert!(matches!(error, StoreError::InvalidName { .. }));
        assert_eq!(manager.store().files().mutations(), mutations);

        Ok(())
    }

    #[test]
    fn add_category_on_dirty_tree_fails() -> anyhow::Result<()> {
        let vcs = FakeVcs::default();
        vcs.set_dirty(true);
        let manager = CategoryManager::new(empty_store(vcs)?, EmbeddedAssets);

        let error = manager.add_category("journal").unwrap_err();

        assert!(matches!(error, StoreError::Dirty { .. }));
        assert!(manager.categories().is_empty());

        Ok(())
    }

    #[test]
    fn add_category_without_assets_fails() -> anyhow::Result<()> {
        let manager = CategoryManager::new(empty_store(FakeVcs::default())?, NoAssets);
        let error = manager.add_category("journal").unwrap_err();

        assert!(matches!(error, StoreError::MissingAsset { .. }));

        Ok(())
    }

    #[test]
    fn documents_of_new_category_use_templates() -> anyhow::Result<()> {
        let manager = CategoryManager::new(empty_store(FakeVcs::default())?, EmbeddedAssets);
        manager.add_category("journal")?;

        manager.store().add("journal", "monday")?;

        assert_eq!(
            manager.store().metadata("journal", "monday")?,
            Metadata::with_tags(["draft"])
        );

        // Leaving draft fires the default "publish" element of the embedded workflow.
        let result = manager
            .store()
            .set_metadata("journal", "monday", Metadata::default(), None)?;
        assert_eq!(result.tags, vec!["published"]);

        Ok(())
    }

    #[test]
    fn all_tags_keeps_first_seen_order() -> anyhow::Result<()> {
        let manager = CategoryManager::new(fixture_store(FakeVcs::default())?, EmbeddedAssets);
        let store = manager.store();
        store.add("recipes", "pancakes")?;
        store.add("recipes", "waffles")?;
        store.set_metadata(
            "recipes",
            "pancakes",
            Metadata::with_tags(["draft", "sweet", "public", "sweet"]),
            None,
        )?;
        store.set_metadata(
            "recipes",
            "waffles",
            Metadata::with_tags(["draft", "crispy"]),
            None,
        )?;

        let result = manager.all_tags("recipes")?;
        let expect = vec!["draft", "public", "sweet", "reviewed", "crispy"];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn configuration_survives_missing_file() -> anyhow::Result<()> {
        let manager = CategoryManager::new(empty_store(FakeVcs::default())?, EmbeddedAssets);
        assert!(manager.categories().is_empty());

        let configuration = RootConfiguration {
            categories: vec!["a".into(), "b".into()],
        };
        manager.set_configuration(&configuration)?;

        assert_eq!(manager.configuration(), configuration);
        assert!(manager
            .store()
            .files()
            .exists(Path::new("/repo/notes/git-docs.json")));

        Ok(())
    }
}
