// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RepoFixture;

use anyhow::Result;
use git_docs::{
    CategoryManager, Change, DocumentStore, EmbeddedAssets, ErrorKind, GitCli, Metadata,
    VersionControlContext,
};
use pretty_assertions::assert_eq;

#[test]
fn document_lifecycle_is_committed() -> Result<()> {
    let fixture = RepoFixture::new()?;
    fixture.stage_and_commit("README.md", "# Notes\n")?;
    let manager = fixture.manager("notes")?;
    assert_eq!(manager.store().context().root(), Some(fixture.root()));

    manager.add_category("journal")?;
    let store = manager.store();
    store.add("journal", "monday")?;

    let content = store.content("journal", "monday")?;
    assert_eq!(store.set_content("journal", "monday", &content)?, Change::Unchanged);
    assert_eq!(store.set_content("journal", "monday", "# Monday\n")?, Change::Applied);

    let metadata = Metadata::with_tags(["todo"]);
    let result = store.set_metadata("journal", "monday", metadata, None)?;
    assert_eq!(result.tags, vec!["todo", "published"]);
    assert_eq!(store.search("journal", "&todo published")?, vec!["monday"]);

    store.rename("journal", "monday", "tuesday")?;
    assert_eq!(store.content("journal", "tuesday")?, "# Monday\n");
    store.delete("journal", "tuesday")?;
    assert!(store.list("journal")?.is_empty());
    assert!(store.is_clean()?);

    let expect = vec![
        "documents() - deleted document tuesday",
        "documents() - renamed document monday to tuesday",
        "documents() - updated document metadata monday",
        "documents() - updated document content monday",
        "documents() - added document monday",
        "documents() - added category journal",
        "chore: add \"README.md\"",
    ];
    assert_eq!(fixture.history()?, expect);

    Ok(())
}

#[test]
fn stray_file_in_working_dir_blocks_mutations() -> Result<()> {
    let fixture = RepoFixture::new()?;
    let manager = fixture.manager("notes")?;
    manager.add_category("journal")?;

    // Files outside of working directory do not matter.
    std::fs::write(fixture.root().join("outside.txt"), "ignored")?;
    manager.store().add("journal", "monday")?;

    std::fs::write(fixture.root().join("notes").join("stray.txt"), "oops")?;
    let error = manager.store().add("journal", "tuesday").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::PreconditionFailed);
    assert!(!fixture.root().join("notes/journal/docs/tuesday").exists());
    assert_eq!(manager.store().list("journal")?, vec!["monday"]);

    Ok(())
}

#[test]
fn unversioned_working_dir_skips_git() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let working_dir = dir.path().canonicalize()?.join("notes");
    let context = VersionControlContext::detect(&working_dir)?;
    assert_eq!(context.root(), None);

    let manager = CategoryManager::new(
        DocumentStore::open(context, GitCli::new("git-that-does-not-exist")),
        EmbeddedAssets,
    );
    manager.add_category("journal")?;
    manager.store().add("journal", "monday")?;

    assert_eq!(manager.categories(), vec!["journal"]);
    assert_eq!(manager.all_tags("journal")?, vec!["draft", "todo", "done", "published"]);
    assert_eq!(manager.store().status()?, "git repository not set");

    Ok(())
}

#[test]
fn explicit_repository_root_is_used_for_commits() -> Result<()> {
    let fixture = RepoFixture::new()?;
    let working_dir = fixture.root().join("notes");
    let context = VersionControlContext::versioned(fixture.root(), &working_dir)?;

    let manager = CategoryManager::new(
        DocumentStore::open(context, GitCli::default()),
        EmbeddedAssets,
    );
    manager.add_category("journal")?;

    assert_eq!(fixture.history()?, vec!["documents() - added category journal"]);

    Ok(())
}
