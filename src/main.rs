// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use git_docs::{
    load_settings, path::default_settings_path, CategoryManager, Change, DocumentStore,
    EmbeddedAssets, GitCli, Metadata, Settings, VersionControlContext,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "git-docs [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to settings file.
    #[arg(short, long, value_name = "path")]
    pub settings: Option<PathBuf>,

    /// Working directory holding the categories.
    #[arg(short, long, value_name = "path")]
    pub working_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = self.load_settings()?;
        let manager = open_manager(&settings, self.working_dir)?;

        match self.command {
            Command::Categories => run_categories(&manager),
            Command::AddCategory(opts) => run_add_category(&manager, opts),
            Command::Tags(opts) => run_tags(&manager, opts),
            Command::Workflow(opts) => run_workflow(&manager, opts),
            Command::List(opts) => run_list(&manager, opts),
            Command::Search(opts) => run_search(&manager, opts),
            Command::Show(opts) => run_show(&manager, opts),
            Command::Add(opts) => run_add(&manager, opts),
            Command::Rename(opts) => run_rename(&manager, opts),
            Command::Delete(opts) => run_delete(&manager, opts),
            Command::SetContent(opts) => run_set_content(&manager, opts),
            Command::SetMetadata(opts) => run_set_metadata(&manager, opts),
            Command::Status => run_status(&manager),
        }
    }

    fn load_settings(&self) -> Result<Settings> {
        let path = match &self.settings {
            Some(path) => path.clone(),
            None => default_settings_path()?,
        };

        load_settings(&path).with_context(|| format!("cannot load settings {:?}", path.display()))
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List registered categories.
    #[command(override_usage = "git-docs categories")]
    Categories,

    /// Register new category with default templates and workflow.
    #[command(override_usage = "git-docs add-category <category>")]
    AddCategory(CategoryOptions),

    /// List every tag known to category.
    #[command(override_usage = "git-docs tags <category>")]
    Tags(CategoryOptions),

    /// Show workflow configuration of category.
    #[command(override_usage = "git-docs workflow <category>")]
    Workflow(CategoryOptions),

    /// List documents of category.
    #[command(override_usage = "git-docs list <category>")]
    List(CategoryOptions),

    /// List documents of category whose tags match a query.
    #[command(override_usage = "git-docs search <category> [<query>]")]
    Search(SearchOptions),

    /// Show metadata and content of document.
    #[command(override_usage = "git-docs show [options] <category> <name>")]
    Show(ShowOptions),

    /// Add new document seeded from category templates.
    #[command(override_usage = "git-docs add <category> <name>")]
    Add(DocumentOptions),

    /// Rename document within its category.
    #[command(override_usage = "git-docs rename <category> <name> <new_name>")]
    Rename(RenameOptions),

    /// Delete document.
    #[command(override_usage = "git-docs delete <category> <name>")]
    Delete(DocumentOptions),

    /// Replace content of document with contents of a file.
    #[command(override_usage = "git-docs set-content <category> <name> <file>")]
    SetContent(SetContentOptions),

    /// Replace metadata of document with a JSON file, firing workflow rules.
    #[command(override_usage = "git-docs set-metadata [options] <category> <name> <file>")]
    SetMetadata(SetMetadataOptions),

    /// Show status of enclosing Git repository.
    #[command(override_usage = "git-docs status")]
    Status,
}

#[derive(Args, Clone, Debug)]
struct CategoryOptions {
    /// Name of category.
    #[arg(value_name = "category")]
    pub category: String,
}

#[derive(Args, Clone, Debug)]
struct DocumentOptions {
    /// Name of category holding document.
    #[arg(value_name = "category")]
    pub category: String,

    /// Name of document.
    #[arg(value_name = "name")]
    pub name: String,
}

#[derive(Args, Clone, Debug)]
struct SearchOptions {
    /// Name of category to search.
    #[arg(value_name = "category")]
    pub category: String,

    /// Tag query, e.g., "&draft !published". Empty matches everything.
    #[arg(default_value = "", value_name = "query")]
    pub query: String,
}

#[derive(Args, Clone, Debug)]
struct ShowOptions {
    #[command(flatten)]
    pub document: DocumentOptions,

    /// Show only metadata.
    #[arg(short, long, group = "part")]
    pub metadata: bool,

    /// Show only content.
    #[arg(short, long, group = "part")]
    pub content: bool,
}

#[derive(Args, Clone, Debug)]
struct RenameOptions {
    #[command(flatten)]
    pub document: DocumentOptions,

    /// New name of document.
    #[arg(value_name = "new_name")]
    pub new_name: String,
}

#[derive(Args, Clone, Debug)]
struct SetContentOptions {
    #[command(flatten)]
    pub document: DocumentOptions,

    /// File holding new markdown content.
    #[arg(value_name = "file")]
    pub file: PathBuf,
}

#[derive(Args, Clone, Debug)]
struct SetMetadataOptions {
    #[command(flatten)]
    pub document: DocumentOptions,

    /// File holding new JSON metadata.
    #[arg(value_name = "file")]
    pub file: PathBuf,

    /// Name of workflow element to fire instead of the first one.
    #[arg(short, long, value_name = "action")]
    pub action: Option<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn open_manager(settings: &Settings, working_dir: Option<PathBuf>) -> Result<CategoryManager> {
    let working_dir = absolute(working_dir.unwrap_or_else(|| settings.working_dir.clone()))?;

    let mut git = GitCli::new(&settings.git);
    if let Some(timeout) = settings.timeout() {
        git = git.with_timeout(timeout);
    }

    let context = match &settings.repository {
        Some(repository) => {
            VersionControlContext::versioned(absolute(repository.clone())?, working_dir)?
        }
        None => VersionControlContext::detect(&working_dir)?,
    };

    Ok(CategoryManager::new(
        DocumentStore::open(context, git),
        EmbeddedAssets,
    ))
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }

    Ok(std::env::current_dir()?.join(path))
}

fn run_categories(manager: &CategoryManager) -> Result<()> {
    for category in manager.categories() {
        println!("{category}");
    }

    Ok(())
}

fn run_add_category(manager: &CategoryManager, opts: CategoryOptions) -> Result<()> {
    manager.add_category(&opts.category)?;
    Ok(())
}

fn run_tags(manager: &CategoryManager, opts: CategoryOptions) -> Result<()> {
    for tag in manager.all_tags(&opts.category)? {
        println!("{tag}");
    }

    Ok(())
}

fn run_workflow(manager: &CategoryManager, opts: CategoryOptions) -> Result<()> {
    println!("{}", manager.workflow(&opts.category)?);
    Ok(())
}

fn run_list(manager: &CategoryManager, opts: CategoryOptions) -> Result<()> {
    for name in manager.store().list(&opts.category)? {
        println!("{name}");
    }

    Ok(())
}

fn run_search(manager: &CategoryManager, opts: SearchOptions) -> Result<()> {
    for name in manager.store().search(&opts.category, &opts.query)? {
        println!("{name}");
    }

    Ok(())
}

fn run_show(manager: &CategoryManager, opts: ShowOptions) -> Result<()> {
    let DocumentOptions { category, name } = &opts.document;
    let store = manager.store();

    if !opts.content {
        println!("{}", store.metadata(category, name)?);
    }
    if !opts.metadata {
        print!("{}", store.content(category, name)?);
    }

    Ok(())
}

fn run_add(manager: &CategoryManager, opts: DocumentOptions) -> Result<()> {
    manager.store().add(&opts.category, &opts.name)?;
    Ok(())
}

fn run_rename(manager: &CategoryManager, opts: RenameOptions) -> Result<()> {
    let DocumentOptions { category, name } = &opts.document;
    manager.store().rename(category, name, &opts.new_name)?;
    Ok(())
}

fn run_delete(manager: &CategoryManager, opts: DocumentOptions) -> Result<()> {
    manager.store().delete(&opts.category, &opts.name)?;
    Ok(())
}

fn run_set_content(manager: &CategoryManager, opts: SetContentOptions) -> Result<()> {
    let DocumentOptions { category, name } = &opts.document;
    let content = std::fs::read_to_string(&opts.file)
        .with_context(|| format!("cannot read {:?}", opts.file.display()))?;

    if manager.store().set_content(category, name, &content)? == Change::Unchanged {
        info!("content of {category}/{name} already up to date");
    }

    Ok(())
}

fn run_set_metadata(manager: &CategoryManager, opts: SetMetadataOptions) -> Result<()> {
    let DocumentOptions { category, name } = &opts.document;
    let metadata: Metadata = std::fs::read_to_string(&opts.file)
        .with_context(|| format!("cannot read {:?}", opts.file.display()))?
        .parse()?;

    let result = manager
        .store()
        .set_metadata(category, name, metadata, opts.action.as_deref())?;
    println!("{result}");

    Ok(())
}

fn run_status(manager: &CategoryManager) -> Result<()> {
    print!("{}", manager.store().status()?);
    Ok(())
}
