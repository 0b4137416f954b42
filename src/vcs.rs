// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control guard.
//!
//! A working directory of git-docs may live inside a Git repository. When it
//! does, every mutation follows the same protocol:
//!
//! 1. Verify that nothing under the working directory has pending changes.
//! 2. Apply the change to the file system.
//! 3. Stage the working directory, and commit it.
//!
//! The clean check of step one is the only guard against other writers. It is
//! not a lock. Step three is not atomic with step two either, so a failed
//! commit leaves the file system ahead of the last commit. Callers are told
//! about the failure, but nothing is rolled back.
//!
//! Git itself is invoked as an external program. Subprocesses block the
//! caller until they exit, unless a timeout was configured, in which case a
//! subprocess that runs past it is killed and reported as
//! [`VcsError::Timeout`].

use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    thread,
    time::Duration,
};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

/// Where the working directory lives with respect to version control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionControlContext {
    /// Working directory is not tracked by any repository.
    Unversioned { working_dir: PathBuf },

    /// Working directory lies inside the work tree of a repository.
    Versioned { root: PathBuf, working_dir: PathBuf },
}

impl VersionControlContext {
    pub fn unversioned(working_dir: impl Into<PathBuf>) -> Self {
        Self::Unversioned {
            working_dir: working_dir.into(),
        }
    }

    /// Construct versioned context.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::NotAbsolute`] if either path is relative.
    /// - Return [`VcsError::OutsideRoot`] if working directory does not lie
    ///   under repository root.
    pub fn versioned(root: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let working_dir = working_dir.into();
        ensure_absolute(&root)?;
        ensure_absolute(&working_dir)?;
        if !working_dir.starts_with(&root) {
            return Err(VcsError::OutsideRoot { root, working_dir });
        }

        Ok(Self::Versioned { root, working_dir })
    }

    /// Detect enclosing repository of working directory.
    ///
    /// The working directory does not need to exist yet. Discovery starts from
    /// its closest existing ancestor.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::NotAbsolute`] if working directory is relative.
    /// - Return [`VcsError::Discover`] if repository discovery fails for any
    ///   other reason than there being no repository.
    #[instrument(skip(working_dir), level = "debug")]
    pub fn detect(working_dir: impl AsRef<Path>) -> Result<Self> {
        let working_dir = working_dir.as_ref();
        ensure_absolute(working_dir)?;

        let Some(base) = working_dir.ancestors().find(|path| path.exists()) else {
            return Ok(Self::unversioned(working_dir));
        };
        let remainder = working_dir.strip_prefix(base).unwrap_or(Path::new(""));
        let base = base.canonicalize().map_err(|source| VcsError::Canonicalize {
            source,
            path: base.to_path_buf(),
        })?;
        let working_dir = base.join(remainder);

        let repository = match git2::Repository::discover(&base) {
            Ok(repository) => repository,
            Err(error) if error.code() == git2::ErrorCode::NotFound => {
                debug!("no repository encloses {:?}", working_dir.display());
                return Ok(Self::unversioned(working_dir));
            }
            Err(error) => return Err(VcsError::Discover(error)),
        };

        match repository.workdir() {
            Some(root) => {
                let root = root.canonicalize().map_err(|source| VcsError::Canonicalize {
                    source,
                    path: root.to_path_buf(),
                })?;
                debug!("working with repository at {:?}", root.display());
                Self::versioned(root, working_dir)
            }
            None => {
                warn!("repository enclosing {:?} is bare", working_dir.display());
                Ok(Self::unversioned(working_dir))
            }
        }
    }

    pub fn working_dir(&self) -> &Path {
        match self {
            Self::Unversioned { working_dir } => working_dir,
            Self::Versioned { working_dir, .. } => working_dir,
        }
    }

    /// Repository root, if versioned.
    pub fn root(&self) -> Option<&Path> {
        match self {
            Self::Unversioned { .. } => None,
            Self::Versioned { root, .. } => Some(root),
        }
    }
}

/// Layer of indirection for version control access.
pub trait VersionControl {
    /// Check that no pending change lies under working directory.
    fn is_clean(&self, root: &Path, working_dir: &Path) -> Result<bool>;

    /// Stage target path, commit it, and verify the tree is clean afterwards.
    fn commit(&self, root: &Path, message: &str, path: &Path) -> Result<()>;

    /// Human readable status of repository.
    fn status(&self, root: &Path) -> Result<String>;
}

/// Version control through the Git executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
    timeout: Option<Duration>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    /// Construct new Git caller that blocks until every subprocess exits.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill subprocesses that run longer than target duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn describe(&self, args: &[&OsStr]) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in args {
            command.push(' ');
            command.push_str(&arg.to_string_lossy());
        }
        command
    }

    fn syscall(&self, cwd: &Path, args: &[&OsStr]) -> Result<Output> {
        let command = self.describe(args);
        debug!("run {command:?} in {:?}", cwd.display());

        let child = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VcsError::Spawn {
                source,
                command: command.clone(),
            })?;

        match self.timeout {
            Some(timeout) => wait_with_deadline(child, timeout, command),
            None => child
                .wait_with_output()
                .map_err(|source| VcsError::Spawn { source, command }),
        }
    }

    fn syscall_checked(&self, cwd: &Path, args: &[&OsStr]) -> Result<String> {
        let output = self.syscall(cwd, args)?;
        let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(output.stderr.as_slice());
            let mut message = stdout.trim_end().to_string();
            if !stderr.trim().is_empty() {
                if !message.is_empty() {
                    message.push('\n');
                }
                message.push_str(stderr.trim_end());
            }

            return Err(VcsError::Failed {
                command: self.describe(args),
                message,
            });
        }

        Ok(stdout)
    }
}

impl VersionControl for GitCli {
    #[instrument(skip(self), level = "debug")]
    fn is_clean(&self, root: &Path, working_dir: &Path) -> Result<bool> {
        let relative = relative_working_dir(root, working_dir)?;
        let output =
            self.syscall_checked(root, &[OsStr::new("status"), OsStr::new("--porcelain")])?;
        let dirty = dirty_paths(&output, &relative);
        for path in &dirty {
            warn!("{path} is not clean");
        }

        Ok(dirty.is_empty())
    }

    #[instrument(skip(self), level = "debug")]
    fn commit(&self, root: &Path, message: &str, path: &Path) -> Result<()> {
        ensure_absolute(root)?;
        ensure_absolute(path)?;

        self.syscall_checked(root, &[OsStr::new("add"), path.as_os_str()])?;

        // INVARIANT: Git refuses to commit nothing, so only commit when something got staged.
        let staged = self.syscall(
            root,
            &[OsStr::new("diff"), OsStr::new("--cached"), OsStr::new("--quiet")],
        )?;
        if staged.status.success() {
            debug!("nothing staged under {:?}", path.display());
        } else {
            self.syscall_checked(
                root,
                &[OsStr::new("commit"), OsStr::new("-m"), OsStr::new(message)],
            )?;
            info!("commit {message:?}");
        }

        if !self.is_clean(root, path)? {
            return Err(VcsError::NotCleanAfterCommit {
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }

    fn status(&self, root: &Path) -> Result<String> {
        ensure_absolute(root)?;
        self.syscall_checked(root, &[OsStr::new("status")])
    }
}

/// Collect paths of porcelain status output that fall under a relative path.
///
/// Each line starts with a two character status code and a space. Quoted paths
/// and both sides of a rename are considered. An empty relative path means
/// every reported path counts.
///
/// Matching is a plain string prefix, so a sibling sharing the prefix, e.g.,
/// `notes-archive/` for `notes`, counts as dirty too.
pub fn dirty_paths(porcelain: &str, relative: &str) -> Vec<String> {
    let quoted = format!("\"{relative}");

    porcelain
        .lines()
        .filter_map(|line| line.get(3..))
        .filter(|file| {
            let mut sides = file.split(" -> ");
            sides.any(|side| side.starts_with(relative) || side.starts_with(quoted.as_str()))
        })
        .map(ToString::to_string)
        .collect()
}

fn relative_working_dir(root: &Path, working_dir: &Path) -> Result<String> {
    ensure_absolute(root)?;
    ensure_absolute(working_dir)?;
    let relative = working_dir
        .strip_prefix(root)
        .map_err(|_| VcsError::OutsideRoot {
            root: root.to_path_buf(),
            working_dir: working_dir.to_path_buf(),
        })?;

    Ok(relative.to_string_lossy().into_owned())
}

fn ensure_absolute(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(VcsError::NotAbsolute {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

fn wait_with_deadline(mut child: Child, timeout: Duration, command: String) -> Result<Output> {
    // INVARIANT: Drain pipes while waiting so a chatty child never blocks on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!("{command:?} ran past {timeout:?}, killing it");
            let _ = child.kill();
            let _ = child.wait();
            return Err(VcsError::Timeout { command, timeout });
        }
        Err(source) => return Err(VcsError::Spawn { source, command }),
    };

    Ok(Output {
        status,
        stdout: stdout.map(collect).unwrap_or_default(),
        stderr: stderr.map(collect).unwrap_or_default(),
    })
}

fn drain(mut pipe: impl Read + Send + 'static) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Git executable cannot be spawned or waited on.
    #[error("failed to run {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Git executable exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    Failed { command: String, message: String },

    /// Git executable ran past configured timeout.
    #[error("command {command:?} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("path {:?} is not absolute", path.display())]
    NotAbsolute { path: PathBuf },

    #[error(
        "working directory {:?} is not under repository root {:?}",
        working_dir.display(),
        root.display()
    )]
    OutsideRoot { root: PathBuf, working_dir: PathBuf },

    /// Tree still has pending changes after committing.
    #[error("{:?} is not clean after commit", path.display())]
    NotCleanAfterCommit { path: PathBuf },

    #[error("failed to resolve {:?}", path.display())]
    Canonicalize {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Repository discovery through libgit2 fails.
    #[error(transparent)]
    Discover(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;
