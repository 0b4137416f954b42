// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that git-docs uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! Two files are involved. The __settings__ file is a TOML file configuring
//! the git-docs program itself. The __root configuration__ is a JSON file at
//! the top of a working directory that registers its categories.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Program settings layout.
///
/// # General Layout
///
/// ```toml
/// working_dir = "$HOME/notes/.git-docs"
/// repository = "$HOME/notes"
/// git = "git"
/// timeout_secs = 30
/// ```
///
/// Every field is optional.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the categories. Relative paths resolve against the
    /// current directory.
    pub working_dir: PathBuf,

    /// Root of the repository versioning the working directory. Unset means
    /// discover it from the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,

    /// Git executable to invoke.
    pub git: String,

    /// Seconds after which a Git subprocess gets killed. Unset means wait
    /// forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(".git-docs"),
            repository: None,
            git: "git".into(),
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        settings.working_dir = expand_path(&settings.working_dir)?;
        settings.repository = settings
            .repository
            .as_deref()
            .map(expand_path)
            .transpose()?;

        Ok(settings)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path = path.to_string_lossy();
    let expanded = shellexpand::full(path.as_ref())
        .map_err(ConfigError::ShellExpansion)?;

    Ok(PathBuf::from(expanded.into_owned()))
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Root configuration layout of a working directory.
///
/// Lists categories in registration order.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RootConfiguration {
    #[serde(default)]
    pub categories: Vec<String>,
}

impl RootConfiguration {
    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|current| current == category)
    }
}

impl FromStr for RootConfiguration {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(data).map_err(ConfigError::Json)
    }
}

impl Display for RootConfiguration {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            serde_json::to_string(self)
                .map_err(ConfigError::Json)?
                .as_str(),
        )
    }
}

/// Load settings from target path.
///
/// A missing settings file yields default settings.
///
/// # Errors
///
/// - Return [`ConfigError::Read`] if settings file exists but cannot be read.
/// - Return [`ConfigError::Deserialize`] if settings are malformed.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(data) => data.parse(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(source) => Err(ConfigError::Read {
            source,
            path: path.to_path_buf(),
        }),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to handle JSON configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to read configuration file.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah/blah")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            working_dir = "$BLAH/.git-docs"
            repository = "$BLAH"
            git = "/usr/bin/git"
            timeout_secs = 30
        "#
        .parse()?;

        let expect = Settings {
            working_dir: PathBuf::from("/home/blah/blah/.git-docs"),
            repository: Some(PathBuf::from("/home/blah/blah")),
            git: "/usr/bin/git".into(),
            timeout_secs: Some(30),
        };

        assert_eq!(result, expect);
        assert_eq!(result.timeout(), Some(Duration::from_secs(30)));

        Ok(())
    }

    #[test]
    fn deserialize_empty_settings_uses_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;
        assert_eq!(result, Settings::default());
        assert_eq!(result.timeout(), None);
        assert_eq!(result.repository, None);

        Ok(())
    }

    #[sealed_test(env = [("NOTES", "/srv/notes")])]
    fn deserialize_repository_override() -> anyhow::Result<()> {
        let result: Settings = r#"
            working_dir = "${NOTES}/.git-docs"
            repository = "${NOTES}"
        "#
        .parse()?;

        assert_eq!(result.repository, Some(PathBuf::from("/srv/notes")));
        assert!(result.working_dir.starts_with("/srv/notes"));
        assert_eq!(result.git, "git");

        Ok(())
    }

    #[test]
    fn serialize_settings() {
        let result = Settings {
            working_dir: PathBuf::from("/home/blah/notes"),
            repository: Some(PathBuf::from("/home/blah")),
            git: "git".into(),
            timeout_secs: Some(5),
        }
        .to_string();

        let expect = indoc! {r#"
            working_dir = "/home/blah/notes"
            repository = "/home/blah"
            git = "git"
            timeout_secs = 5
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn root_configuration_round_trip() -> anyhow::Result<()> {
        let result: RootConfiguration = r#"{"categories": ["recipes", "journal"]}"#.parse()?;
        assert!(result.contains("journal"));
        assert!(!result.contains("Journal"));
        assert_eq!(result.to_string(), r#"{"categories":["recipes","journal"]}"#);

        Ok(())
    }

    #[sealed_test]
    fn load_missing_settings_yields_defaults() -> anyhow::Result<()> {
        let result = load_settings("settings.toml")?;
        assert_eq!(result, Settings::default());

        std::fs::write("settings.toml", "git = \"git2\"\n")?;
        let result = load_settings("settings.toml")?;
        assert_eq!(result.git, "git2");

        Ok(())
    }
}
