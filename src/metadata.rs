// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document metadata layout.
//!
//! Metadata is an open JSON object. Only the `tags` field is understood by
//! git-docs. Every other field is carried along untouched so that users can
//! store whatever else they need next to their tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Metadata of a document.
#[derive(Default, Debug, PartialEq, Clone, Deserialize, Serialize)]
pub struct Metadata {
    /// Ordered tag set.
    pub tags: Vec<String>,

    /// Any other field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Construct new metadata with target tags and no extra fields.
    pub fn with_tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|current| current == tag)
    }

    /// Insert tag if not already present.
    ///
    /// Returns `false` when the tag was already there.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }

        self.tags.push(tag);
        true
    }

    /// Remove every occurrence of tag.
    ///
    /// Returns `false` when the tag was absent.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|current| current != tag);
        self.tags.len() != before
    }
}

impl FromStr for Metadata {
    type Err = serde_json::Error;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(data)
    }
}

impl Display for Metadata {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            serde_json::to_string(self)
                .map_err(|_| FmtError)?
                .as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserialize_keeps_extra_fields() -> anyhow::Result<()> {
        let result: Metadata =
            r#"{"tags": ["draft", "recipe"], "author": "jane", "rating": {"stars": 4}}"#.parse()?;

        let mut extra = Map::new();
        extra.insert("author".into(), json!("jane"));
        extra.insert("rating".into(), json!({"stars": 4}));
        let expect = Metadata {
            tags: vec!["draft".into(), "recipe".into()],
            extra,
        };
        assert_eq!(result, expect);

        let round_trip: Value = serde_json::from_str(&result.to_string())?;
        assert_eq!(
            round_trip,
            json!({"tags": ["draft", "recipe"], "author": "jane", "rating": {"stars": 4}})
        );

        Ok(())
    }

    #[test]
    fn deserialize_requires_tags() {
        let result = r#"{"author": "jane"}"#.parse::<Metadata>();
        assert!(result.is_err());
    }

    #[test]
    fn tag_insertion_is_idempotent() {
        let mut metadata = Metadata::with_tags(["draft"]);

        assert!(metadata.add_tag("public"));
        assert!(!metadata.add_tag("public"));
        assert!(!metadata.add_tag("draft"));
        assert_eq!(metadata.tags, vec!["draft", "public"]);
    }

    #[test]
    fn tag_removal_is_idempotent() {
        let mut metadata = Metadata::with_tags(["draft", "public"]);

        assert!(metadata.remove_tag("draft"));
        assert!(!metadata.remove_tag("draft"));
        assert!(!metadata.remove_tag("missing"));
        assert_eq!(metadata.tags, vec!["public"]);
    }
}
