// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tag-driven workflow triggers.
//!
//! Each category can ship a __workflow__ configuration. A workflow maps rule
//! keys of the form `when-added-<tag>` or `when-removed-<tag>` to an ordered
//! list of workflow elements. Whenever metadata is saved, the tags added and
//! removed relative to the stored metadata select the rules to fire.
//!
//! # Element Selection
//!
//! Only one element of a rule fires. Without an action name, the first
//! element fires. With an action name, only the element carrying that exact
//! name fires, and nothing fires if no element has that name.
//!
//! # Single Pass
//!
//! Tags that get added or removed by a fired element do not fire further
//! rules themselves. Only the difference between the stored metadata and the
//! metadata handed in by the caller counts.

use crate::{metadata::Metadata, query};

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::debug;

/// Workflow configuration layout of a category.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WorkflowConfiguration {
    pub rules: BTreeMap<String, Vec<WorkflowElement>>,
}

impl WorkflowConfiguration {
    /// Elements of the rule fired when `tag` gets added.
    pub fn when_added(&self, tag: &str) -> Option<&[WorkflowElement]> {
        self.rules.get(&added_rule_key(tag)).map(Vec::as_slice)
    }

    /// Elements of the rule fired when `tag` gets removed.
    pub fn when_removed(&self, tag: &str) -> Option<&[WorkflowElement]> {
        self.rules.get(&removed_rule_key(tag)).map(Vec::as_slice)
    }

    /// Fire every rule selected by the tag difference between stored metadata
    /// and new metadata.
    ///
    /// Conditions are evaluated against the stored tags, while tag changes
    /// land on the new metadata. Returns the number of elements that fired.
    pub fn apply(
        &self,
        current: &Metadata,
        metadata: &mut Metadata,
        action: Option<&str>,
    ) -> usize {
        let difference = TagDifference::between(&current.tags, &metadata.tags);
        let mut fired = 0;

        let added = difference.added.iter().map(|tag| (tag, self.when_added(tag)));
        let removed = difference.removed.iter().map(|tag| (tag, self.when_removed(tag)));
        for (tag, elements) in added.chain(removed) {
            let chosen = elements.and_then(|elements| choose_element(elements, action));
            let Some(element) = chosen else {
                continue;
            };

            if element.execute(&current.tags, metadata) {
                debug!("workflow element {:?} fired for tag {tag:?}", element.name);
                fired += 1;
            }
        }

        fired
    }
}

impl FromStr for WorkflowConfiguration {
    type Err = serde_json::Error;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(data)
    }
}

impl Display for WorkflowConfiguration {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            serde_json::to_string_pretty(self)
                .map_err(|_| FmtError)?
                .as_str(),
        )
    }
}

/// Conditional tag edit.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowElement {
    /// Action name used to pick this element over the default one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tag query the stored tags must satisfy for the element to fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default)]
    pub add_tags: Vec<String>,

    #[serde(default)]
    pub remove_tags: Vec<String>,
}

impl WorkflowElement {
    /// Apply tag edits to metadata if condition holds for current tags.
    ///
    /// Insertions happen before removals. Returns `false` if the condition
    /// did not hold.
    pub fn execute(&self, current_tags: &[String], metadata: &mut Metadata) -> bool {
        if let Some(condition) = &self.condition {
            if !query::matches(condition, current_tags) {
                return false;
            }
        }

        for tag in &self.add_tags {
            metadata.add_tag(tag.as_str());
        }
        for tag in &self.remove_tags {
            metadata.remove_tag(tag);
        }

        true
    }
}

/// Pick the element of a rule that should fire.
pub fn choose_element<'a>(
    elements: &'a [WorkflowElement],
    action: Option<&str>,
) -> Option<&'a WorkflowElement> {
    match action {
        None | Some("") => elements.first(),
        Some(action) => elements
            .iter()
            .find(|element| element.name.as_deref() == Some(action)),
    }
}

pub fn added_rule_key(tag: &str) -> String {
    format!("when-added-{tag}")
}

pub fn removed_rule_key(tag: &str) -> String {
    format!("when-removed-{tag}")
}

/// Tags added and removed between two tag lists.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct TagDifference {
    /// Tags of the new list missing from the old one, in new order.
    pub added: Vec<String>,

    /// Tags of the old list missing from the new one, in old order.
    pub removed: Vec<String>,
}

impl TagDifference {
    pub fn between(old: &[String], new: &[String]) -> Self {
        Self {
            added: missing_from(new, old),
            removed: missing_from(old, new),
        }
    }
}

fn missing_from(tags: &[String], other: &[String]) -> Vec<String> {
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    tags.iter()
        .filter(|tag| !other.contains(tag.as_str()) && seen.insert(tag.as_str()))
        .cloned()
        .collect()
}
