// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tag query language.
//!
//! Documents are searched through a tiny prefix notation over their tags.
//!
//! # Grammar
//!
//! Whitespace is trimmed before the leading character of every expression is
//! classified:
//!
//! - __empty__: matches everything.
//! - `!expr`: negation of `expr`.
//! - `&a b`: both `a` and `b` must match. The operands are split at the first
//!   space after the operator. A space right after the operator leaves an
//!   empty left operand, which never matches. Without any space, `b` is empty
//!   and `&a` behaves as `a`.
//! - `|a b`: either `a` or `b` must match, split the same way as `&`.
//! - `term`: when `term` starts with an uppercase character, some tag must
//!   equal it ignoring case. Otherwise some tag must contain it ignoring case.
//!
//! Since only the first space splits operands, the right operand of `&` and `|`
//! is the rest of the query, e.g., `&a |b c` reads as `a and (b or c)`.

/// Check if a set of tags satisfies a query.
pub fn matches(query: &str, tags: &[impl AsRef<str>]) -> bool {
    let query = query.trim();

    if query.is_empty() {
        true
    } else if let Some(rest) = query.strip_prefix('!') {
        !matches(rest, tags)
    } else if let Some(rest) = query.strip_prefix('&') {
        match split_operands(rest) {
            Some((left, right)) => matches(left, tags) && matches(right, tags),
            None => false,
        }
    } else if let Some(rest) = query.strip_prefix('|') {
        match split_operands(rest) {
            Some((left, right)) => matches(left, tags) || matches(right, tags),
            None => false,
        }
    } else {
        contains_term(query, tags)
    }
}

// Returns None when the left operand would be empty.
fn split_operands(rest: &str) -> Option<(&str, &str)> {
    match rest.find(' ') {
        Some(0) => None,
        Some(index) => Some((&rest[..index], &rest[index + 1..])),
        None => Some((rest, "")),
    }
}

fn contains_term(term: &str, tags: &[impl AsRef<str>]) -> bool {
    let exact = term.chars().next().is_some_and(char::is_uppercase);
    let term = term.to_lowercase();

    tags.iter().map(|tag| tag.as_ref().to_lowercase()).any(|tag| {
        if exact {
            tag == term
        } else {
            tag.contains(term.as_str())
        }
    })
}
