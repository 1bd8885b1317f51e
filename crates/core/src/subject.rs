// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subject matching for the dot-delimited bus address space.
//!
//! Subjects are hierarchical, dot-delimited strings (`settings.get.all`).
//! Subscription patterns may contain two wildcards:
//!
//! - `*` matches exactly one segment (`settings.get.*` matches
//!   `settings.get.all` but not `settings.get.a.b`)
//! - `>` matches one or more trailing segments and must be the final
//!   pattern token (`compute.>` matches `compute.result.x` but not
//!   `compute`)

/// Returns true when `subject` matches the subscription `pattern`.
///
/// A literal pattern matches only itself. Empty subjects never match.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    if pattern.is_empty() || subject.is_empty() {
        return false;
    }

    let mut pat = pattern.split('.');
    let mut sub = subject.split('.');

    loop {
        match (pat.next(), sub.next()) {
            (Some(">"), Some(_)) => return true,
            (Some(">"), None) => return false,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (Some(_), Some(_)) => return false,
            (None, None) => return true,
            (None, Some(_)) | (Some(_), None) => return false,
        }
    }
}

/// Extract the trailing segment of a subject (`settings.get.all` -> `all`).
///
/// Returns the whole subject when it has no dots.
pub fn last_segment(subject: &str) -> &str {
    subject.rsplit('.').next().unwrap_or(subject)
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
