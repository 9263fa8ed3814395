//! Workspace naming convention: `<prefix>-<n>`.

use anyhow::{Context, Result, anyhow};
use regex::Regex;

/// Names workspaces and recognizes names that belong to the convention.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    prefix: String,
    indexed: Regex,
}

impl NamingConvention {
    pub fn new(prefix: &str) -> Result<Self> {
        if prefix.trim().is_empty() {
            return Err(anyhow!("workspace prefix must be non-empty"));
        }
        let pattern = format!(r"^{}-(\d+)$", regex::escape(prefix));
        let indexed =
            Regex::new(&pattern).with_context(|| format!("compile naming pattern {pattern}"))?;
        Ok(Self {
            prefix: prefix.to_string(),
            indexed,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self, index: u32) -> String {
        format!("{}-{index}", self.prefix)
    }

    /// Pattern suitable for `git branch --list`.
    pub fn branch_glob(&self) -> String {
        format!("{}-*", self.prefix)
    }

    /// Numeric index of a strictly conforming name.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.indexed
            .captures(name.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// True for any name in the `<prefix>-` namespace, indexed or not.
    pub fn in_namespace(&self, name: &str) -> bool {
        name.trim()
            .strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// One past the highest index among `existing`, starting at 1.
    pub fn next_index<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> u32 {
        existing
            .into_iter()
            .filter_map(|name| self.index_of(name))
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_parses_indices() {
        let naming = NamingConvention::new("fanline").expect("naming");
        assert_eq!(naming.name(3), "fanline-3");
        assert_eq!(naming.index_of("fanline-12"), Some(12));
        assert_eq!(naming.index_of("fanline-x"), None);
        assert_eq!(naming.index_of("other-1"), None);
        assert_eq!(naming.branch_glob(), "fanline-*");
    }

    #[test]
    fn next_index_skips_past_highest() {
        let naming = NamingConvention::new("fanline").expect("naming");
        assert_eq!(naming.next_index(Vec::<&str>::new()), 1);
        assert_eq!(
            naming.next_index(["fanline-2", "fanline-7", "main", "fanline-x"]),
            8
        );
    }

    #[test]
    fn namespace_includes_unindexed_names() {
        let naming = NamingConvention::new("fanline").expect("naming");
        assert!(naming.in_namespace("fanline-1"));
        assert!(naming.in_namespace("fanline-scratch"));
        assert!(!naming.in_namespace("fanlineish"));
        assert!(!naming.in_namespace("main"));
    }

    #[test]
    fn prefix_is_escaped() {
        let naming = NamingConvention::new("a.b").expect("naming");
        assert_eq!(naming.index_of("a.b-1"), Some(1));
        assert_eq!(naming.index_of("axb-1"), None);
    }

    #[test]
    fn rejects_empty_prefix() {
        assert!(NamingConvention::new("  ").is_err());
    }
}
