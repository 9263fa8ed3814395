//! The durable session aggregate and its additive merge rule.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted record of one baseline and its outstanding workspaces.
///
/// Field order is part of the on-disk format: `base_branch`, `branches`,
/// `parent_dir`. `branches` order fixes reconciliation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Line every workspace was created from and is reconciled into.
    pub base_branch: String,
    /// Workspace identifiers (branch names), in creation order.
    pub branches: Vec<String>,
    /// Directory holding one worktree directory per workspace.
    pub parent_dir: PathBuf,
}

/// One tracked workspace resolved against the session's parent directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub path: PathBuf,
}

impl Session {
    /// Workspace ids in stored order with manual-edit duplicates dropped.
    ///
    /// The first occurrence wins so merge order is unchanged.
    pub fn unique_branches(&self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            if !seen.contains(branch) {
                seen.push(branch.clone());
            }
        }
        seen
    }

    pub fn workspace_path(&self, id: &str) -> PathBuf {
        self.parent_dir.join(id)
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        self.unique_branches()
            .into_iter()
            .map(|id| Workspace {
                path: self.workspace_path(&id),
                id,
            })
            .collect()
    }
}

/// Merge newly created workspace ids into an existing session, or start one.
///
/// This is the only way sessions come into existence. An existing session
/// keeps its `base_branch` and `parent_dir`; `new_ids` are appended in order,
/// skipping any id it already tracks.
pub fn merge_append(
    existing: Option<Session>,
    new_ids: &[String],
    base_branch: &str,
    parent_dir: &Path,
) -> Session {
    match existing {
        Some(mut session) => {
            for id in new_ids {
                if !session.branches.contains(id) {
                    session.branches.push(id.clone());
                }
            }
            session
        }
        None => Session {
            base_branch: base_branch.to_string(),
            branches: new_ids.to_vec(),
            parent_dir: parent_dir.to_path_buf(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_append_creates_session_with_exact_ids() {
        let session = merge_append(None, &ids(&["w-1", "w-2"]), "main", Path::new("/tmp/p"));
        assert_eq!(session.base_branch, "main");
        assert_eq!(session.branches, ids(&["w-1", "w-2"]));
        assert_eq!(session.parent_dir, PathBuf::from("/tmp/p"));
    }

    #[test]
    fn merge_append_keeps_baseline_and_parent_of_existing_session() {
        let first = merge_append(None, &ids(&["w-1", "w-2"]), "main", Path::new("/a"));
        let second = merge_append(
            Some(first),
            &ids(&["w-3", "w-4", "w-5"]),
            "develop",
            Path::new("/b"),
        );
        assert_eq!(second.base_branch, "main");
        assert_eq!(second.parent_dir, PathBuf::from("/a"));
        assert_eq!(second.branches, ids(&["w-1", "w-2", "w-3", "w-4", "w-5"]));
    }

    #[test]
    fn merge_append_with_nothing_new_is_unchanged() {
        let first = merge_append(None, &ids(&["w-1"]), "main", Path::new("/a"));
        let again = merge_append(Some(first.clone()), &[], "main", Path::new("/a"));
        assert_eq!(again, first);
    }

    #[test]
    fn unique_branches_drops_later_duplicates() {
        let session = Session {
            base_branch: "main".to_string(),
            branches: ids(&["w-2", "w-1", "w-2"]),
            parent_dir: PathBuf::from("/p"),
        };
        assert_eq!(session.unique_branches(), ids(&["w-2", "w-1"]));
        let workspaces = session.workspaces();
        assert_eq!(workspaces[1].path, PathBuf::from("/p/w-1"));
    }
}
