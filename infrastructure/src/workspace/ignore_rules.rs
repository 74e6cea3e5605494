//! Gitignore adapter for the ignore-rules port.
//!
//! Wraps the `ignore` crate's gitignore matcher over the workspace root's
//! `.gitignore`. The `.git` directory itself is always ignored — no project
//! lists it, and no agent should walk into it.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use workbench_application::ports::ignore_rules::IgnoreRulesPort;

/// Production ignore matcher backed by the workspace's `.gitignore`.
pub struct GitignoreRules {
    matcher: Gitignore,
}

impl GitignoreRules {
    /// Load `.gitignore` from the workspace root. A missing or unparsable
    /// file degrades to "ignore nothing" (plus the built-in `.git` rule).
    pub fn load(workspace_root: &Path) -> Self {
        let mut builder = GitignoreBuilder::new(workspace_root);
        // add() reports a missing file as Some(err); that is fine here.
        let _ = builder.add(workspace_root.join(".gitignore"));
        let matcher = builder.build().unwrap_or_else(|_| Gitignore::empty());
        Self { matcher }
    }
}

impl IgnoreRulesPort for GitignoreRules {
    fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        if relative_path == ".git" || relative_path.starts_with(".git/") {
            return true;
        }
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_gitignore_rules_match() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n*.log\n").unwrap();

        let rules = GitignoreRules::load(dir.path());
        assert!(rules.is_ignored("target", true));
        assert!(rules.is_ignored("target/debug/app", false));
        assert!(rules.is_ignored("build.log", false));
        assert!(!rules.is_ignored("src/main.rs", false));
    }

    #[test]
    fn test_git_dir_always_ignored() {
        let dir = tempdir().unwrap();
        let rules = GitignoreRules::load(dir.path());
        assert!(rules.is_ignored(".git", true));
        assert!(rules.is_ignored(".git/HEAD", false));
    }

    #[test]
    fn test_missing_gitignore_ignores_nothing_else() {
        let dir = tempdir().unwrap();
        let rules = GitignoreRules::load(dir.path());
        assert!(!rules.is_ignored("anything.txt", false));
    }
}
