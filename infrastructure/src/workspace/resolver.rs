//! Workspace path resolver — the boundary every tool stands behind.
//!
//! [`PathResolver`] turns a user-supplied path string into a
//! [`ResolvedPath`] that is provably the workspace root or a descendant of
//! it. Nothing else in this crate touches a raw path string.
//!
//! # Resolution pipeline
//!
//! ```text
//! raw ──▶ expand "~" ──▶ join to root / clean ──▶ boundary check
//!                                                     │
//!                     symlink walk, re-checking ◀─────┘
//!                     the boundary after every hop
//! ```
//!
//! The symlink walk is what makes the boundary real: a link planted inside
//! the workspace that points outside fails even though the literal input
//! looked safe. Missing components are allowed (file creation needs them);
//! only components that exist are checked for being links.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use workbench_domain::tool::error::{ToolError, ToolResult};
use workbench_domain::workspace::ResolvedPath;

/// Boundary-checking path resolver for one workspace.
///
/// Holds the canonical workspace root, set once at startup and immutable
/// thereafter. Cheap to clone; tools hold their own copy.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical absolute root; symlink-free by construction.
    root: PathBuf,
    /// Hop budget for one resolution.
    max_hops: usize,
}

impl PathResolver {
    /// Canonicalize `root` and build a resolver for it.
    ///
    /// A missing root, a root that is not a directory, or an empty root
    /// string is a fatal startup error for the caller.
    pub fn new(root: impl AsRef<Path>, max_hops: usize) -> ToolResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(ToolError::WorkspaceRootNotSet);
        }

        let canonical = root
            .canonicalize()
            .map_err(|e| ToolError::io("canonicalize", root.display().to_string(), e))?;

        let meta = fs::metadata(&canonical)
            .map_err(|e| ToolError::io("stat", canonical.display().to_string(), e))?;
        if !meta.is_dir() {
            return Err(ToolError::NotADirectory {
                path: canonical.display().to_string(),
            });
        }

        debug!(root = %canonical.display(), "workspace root canonicalized");
        Ok(Self {
            root: canonical,
            max_hops,
        })
    }

    /// The canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a raw path string to a boundary-checked path pair.
    ///
    /// Empty string and `"."` denote the workspace root. A leading `~` is
    /// expanded to the home directory first — expansion is not a trust
    /// boundary, the result goes through the same checks as anything else.
    pub fn resolve(&self, raw: &str) -> ToolResult<ResolvedPath> {
        if raw.is_empty() || raw == "." {
            return Ok(ResolvedPath::new(self.root.clone(), ""));
        }

        let expanded = expand_home(raw);
        let joined = if expanded.is_absolute() {
            expanded
        } else {
            self.root.join(expanded)
        };
        let cleaned = clean_path(&joined);

        self.check_boundary(&cleaned, raw)?;
        self.walk_symlinks(&cleaned, raw)?;

        let relative = self.to_relative(&cleaned);
        Ok(ResolvedPath::new(cleaned, relative))
    }

    /// Cleaned path must equal the root or start with root + separator.
    fn check_boundary(&self, cleaned: &Path, raw: &str) -> ToolResult<()> {
        if cleaned == self.root || cleaned.starts_with(&self.root) {
            Ok(())
        } else {
            Err(ToolError::OutsideWorkspace {
                path: raw.to_string(),
            })
        }
    }

    /// Follow symlinks hop by hop, re-checking the boundary after each hop.
    ///
    /// Walks the cleaned path component-wise from the filesystem root.
    /// Whenever an existing component turns out to be a link, its target is
    /// spliced in (cleaned, boundary-checked) and the walk restarts from the
    /// top of the spliced path, so links buried in the target's prefix are
    /// found too. A seen-set catches cycles, the hop budget catches
    /// unbounded chains.
    fn walk_symlinks(&self, cleaned: &Path, raw: &str) -> ToolResult<()> {
        let mut parts: VecDeque<OsString> = normal_components(cleaned);
        let mut resolved = PathBuf::from(std::path::MAIN_SEPARATOR_STR);
        let mut hops = 0usize;
        let mut seen: HashSet<PathBuf> = HashSet::new();

        while let Some(part) = parts.pop_front() {
            let next = resolved.join(&part);

            let meta = match fs::symlink_metadata(&next) {
                Ok(meta) => meta,
                // Missing components are fine: creation targets and anything
                // below a dangling link just pass through unchecked.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    resolved = next;
                    continue;
                }
                Err(e) => return Err(ToolError::io("stat", next.display().to_string(), e)),
            };

            if !meta.file_type().is_symlink() {
                resolved = next;
                continue;
            }

            hops += 1;
            if hops > self.max_hops {
                return Err(ToolError::SymlinkChainTooLong {
                    path: next.display().to_string(),
                    max_hops: self.max_hops,
                });
            }
            if !seen.insert(next.clone()) {
                return Err(ToolError::SymlinkLoop {
                    path: next.display().to_string(),
                });
            }

            let target = fs::read_link(&next)
                .map_err(|e| ToolError::io("readlink", next.display().to_string(), e))?;
            let spliced = if target.is_absolute() {
                clean_path(&target)
            } else {
                clean_path(&resolved.join(target))
            };

            self.check_boundary(&spliced, raw)?;

            // Restart from the top of the spliced path with the unvisited
            // suffix appended; prefix components get re-stat'd.
            let mut requeued = normal_components(&spliced);
            requeued.append(&mut parts);
            parts = requeued;
            resolved = PathBuf::from(std::path::MAIN_SEPARATOR_STR);
        }

        Ok(())
    }

    /// Workspace-relative slash path; empty for the root itself.
    fn to_relative(&self, absolute: &Path) -> String {
        let stripped = absolute.strip_prefix(&self.root).unwrap_or(absolute);
        let parts: Vec<String> = stripped
            .components()
            .filter_map(|c| match c {
                Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        parts.join("/")
    }
}

/// Expand a leading `~` or `~/` to the home directory.
///
/// Anything else (including `~user`) passes through literally.
fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem. `..` at the filesystem root stays at the root.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// The `Normal` components of an already-cleaned absolute path.
fn normal_components(path: &Path) -> VecDeque<OsString> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(os) => Some(os.to_os_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn resolver(root: &Path) -> PathResolver {
        PathResolver::new(root, 64).unwrap()
    }

    #[test]
    fn test_empty_root_rejected() {
        let err = PathResolver::new("", 64).unwrap_err();
        assert!(matches!(err, ToolError::WorkspaceRootNotSet));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let err = PathResolver::new("/definitely/not/a/real/root", 64).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[test]
    fn test_empty_and_dot_mean_root() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        for raw in ["", "."] {
            let resolved = resolver.resolve(raw).unwrap();
            assert!(resolved.is_root());
            assert_eq!(resolved.absolute, resolver.root());
            assert_eq!(resolved.relative, "");
        }
    }

    #[test]
    fn test_relative_path_joins_to_root() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        let resolved = resolver.resolve("src/main.rs").unwrap();
        assert_eq!(resolved.absolute, resolver.root().join("src/main.rs"));
        assert_eq!(resolved.relative, "src/main.rs");
    }

    #[test]
    fn test_dotdot_escape_rejected() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        for raw in ["..", "../sibling", "src/../../../etc/passwd"] {
            let err = resolver.resolve(raw).unwrap_err();
            assert!(
                matches!(err, ToolError::OutsideWorkspace { .. }),
                "{raw} should be outside, got {err:?}"
            );
        }
    }

    #[test]
    fn test_absolute_escape_rejected() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        let err = resolver.resolve("/etc/passwd").unwrap_err();
        assert!(matches!(err, ToolError::OutsideWorkspace { .. }));
    }

    #[test]
    fn test_absolute_path_inside_root_accepted() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        let inside = resolver.root().join("notes.txt");
        let resolved = resolver.resolve(inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved.relative, "notes.txt");
    }

    #[test]
    fn test_dotdot_inside_a_filename_is_ordinary() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        let resolved = resolver.resolve("backup..old.txt").unwrap();
        assert_eq!(resolved.relative, "backup..old.txt");
    }

    #[test]
    fn test_missing_components_permitted() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        // Nothing under the root exists yet; creation targets still resolve.
        let resolved = resolver.resolve("deep/nested/new.txt").unwrap();
        assert_eq!(resolved.relative, "deep/nested/new.txt");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("/a/..")), PathBuf::from("/"));
    }

    #[cfg(unix)]
    mod symlinks {
        use super::*;
        use std::os::unix::fs::symlink;

        #[test]
        fn test_escaping_symlink_rejected() {
            let dir = tempdir().unwrap();
            let resolver = resolver(dir.path());
            symlink("/etc", resolver.root().join("evil")).unwrap();

            let err = resolver.resolve("evil").unwrap_err();
            assert!(matches!(err, ToolError::OutsideWorkspace { .. }));

            // Escape below a link fails the same way
            let err = resolver.resolve("evil/passwd").unwrap_err();
            assert!(matches!(err, ToolError::OutsideWorkspace { .. }));
        }

        #[test]
        fn test_relative_symlink_escape_rejected() {
            let dir = tempdir().unwrap();
            let resolver = resolver(dir.path());
            symlink("../..", resolver.root().join("up")).unwrap();

            let err = resolver.resolve("up").unwrap_err();
            assert!(matches!(err, ToolError::OutsideWorkspace { .. }));
        }

        #[test]
        fn test_inbounds_symlink_accepted() {
            let dir = tempdir().unwrap();
            let resolver = resolver(dir.path());
            std::fs::create_dir(resolver.root().join("real")).unwrap();
            symlink(resolver.root().join("real"), resolver.root().join("alias")).unwrap();

            let resolved = resolver.resolve("alias/file.txt").unwrap();
            assert_eq!(resolved.relative, "alias/file.txt");
        }

        #[test]
        fn test_dangling_inbounds_symlink_accepted() {
            let dir = tempdir().unwrap();
            let resolver = resolver(dir.path());
            symlink(resolver.root().join("not-yet"), resolver.root().join("dangling")).unwrap();

            assert!(resolver.resolve("dangling").is_ok());
        }

        #[test]
        fn test_chain_of_exactly_max_hops_resolves() {
            let dir = tempdir().unwrap();
            let max_hops = 5;
            let resolver = PathResolver::new(dir.path(), max_hops).unwrap();
            let root = resolver.root().to_path_buf();

            std::fs::write(root.join("target"), b"x").unwrap();
            symlink(root.join("target"), root.join("hop0")).unwrap();
            for i in 1..max_hops {
                symlink(root.join(format!("hop{}", i - 1)), root.join(format!("hop{i}"))).unwrap();
            }

            assert!(resolver.resolve(&format!("hop{}", max_hops - 1)).is_ok());
        }

        #[test]
        fn test_chain_one_past_max_hops_fails() {
            let dir = tempdir().unwrap();
            let max_hops = 5;
            let resolver = PathResolver::new(dir.path(), max_hops).unwrap();
            let root = resolver.root().to_path_buf();

            std::fs::write(root.join("target"), b"x").unwrap();
            symlink(root.join("target"), root.join("hop0")).unwrap();
            for i in 1..=max_hops {
                symlink(root.join(format!("hop{}", i - 1)), root.join(format!("hop{i}"))).unwrap();
            }

            let err = resolver.resolve(&format!("hop{max_hops}")).unwrap_err();
            assert!(matches!(err, ToolError::SymlinkChainTooLong { .. }));
        }

        #[test]
        fn test_two_node_cycle_fails_as_loop() {
            let dir = tempdir().unwrap();
            let resolver = resolver(dir.path());
            let root = resolver.root().to_path_buf();

            symlink(root.join("b"), root.join("a")).unwrap();
            symlink(root.join("a"), root.join("b")).unwrap();

            let err = resolver.resolve("a").unwrap_err();
            assert!(matches!(err, ToolError::SymlinkLoop { .. }), "got {err:?}");
        }
    }

    #[test]
    fn test_home_expansion_is_boundary_checked() {
        let dir = tempdir().unwrap();
        let resolver = resolver(dir.path());

        // Point HOME at the (canonical) workspace root so "~/x" lands
        // inside it. set_var is process-global; nothing else in this suite
        // reads HOME.
        unsafe { std::env::set_var("HOME", resolver.root()) };

        let resolved = resolver.resolve("~/notes.txt").unwrap();
        assert_eq!(resolved.relative, "notes.txt");

        // Point HOME outside the workspace: expansion succeeds, boundary fails.
        let outside = tempdir().unwrap();
        unsafe { std::env::set_var("HOME", outside.path()) };
        let err = resolver.resolve("~/notes.txt").unwrap_err();
        assert!(matches!(err, ToolError::OutsideWorkspace { .. }));
    }
}
