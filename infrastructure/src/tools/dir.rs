//! Directory tools: list and find.
//!
//! **List** walks the tree itself: depth-first, one `readdir` per directory,
//! a visited-set of canonicalized directories so symlink cycles terminate,
//! and a cancellation poll before every descent. Collection is capped
//! globally; sorting (directories first, then lexicographic) happens before
//! pagination so identical requests against an unchanged tree page
//! identically.
//!
//! **Find** delegates enumeration to an external matcher — `fd --glob` when
//! installed, `find -name` otherwise — always as exec-style argv with the
//! pattern as one literal argument. No shell is ever involved, so no
//! pattern can smuggle a command.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use workbench_application::config::WorkspaceParams;
use workbench_application::ports::directory_tools::DirectoryToolsPort;
use workbench_application::ports::ignore_rules::IgnoreRulesPort;
use workbench_domain::tool::{
    entities::{FindFilesRequest, ListDirRequest},
    error::{ToolError, ToolResult},
    value_objects::{DirectoryEntry, FindFilesResponse, ListDirResponse, TruncationReason},
};
use workbench_domain::workspace::ResolvedPath;

use crate::workspace::PathResolver;

/// External matcher backing Find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinderProgram {
    /// `fd --glob` — fast, glob-native.
    Fd,
    /// POSIX `find -name` fallback.
    Find,
}

impl FinderProgram {
    fn discover() -> Self {
        if which::which("fd").is_ok() {
            FinderProgram::Fd
        } else {
            FinderProgram::Find
        }
    }
}

/// Adapter implementing [`DirectoryToolsPort`].
pub struct DirectoryTools {
    resolver: PathResolver,
    params: WorkspaceParams,
    ignore: Arc<dyn IgnoreRulesPort>,
    finder: FinderProgram,
}

impl DirectoryTools {
    pub fn new(
        resolver: PathResolver,
        params: &WorkspaceParams,
        ignore: Arc<dyn IgnoreRulesPort>,
    ) -> Self {
        Self {
            resolver,
            params: params.clone(),
            ignore,
            finder: FinderProgram::discover(),
        }
    }

    /// Effective page size: 0 means the configured default, anything over
    /// the configured maximum is an input error.
    fn page_limit(&self, limit: usize) -> ToolResult<usize> {
        if limit == 0 {
            Ok(self.params.page_size_default)
        } else if limit > self.params.page_size_max {
            Err(ToolError::InvalidArgument(format!(
                "limit {} exceeds maximum page size {}",
                limit, self.params.page_size_max
            )))
        } else {
            Ok(limit)
        }
    }

    fn check_max_depth(max_depth: i64) -> ToolResult<()> {
        if max_depth < -1 {
            return Err(ToolError::InvalidArgument(format!(
                "max_depth must be -1, 0, or positive, got {max_depth}"
            )));
        }
        Ok(())
    }

    /// Resolve a path that must be an existing directory.
    fn resolve_dir(&self, raw: &str) -> ToolResult<ResolvedPath> {
        let resolved = self.resolver.resolve(raw)?;
        let display = resolved.display_relative().to_string();
        match fs::metadata(resolved.as_path()) {
            Ok(meta) if meta.is_dir() => Ok(resolved),
            Ok(_) => Err(ToolError::NotADirectory { path: display }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ToolError::FileMissing { path: display })
            }
            Err(e) => Err(ToolError::io("stat", display, e)),
        }
    }

    fn list_impl(
        &self,
        request: &ListDirRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<ListDirResponse> {
        Self::check_max_depth(request.max_depth)?;
        let limit = self.page_limit(request.limit)?;
        let resolved = self.resolve_dir(&request.path)?;

        let mut walk = Walk {
            resolver: &self.resolver,
            ignore: self.ignore.as_ref(),
            include_ignored: request.include_ignored,
            max_depth: request.max_depth,
            cap: self.params.list_result_cap,
            cancel,
            entries: Vec::new(),
            visited: HashSet::new(),
            hit_cap: false,
        };
        walk.descend(resolved.as_path(), 0)?;

        let Walk {
            mut entries,
            hit_cap,
            ..
        } = walk;
        if hit_cap {
            warn!(
                path = %resolved.display_relative(),
                cap = self.params.list_result_cap,
                "directory listing hit result cap"
            );
        }

        // Directories first, each group lexicographic; pagination only after
        // the order is fixed.
        entries.sort_by(|a, b| {
            b.is_dir
                .cmp(&a.is_dir)
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        let total_count = entries.len();
        let page = paginate(entries, request.offset, limit);
        let page_ends_early = request.offset + page.len() < total_count;

        let truncation_reason = if hit_cap {
            Some(TruncationReason::ResultCap)
        } else if page_ends_early {
            Some(TruncationReason::Pagination)
        } else {
            None
        };

        Ok(ListDirResponse {
            entries: page,
            total_count,
            truncated: truncation_reason.is_some(),
            truncation_reason,
        })
    }

    async fn find_impl(
        &self,
        request: &FindFilesRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<FindFilesResponse> {
        if request.pattern.trim().is_empty() {
            return Err(ToolError::InvalidArgument("pattern must not be empty".into()));
        }
        Self::check_max_depth(request.max_depth)?;
        let limit = self.page_limit(request.limit)?;
        let search_dir = self.resolve_dir(&request.search_path)?;

        let mut cmd = self.finder_command(&request.pattern, &search_dir, request.max_depth);
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        debug!(program = ?self.finder, pattern = %request.pattern, "running file search");
        let program = match self.finder {
            FinderProgram::Fd => "fd",
            FinderProgram::Find => "find",
        };
        let output = tokio::select! {
            output = cmd.output() => output.map_err(|e| ToolError::Spawn {
                program: program.to_string(),
                source: e,
            })?,
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
        };

        // find(1) exits 0 with no matches; fd fails fast on malformed globs
        // and its stderr names the problem.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::InvalidArgument(format!(
                "{program} failed: {}",
                stderr.trim()
            )));
        }

        let mut matches = Vec::new();
        let mut hit_cap = false;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if line.is_empty() {
                continue;
            }
            if matches.len() >= self.params.find_result_cap {
                hit_cap = true;
                break;
            }
            let Some(relative) = self.to_workspace_relative(line, search_dir.as_path()) else {
                continue;
            };
            if !request.include_ignored && self.ignore.is_ignored(&relative, false) {
                continue;
            }
            matches.push(relative);
        }

        matches.sort();

        let total_count = matches.len();
        let page = paginate(matches, request.offset, limit);
        let truncated = hit_cap || request.offset + page.len() < total_count;

        Ok(FindFilesResponse {
            matches: page,
            total_count,
            truncated,
        })
    }

    /// Build the matcher invocation. The pattern is always one literal argv
    /// element.
    fn finder_command(
        &self,
        pattern: &str,
        search_dir: &ResolvedPath,
        max_depth: i64,
    ) -> tokio::process::Command {
        match self.finder {
            FinderProgram::Fd => {
                let mut cmd = tokio::process::Command::new("fd");
                cmd.arg("--glob")
                    .arg("--color=never")
                    .arg("--hidden")
                    .arg("--no-ignore");
                if max_depth >= 0 {
                    cmd.arg("--max-depth").arg((max_depth + 1).to_string());
                }
                cmd.arg(pattern).arg(search_dir.as_path());
                cmd
            }
            FinderProgram::Find => {
                let mut cmd = tokio::process::Command::new("find");
                cmd.arg(search_dir.as_path());
                if max_depth >= 0 {
                    cmd.arg("-maxdepth").arg((max_depth + 1).to_string());
                }
                cmd.arg("-mindepth").arg("1").arg("-name").arg(pattern);
                cmd
            }
        }
    }

    /// Convert one matcher output line to a workspace-relative slash path.
    fn to_workspace_relative(&self, line: &str, search_dir: &Path) -> Option<String> {
        let path = Path::new(line);
        let absolute: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            search_dir.join(path)
        };
        let stripped = absolute.strip_prefix(self.resolver.root()).ok()?;
        let parts: Vec<&str> = stripped
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(os) => os.to_str(),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

/// State of one in-flight List walk.
struct Walk<'a> {
    resolver: &'a PathResolver,
    ignore: &'a dyn IgnoreRulesPort,
    include_ignored: bool,
    max_depth: i64,
    cap: usize,
    cancel: &'a CancellationToken,
    entries: Vec<DirectoryEntry>,
    /// Canonicalized directories already descended into.
    visited: HashSet<PathBuf>,
    hit_cap: bool,
}

impl Walk<'_> {
    /// Recursively collect `dir`'s entries. `level` is the depth of the
    /// entries being produced (the starting directory's children are 0).
    fn descend(&mut self, dir: &Path, level: i64) -> ToolResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let canonical = match dir.canonicalize() {
            Ok(canonical) => canonical,
            // A directory that vanished mid-walk is skipped, not fatal
            Err(_) => return Ok(()),
        };
        if !self.visited.insert(canonical) {
            return Ok(());
        }

        let read = fs::read_dir(dir)
            .map_err(|e| ToolError::io("read directory", dir.display().to_string(), e))?;
        let mut children: Vec<fs::DirEntry> = Vec::new();
        for child in read {
            children.push(
                child.map_err(|e| ToolError::io("read directory", dir.display().to_string(), e))?,
            );
        }
        // Name order inside each directory keeps cap-limited collection
        // stable between identical calls.
        children.sort_by_key(fs::DirEntry::file_name);

        for child in children {
            if self.hit_cap {
                return Ok(());
            }
            let path = child.path();
            let relative = match path.strip_prefix(self.resolver.root()) {
                Ok(stripped) => stripped.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"),
                Err(_) => continue,
            };

            // A symlink to a directory is itself a directory for recursion
            let is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);

            if !self.include_ignored && self.ignore.is_ignored(&relative, is_dir) {
                continue;
            }

            self.entries.push(DirectoryEntry::new(relative, is_dir));
            if self.entries.len() >= self.cap {
                self.hit_cap = true;
                return Ok(());
            }

            let descend_further = self.max_depth == -1 || level < self.max_depth;
            if is_dir && descend_further {
                self.descend(&path, level + 1)?;
            }
        }
        Ok(())
    }
}

/// Slice out one page of an already-sorted result set.
fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl DirectoryToolsPort for DirectoryTools {
    async fn list_dir(
        &self,
        request: &ListDirRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<ListDirResponse> {
        self.list_impl(request, cancel)
    }

    async fn find_files(
        &self,
        request: &FindFilesRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<FindFilesResponse> {
        self.find_impl(request, cancel).await
    }
}
