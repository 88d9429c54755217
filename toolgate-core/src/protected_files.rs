//! Inode-keyed protection for a small, fixed set of sensitive files.
//!
//! A file is protected if its basename matches an exact/prefix pattern, its
//! normalized path matches a `**/`-style glob, or its native identity is in
//! the inode cache. The cache exists so that a protected file reached via a
//! different relative path, a rename, or a hard link still hits.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use regex::Regex;

use toolgate_commons::paths::normalize_for_glob;

const EXACT_BASENAMES: &[&str] = &["ralph.config.json", ".env"];
const PREFIX_BASENAMES: &[&str] = &[".env."];
const PATH_GLOBS: &[&str] = &[
    "**/ralph.config.json",
    "**/.env",
    "**/.env.*",
    "**/.ralph/config.json",
];
const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeIdentity {
    pub device: u64,
    pub inode: u64,
}

#[derive(Debug, Clone)]
pub struct ProtectedInode {
    pub identity: NativeIdentity,
    pub original_path: String,
}

fn compile_globs(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            let escaped = regex::escape(pattern);
            let translated = escaped.replace(r"\*\*/", ".*").replace(r"\*", "[^/]*");
            let anchored = if cfg!(windows) {
                format!("(?i)^{}$", translated)
            } else {
                format!("^{}$", translated)
            };
            Regex::new(&anchored)
                .map_err(|error| {
                    tracing::warn!(%error, %pattern, "ignoring invalid protected-file glob");
                    error
                })
                .ok()
        })
        .collect()
}

/// Process-wide cache of protected inodes plus the fixed pattern set.
pub struct ProtectedFiles {
    globs: Vec<Regex>,
    inodes: HashSet<ProtectedInodeKey>,
    last_refresh: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProtectedInodeKey(u64, u64);

impl Default for ProtectedFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectedFiles {
    pub fn new() -> Self {
        Self {
            globs: compile_globs(PATH_GLOBS),
            inodes: HashSet::new(),
            last_refresh: None,
        }
    }

    /// `true` if `path` matches a protection rule. Normalization failure
    /// falls back to a basename-only check (conservative over-protection).
    pub fn is_protected(&mut self, path: &Path) -> bool {
        self.refresh_if_stale();

        let Some(basename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };
        let basename_check = || {
            EXACT_BASENAMES.iter().any(|candidate| {
                if cfg!(windows) {
                    basename.eq_ignore_ascii_case(candidate)
                } else {
                    basename == *candidate
                }
            }) || PREFIX_BASENAMES.iter().any(|prefix| {
                if cfg!(windows) {
                    basename.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase())
                } else {
                    basename.starts_with(prefix)
                }
            })
        };

        if basename_check() {
            return true;
        }

        let normalized = normalize_for_glob(path);
        if self.globs.iter().any(|glob| glob.is_match(&normalized)) {
            return true;
        }

        if let Ok(metadata) = std::fs::metadata(path) {
            if let Some(key) = native_identity(&metadata) {
                if self.inodes.contains(&key) {
                    return true;
                }
            }
        }

        false
    }

    fn refresh_if_stale(&mut self) {
        let stale = match self.last_refresh {
            Some(when) => when.elapsed() >= REFRESH_INTERVAL,
            None => true,
        };
        if stale {
            self.refresh();
        }
    }

    /// Rebuilds the inode cache by walking the current directory plus up to
    /// three parent directories and the filesystem root. Must be called
    /// immediately before processing any batch of tool calls so that files
    /// created mid-session are protected.
    pub fn force_refresh(&mut self) {
        self.refresh();
    }

    fn refresh(&mut self) {
        self.inodes.clear();
        let Ok(cwd) = std::env::current_dir() else {
            self.last_refresh = Some(Instant::now());
            return;
        };

        let mut candidates: Vec<std::path::PathBuf> = Vec::new();
        let mut current = Some(cwd.as_path());
        for _ in 0..4 {
            let Some(dir) = current else { break };
            candidates.push(dir.to_path_buf());
            current = dir.parent();
        }
        // Keep climbing past the fixed cwd+3-parents walk above until the
        // filesystem root is reached, however deeply `cwd` is nested.
        while let Some(dir) = current {
            candidates.push(dir.to_path_buf());
            current = dir.parent();
        }

        for dir in candidates {
            for basename in EXACT_BASENAMES {
                let candidate = dir.join(basename);
                if let Ok(metadata) = std::fs::metadata(&candidate) {
                    if let Some(key) = native_identity(&metadata) {
                        self.inodes.insert(key);
                        tracing::debug!(path = %candidate.display(), "protected inode discovered");
                    }
                }
            }
        }

        self.last_refresh = Some(Instant::now());
    }
}

#[cfg(unix)]
fn native_identity(metadata: &std::fs::Metadata) -> Option<ProtectedInodeKey> {
    use std::os::unix::fs::MetadataExt;
    Some(ProtectedInodeKey(metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn native_identity(_metadata: &std::fs::Metadata) -> Option<ProtectedInodeKey> {
    None
}
