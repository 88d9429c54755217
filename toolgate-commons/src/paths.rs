use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components lexically, without touching the filesystem.
///
/// Used wherever a path needs comparing before it can be canonicalized (e.g. a
/// path that does not exist yet).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Normalize a path the way the protected-files glob matcher wants it: forward
/// slashes throughout, and on Windows a folded-lowercase drive prefix
/// (`C:\foo` -> `/c/foo`) so glob patterns never need to special-case drive
/// letters.
pub fn normalize_for_glob(path: &Path) -> String {
    let normalized = normalize_path(path);
    let mut text = normalized.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        text = text.to_ascii_lowercase();
        if text.len() >= 2 && text.as_bytes()[1] == b':' {
            text = format!("/{}{}", &text[0..1], &text[2..]);
        }
    }
    text
}

/// Split a path into `(parent, file_name)`, failing only if the path has no
/// file name component at all (e.g. `/`).
pub fn split_parent_and_name(path: &Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Some((parent, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_collapses_parent_dirs() {
        let normalized = normalize_path(Path::new("/a/b/../c/./d"));
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn split_parent_and_name_basic() {
        let (parent, name) = split_parent_and_name(Path::new("/work/src/main.rs")).unwrap();
        assert_eq!(parent, PathBuf::from("/work/src"));
        assert_eq!(name, "main.rs");
    }

    #[test]
    fn split_parent_and_name_rejects_root() {
        assert!(split_parent_and_name(Path::new("/")).is_none());
    }
}
