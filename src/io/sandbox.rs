//! Path containment for the sandboxed working root.
//!
//! Every filesystem-touching tool resolves its caller-supplied path here
//! before doing anything else. Resolution never fails; an uncontained result
//! is the signal, and the caller translates it into a tool-specific error
//! naming the path exactly as the caller gave it.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, ensure};

/// The fixed directory all tool operations are confined to. Canonicalized
/// once at construction and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct WorkingRoot {
    root: PathBuf,
}

/// Canonical form of a caller-supplied path plus its containment verdict.
/// Computed fresh per call; never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub contained: bool,
}

impl WorkingRoot {
    /// The root must exist and be a directory.
    pub fn new(path: &Path) -> Result<Self> {
        let root = std::fs::canonicalize(path)
            .with_context(|| format!("canonicalize working root {}", path.display()))?;
        ensure!(
            root.is_dir(),
            "working root {} is not a directory",
            root.display()
        );
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied path against the root and decide containment.
    ///
    /// An absolute input replaces the root rather than being rebased under
    /// it, so `/bin` resolves to `/bin` and fails containment instead of
    /// silently becoming `<root>/bin`. The root itself counts as contained.
    pub fn resolve(&self, relative: &str) -> ResolvedPath {
        let joined = self.root.join(relative);
        let path = canonicalize_best_effort(&joined);
        let contained = path.starts_with(&self.root);
        ResolvedPath { path, contained }
    }
}

/// Canonicalize through the deepest existing ancestor. The missing tail is
/// normalized lexically first, so `..` cannot sneak past a prefix that does
/// not exist yet (write targets are resolved before they are created).
fn canonicalize_best_effort(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    if let Ok(canonical) = std::fs::canonicalize(&normalized) {
        return canonical;
    }

    let mut existing = normalized.clone();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    while !existing.exists() {
        match existing.file_name() {
            Some(name) => {
                tail.push(name.to_os_string());
                if !existing.pop() {
                    break;
                }
            }
            None => break,
        }
    }

    let mut base = std::fs::canonicalize(&existing).unwrap_or(existing);
    for segment in tail.iter().rev() {
        base.push(segment);
    }
    base
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn root() -> (tempfile::TempDir, WorkingRoot) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = WorkingRoot::new(temp.path()).expect("working root");
        (temp, root)
    }

    #[test]
    fn root_itself_is_contained() {
        let (_temp, root) = root();
        let resolved = root.resolve(".");
        assert!(resolved.contained);
        assert_eq!(resolved.path, root.path());
    }

    #[test]
    fn nested_existing_path_is_contained() {
        let (temp, root) = root();
        fs::create_dir(temp.path().join("pkg")).expect("mkdir");
        fs::write(temp.path().join("pkg/mod.py"), "x = 1\n").expect("write");

        let resolved = root.resolve("pkg/mod.py");
        assert!(resolved.contained);
        assert!(resolved.path.ends_with("pkg/mod.py"));
    }

    #[test]
    fn missing_path_is_still_contained() {
        let (_temp, root) = root();
        let resolved = root.resolve("new/dir/out.txt");
        assert!(resolved.contained);
        assert!(resolved.path.starts_with(root.path()));
    }

    #[test]
    fn parent_traversal_escapes() {
        let (_temp, root) = root();
        assert!(!root.resolve("../").contained);
        assert!(!root.resolve("a/../../other").contained);
    }

    #[test]
    fn absolute_path_outside_escapes() {
        let (_temp, root) = root();
        assert!(!root.resolve("/bin").contained);
    }

    #[test]
    fn absolute_path_inside_is_contained() {
        let (temp, root) = root();
        let inside = temp.path().join("file.txt");
        fs::write(&inside, "hi").expect("write");
        let resolved = root.resolve(inside.to_str().expect("utf8 path"));
        assert!(resolved.contained);
    }

    #[test]
    fn traversal_through_missing_prefix_escapes() {
        let (_temp, root) = root();
        let resolved = root.resolve("no_such_dir/../../escape.txt");
        assert!(!resolved.contained);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_pointing_outside_escapes() {
        let (temp, root) = root();
        let outside = tempfile::tempdir().expect("tempdir");
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).expect("symlink");

        let resolved = root.resolve("link");
        assert!(!resolved.contained);
    }
}
