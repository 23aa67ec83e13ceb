//! Sandboxed file primitives exposed to the model.
//!
//! Every operation resolves its path through [`WorkingRoot::resolve`] and
//! refuses uncontained paths. No operation panics or propagates an unhandled
//! fault: each failure path returns a descriptive [`ToolError`] that the
//! registry flattens into the result string the model sees.

use std::fs;
use std::io::{ErrorKind as IoErrorKind, Read};

use tracing::debug;

use crate::core::tools::{ErrorKind, ToolError, ToolOutcome};
use crate::io::sandbox::WorkingRoot;

/// List the direct children of `directory`, one line per entry with byte
/// size and directory flag. A child that cannot be stat'ed reports size
/// `-1` instead of failing the whole listing. Empty directory yields an
/// empty string.
pub fn list_directory(root: &WorkingRoot, directory: &str) -> ToolOutcome {
    let resolved = root.resolve(directory);
    if !resolved.contained {
        return Err(ToolError::new(
            ErrorKind::OutsideRoot,
            format!("Cannot list \"{directory}\" as it is outside the permitted working directory"),
        ));
    }
    if !resolved.path.exists() {
        return Err(ToolError::new(
            ErrorKind::NotFound,
            format!("The directory \"{directory}\" was not found."),
        ));
    }
    if !resolved.path.is_dir() {
        return Err(ToolError::new(
            ErrorKind::WrongType,
            format!("\"{directory}\" is not a directory"),
        ));
    }

    let entries = match fs::read_dir(&resolved.path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == IoErrorKind::PermissionDenied => {
            return Err(ToolError::new(
                ErrorKind::PermissionDenied,
                format!("Permission denied to access \"{directory}\"."),
            ));
        }
        Err(err) => {
            return Err(ToolError::new(
                ErrorKind::Io,
                format!("An unexpected error occurred: {err}"),
            ));
        }
    };

    let mut lines = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                return Err(ToolError::new(
                    ErrorKind::Io,
                    format!("An unexpected error occurred: {err}"),
                ));
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks; a dangling link reports -1 and is_dir=false.
        let metadata = fs::metadata(entry.path()).ok();
        let is_dir = metadata.as_ref().is_some_and(fs::Metadata::is_dir);
        let size = metadata.map_or(-1, |m| i64::try_from(m.len()).unwrap_or(-1));
        lines.push(format!("- {name}: file_size={size} bytes, is_dir={is_dir}"));
    }
    debug!(directory, entries = lines.len(), "listed directory");
    Ok(lines.join("\n"))
}

/// Read up to `max_chars` characters of a text file, appending a truncation
/// marker when the content is longer. The unit is Unicode scalar values
/// throughout, including the limit named in the marker.
///
/// Only the read window is decoded: bytes past what `max_chars + 1`
/// characters can occupy are never read, and undecodable bytes beyond the
/// returned prefix do not make the file "not text".
pub fn read_file(root: &WorkingRoot, file_path: &str, max_chars: usize) -> ToolOutcome {
    let resolved = root.resolve(file_path);
    if !resolved.contained {
        return Err(ToolError::new(
            ErrorKind::OutsideRoot,
            format!("Cannot read \"{file_path}\" as it is outside the permitted working directory"),
        ));
    }
    if !resolved.path.is_file() {
        return Err(ToolError::new(
            ErrorKind::NotFound,
            format!("File not found or is not a regular file: \"{file_path}\""),
        ));
    }

    // A character occupies at most four bytes, so this is all the file can
    // contribute to max_chars + 1 characters; the rest stays unread.
    let byte_budget = (max_chars as u64).saturating_add(1).saturating_mul(4);
    let mut bytes = Vec::new();
    if let Err(err) = fs::File::open(&resolved.path)
        .and_then(|file| file.take(byte_budget).read_to_end(&mut bytes))
    {
        if err.kind() == IoErrorKind::PermissionDenied {
            return Err(ToolError::new(
                ErrorKind::PermissionDenied,
                format!("Permission denied to read \"{file_path}\"."),
            ));
        }
        return Err(ToolError::new(
            ErrorKind::Io,
            format!("An unexpected error occurred: {err}"),
        ));
    }

    let content = match std::str::from_utf8(&bytes) {
        Ok(content) => content,
        Err(err) => {
            // A valid prefix longer than max_chars puts the bad bytes past
            // everything the caller gets back, so the read still succeeds.
            let prefix = std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default();
            if prefix.chars().count() <= max_chars {
                return Err(ToolError::new(
                    ErrorKind::NotText,
                    format!("Could not read \"{file_path}\" as it is not a text file."),
                ));
            }
            prefix
        }
    };

    if content.chars().count() > max_chars {
        let mut truncated: String = content.chars().take(max_chars).collect();
        truncated.push_str(&format!(
            "[...File \"{file_path}\" truncated at {max_chars} characters]"
        ));
        debug!(file_path, max_chars, "read file (truncated)");
        return Ok(truncated);
    }
    debug!(file_path, chars = content.chars().count(), "read file");
    Ok(content.to_string())
}

/// Create or fully overwrite a file, creating missing parent directories
/// under the root as needed. No append or partial-write semantics.
pub fn write_file(root: &WorkingRoot, file_path: &str, content: &str) -> ToolOutcome {
    let resolved = root.resolve(file_path);
    if !resolved.contained {
        return Err(ToolError::new(
            ErrorKind::OutsideRoot,
            format!(
                "Cannot write to \"{file_path}\" as it is outside the permitted working directory"
            ),
        ));
    }

    if let Some(parent) = resolved.path.parent()
        && let Err(err) = fs::create_dir_all(parent)
    {
        return Err(write_error(file_path, &err));
    }

    match fs::write(&resolved.path, content) {
        Ok(()) => {
            let chars = content.chars().count();
            debug!(file_path, chars, "wrote file");
            Ok(format!(
                "Successfully wrote to \"{file_path}\" ({chars} characters written)"
            ))
        }
        Err(err) => Err(write_error(file_path, &err)),
    }
}

fn write_error(file_path: &str, err: &std::io::Error) -> ToolError {
    if err.kind() == IoErrorKind::PermissionDenied {
        ToolError::new(
            ErrorKind::PermissionDenied,
            format!("Permission denied to write \"{file_path}\"."),
        )
    } else {
        ToolError::new(
            ErrorKind::Io,
            format!("An unexpected error occurred: {err}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> (tempfile::TempDir, WorkingRoot) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = WorkingRoot::new(temp.path()).expect("working root");
        (temp, root)
    }

    #[test]
    fn list_reports_file_and_directory() {
        let (temp, root) = root();
        fs::write(temp.path().join("main.py"), "print(1)\n").expect("write");
        fs::create_dir(temp.path().join("pkg")).expect("mkdir");

        let listing = list_directory(&root, ".").expect("listing");
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(
            lines
                .iter()
                .any(|l| *l == "- main.py: file_size=9 bytes, is_dir=false")
        );
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("- pkg: file_size=") && l.ends_with("is_dir=true"))
        );
    }

    #[test]
    fn list_of_empty_directory_is_empty_string() {
        let (_temp, root) = root();
        assert_eq!(list_directory(&root, ".").expect("listing"), "");
    }

    #[test]
    fn list_errors_name_the_original_path() {
        let (temp, root) = root();
        fs::write(temp.path().join("main.py"), "").expect("write");

        let err = list_directory(&root, "missing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.detail, "The directory \"missing\" was not found.");

        let err = list_directory(&root, "main.py").unwrap_err();
        assert_eq!(err.kind, ErrorKind::WrongType);
        assert_eq!(err.detail, "\"main.py\" is not a directory");
    }

    #[test]
    fn relative_and_absolute_escapes_are_the_same_error_class() {
        let (_temp, root) = root();
        let relative = list_directory(&root, "../").unwrap_err();
        let absolute = list_directory(&root, "/bin").unwrap_err();
        assert_eq!(relative.kind, ErrorKind::OutsideRoot);
        assert_eq!(absolute.kind, ErrorKind::OutsideRoot);
        assert_eq!(
            relative.to_string(),
            "Error: Cannot list \"../\" as it is outside the permitted working directory"
        );
        assert_eq!(
            absolute.to_string(),
            "Error: Cannot list \"/bin\" as it is outside the permitted working directory"
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_temp, root) = root();
        let content = "def add(a, b):\n    return a + b\n";
        let confirmation = write_file(&root, "pkg/calc.py", content).expect("write");
        assert_eq!(
            confirmation,
            format!(
                "Successfully wrote to \"pkg/calc.py\" ({} characters written)",
                content.chars().count()
            )
        );
        assert_eq!(read_file(&root, "pkg/calc.py", 10_000).expect("read"), content);
    }

    #[test]
    fn write_overwrites_existing_content() {
        let (_temp, root) = root();
        write_file(&root, "out.txt", "old content").expect("write");
        write_file(&root, "out.txt", "new").expect("overwrite");
        assert_eq!(read_file(&root, "out.txt", 10_000).expect("read"), "new");
    }

    #[test]
    fn write_outside_root_is_refused() {
        let (_temp, root) = root();
        let err = write_file(&root, "../escape.txt", "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutsideRoot);
        assert_eq!(
            err.detail,
            "Cannot write to \"../escape.txt\" as it is outside the permitted working directory"
        );
    }

    #[test]
    fn read_truncates_at_exactly_max_chars() {
        let (_temp, root) = root();
        let content = "x".repeat(150);
        write_file(&root, "long.txt", &content).expect("write");

        let max_chars = 100;
        let result = read_file(&root, "long.txt", max_chars).expect("read");
        let marker = format!("[...File \"long.txt\" truncated at {max_chars} characters]");
        assert_eq!(result.chars().count(), max_chars + marker.chars().count());
        assert!(result.starts_with(&content[..max_chars]));
        assert!(result.ends_with(&marker));
    }

    #[test]
    fn read_at_the_limit_is_verbatim() {
        let (_temp, root) = root();
        write_file(&root, "exact.txt", "abcde").expect("write");
        assert_eq!(read_file(&root, "exact.txt", 5).expect("read"), "abcde");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let (_temp, root) = root();
        // 10 two-byte characters.
        let content = "é".repeat(10);
        write_file(&root, "multi.txt", &content).expect("write");

        let result = read_file(&root, "multi.txt", 4).expect("read");
        assert!(result.starts_with("éééé"));
        assert!(!result.starts_with("ééééé"));
        assert!(result.ends_with("[...File \"multi.txt\" truncated at 4 characters]"));
    }

    #[test]
    fn undecodable_bytes_past_the_window_still_truncate() {
        let (temp, root) = root();
        let mut bytes = vec![b'a'; 200];
        bytes.extend([0xff, 0xfe]);
        fs::write(temp.path().join("mixed.log"), &bytes).expect("write");

        let result = read_file(&root, "mixed.log", 100).expect("read");
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.ends_with("[...File \"mixed.log\" truncated at 100 characters]"));
    }

    #[test]
    fn undecodable_bytes_inside_the_window_are_not_text() {
        let (temp, root) = root();
        let mut bytes = vec![b'a'; 50];
        bytes.push(0xff);
        fs::write(temp.path().join("partial.bin"), &bytes).expect("write");

        let err = read_file(&root, "partial.bin", 100).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotText);
        assert_eq!(
            err.detail,
            "Could not read \"partial.bin\" as it is not a text file."
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_child_lists_as_directory() {
        let (temp, root) = root();
        fs::create_dir(temp.path().join("target_dir")).expect("mkdir");
        std::os::unix::fs::symlink(temp.path().join("target_dir"), temp.path().join("link"))
            .expect("symlink");

        let listing = list_directory(&root, ".").expect("listing");
        assert!(
            listing
                .lines()
                .any(|l| l.starts_with("- link: ") && l.ends_with("is_dir=true"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_child_reports_unknown_size() {
        let (temp, root) = root();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling"))
            .expect("symlink");

        let listing = list_directory(&root, ".").expect("listing");
        assert!(
            listing
                .lines()
                .any(|l| l == "- dangling: file_size=-1 bytes, is_dir=false")
        );
    }

    #[test]
    fn read_of_non_utf8_content_is_not_a_text_file() {
        let (temp, root) = root();
        fs::write(temp.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).expect("write");

        let err = read_file(&root, "blob.bin", 10_000).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotText);
        assert_eq!(
            err.detail,
            "Could not read \"blob.bin\" as it is not a text file."
        );
    }

    #[test]
    fn read_of_missing_or_non_regular_file_is_not_found() {
        let (temp, root) = root();
        fs::create_dir(temp.path().join("dir")).expect("mkdir");

        for path in ["missing.txt", "dir"] {
            let err = read_file(&root, path, 10_000).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NotFound);
            assert_eq!(
                err.detail,
                format!("File not found or is not a regular file: \"{path}\"")
            );
        }
    }

    #[test]
    fn read_outside_root_uses_read_wording() {
        let (_temp, root) = root();
        let err = read_file(&root, "/bin", 10_000).unwrap_err();
        assert_eq!(
            err.detail,
            "Cannot read \"/bin\" as it is outside the permitted working directory"
        );
    }
}
