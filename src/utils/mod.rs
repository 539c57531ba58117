//! Utility functions and helpers

use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `content`, truncated to `len` characters
pub fn content_hash(content: &[u8], len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(len);
    hash
}

/// Path of `to` relative to the directory `from_dir`, with `/` separators.
///
/// Both arguments are output-relative paths; an empty `from_dir` is the
/// output root.
pub fn relative_path(from_dir: &str, to: &str) -> String {
    let from_dir = clean_path(from_dir);
    let to = clean_path(to);

    pathdiff::diff_paths(Path::new(&to), Path::new(&from_dir))
        .map(|p| path_to_module_id(&p))
        .unwrap_or(to)
}

/// Clean a path by removing . and .. components.
///
/// A relative path that climbs above its start keeps its leading `..`.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !absolute => parts.push(".."),
                _ => {}
            },
            _ => parts.push(part),
        }
    }

    if absolute {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

/// Convert a file path to a module identity
pub fn path_to_module_id(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(b"hello world", 8), "b94d27b9");
        assert_eq!(content_hash(b"hello world", 100).len(), 64);
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./foo/bar"), "foo/bar");
        assert_eq!(clean_path("foo/../bar"), "bar");
        assert_eq!(clean_path("/foo/./bar/../baz"), "/foo/baz");
        assert_eq!(clean_path("."), "");
        assert_eq!(clean_path("../x"), "../x");
        assert_eq!(clean_path("a/../../b/./c"), "../b/c");
        assert_eq!(clean_path("/../x"), "/x");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("", "common-0.css"), "common-0.css");
        assert_eq!(relative_path("css", "common-0.css"), "../common-0.css");
        assert_eq!(relative_path("css/pages", "css/common-0.css"), "../common-0.css");
        assert_eq!(relative_path("./css", "css/shared/common-0.css"), "shared/common-0.css");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_duration() {
        use std::time::Duration;

        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f64(1.5)), "1.50s");
    }
}
