// loganon - platform/fs.rs
//
// Filesystem helpers used by the app layer. Core code receives readers
// and strings from here and never opens files itself.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read the first N lines of a file for format suggestion.
///
/// Invalid UTF-8 is replaced rather than failing the read, and line
/// terminators (`\n` or `\r\n`) are stripped.
pub fn read_first_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut reader = open_input(path)?;
    let mut lines = Vec::with_capacity(max_lines);
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

/// Open `path` for buffered line reading.
pub fn open_input(path: &Path) -> io::Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

/// True when `a` and `b` name the same existing file.
///
/// Paths that do not exist (yet) are compared as given.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_first_lines_strips_terminators() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.log");
        std::fs::write(&path, b"a,b\r\n1,\xff\n2,3\n").unwrap();

        let lines = read_first_lines(&path, 2).unwrap();
        assert_eq!(lines, vec!["a,b".to_string(), "1,\u{fffd}".to_string()]);
        assert_eq!(read_first_lines(&path, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_read_first_lines_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_first_lines(&dir.path().join("nope.log"), 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_same_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.log");
        std::fs::write(&path, "x").unwrap();

        let dotted = dir.path().join(".").join("in.log");
        assert!(same_file(&path, &dotted));
        assert!(!same_file(&path, &dir.path().join("out.log")));
    }
}
