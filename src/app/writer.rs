// loganon - app/writer.rs
//
// Output writing. The anonymised log is written to a uniquely named temp
// file beside the destination and renamed over it, so a failed run never
// leaves a half-written output or clobbers an existing one.

use crate::util::constants;
use crate::util::error::WriteError;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `lines` to `path` atomically (write temp, then rename).
///
/// Each line is terminated with `\n`. Parent directories are created as
/// needed. The temp file gets a unique name in the destination directory,
/// so no existing file other than `path` is ever touched. On failure the
/// temp file is removed and any existing file at `path` is left as it was.
pub fn write_lines_atomic(path: &Path, lines: &[String]) -> Result<(), WriteError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|source| WriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            parent
        }
        None => Path::new("."),
    };

    let mut prefix = OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(constants::TEMP_FILE_SUFFIX)
        .tempfile_in(dir)
        .map_err(|source| WriteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    // Dropping `tmp` on any early return deletes the temp file.
    write_all(tmp.as_file_mut(), lines).map_err(|source| WriteError::Io {
        path: tmp.path().to_path_buf(),
        source,
    })?;

    tmp.persist(path).map_err(|e| WriteError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::debug!(path = %path.display(), lines = lines.len(), "Output written");
    Ok(())
}

fn write_all(file: &mut File, lines: &[String]) -> std::io::Result<()> {
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    out.get_ref().sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_creates_parents_and_terminates_lines() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("nested").join("deeper");
        let path = parent.join("out.log");
        write_lines_atomic(&path, &lines(&["a,b", "1,2"])).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
        assert_eq!(entries(&parent), vec!["out.log"]);
    }

    #[test]
    fn test_overwrites_existing_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "old\n").unwrap();
        write_lines_atomic(&path, &lines(&["new"])).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_neighbouring_tmp_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");
        let neighbour = dir.path().join("out.log.tmp");
        std::fs::write(&neighbour, "user data").unwrap();

        write_lines_atomic(&path, &lines(&["x"])).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");
        assert_eq!(std::fs::read_to_string(&neighbour).unwrap(), "user data");
        assert_eq!(entries(dir.path()), vec!["out.log", "out.log.tmp"]);
    }

    #[test]
    fn test_failed_rename_leaves_target_and_no_temp() {
        let dir = TempDir::new().unwrap();
        let neighbour = dir.path().join("out.log.tmp");
        std::fs::write(&neighbour, "user data").unwrap();
        // A directory in the way makes the rename fail.
        let path = dir.path().join("out.log");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "k").unwrap();

        let err = write_lines_atomic(&path, &lines(&["x"])).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(path.join("keep").exists());
        assert_eq!(std::fs::read_to_string(&neighbour).unwrap(), "user data");
        assert_eq!(entries(dir.path()), vec!["out.log", "out.log.tmp"]);
    }

    #[test]
    fn test_empty_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        write_lines_atomic(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
