//! Archive naming for rotated log files.
//!
//! The live file is `<base>`; archives are `<base>.NNN` where `NNN` is a
//! decimal sequence number zero-padded to at least three digits.

use crate::log::LogError;
use std::path::{Path, PathBuf};

/// Parses a decimal suffix: one or more ASCII digits that fit in a `u64`.
fn parse_seq(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns true if `path` already names an archive (ends in `.<digits>`).
pub fn is_archived(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once('.'))
        .and_then(|(_, suffix)| parse_seq(suffix))
        .is_some()
}

/// Extracts the sequence number of `candidate` if it is an archive of `base`.
///
/// `candidate` must be exactly `<base>.<digits>`; any trailing characters
/// after the digits disqualify it.
pub fn archive_seq(base: &str, candidate: &str) -> Option<u64> {
    candidate
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(parse_seq)
}

/// Formats the archive file name for sequence number `seq`.
pub fn archive_name(base: &str, seq: u64) -> String {
    format!("{base}.{seq:03}")
}

/// Scans the siblings of `live` and returns the path of the next archive.
///
/// The next sequence number is one past the largest existing archive suffix,
/// or 1 when none exist. Gaps are not filled.
pub fn next_archive_path(live: &Path) -> Result<PathBuf, LogError> {
    let base = live
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LogError::InvalidPath(live.to_path_buf()))?;

    let dir = match live.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut max_seq: Option<u64> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(seq) = name.to_str().and_then(|name| archive_seq(base, name)) {
            max_seq = Some(max_seq.map_or(seq, |max| max.max(seq)));
        }
    }

    let next = match max_seq {
        Some(max) => max.checked_add(1).ok_or(LogError::SequenceExhausted)?,
        None => 1,
    };

    Ok(live.with_file_name(archive_name(base, next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_archive_name_width() {
        assert_eq!(archive_name("app.log", 1), "app.log.001");
        assert_eq!(archive_name("app.log", 51), "app.log.051");
        assert_eq!(archive_name("app.log", 999), "app.log.999");
        assert_eq!(archive_name("app.log", 1000), "app.log.1000");
        assert_eq!(archive_name("app.log", 123456), "app.log.123456");
    }

    #[test]
    fn test_archive_seq_parsing() {
        assert_eq!(archive_seq("log", "log.001"), Some(1));
        assert_eq!(archive_seq("log", "log.1000"), Some(1000));
        assert_eq!(archive_seq("log", "log.7"), Some(7));

        assert_eq!(archive_seq("log", "log"), None);
        assert_eq!(archive_seq("log", "log."), None);
        assert_eq!(archive_seq("log", "log.999.z"), None);
        assert_eq!(archive_seq("log", "log.999."), None);
        assert_eq!(archive_seq("log", "log.9a9999"), None);
        assert_eq!(archive_seq("log", "log.+12"), None);
        assert_eq!(archive_seq("log", "logx.001"), None);
        assert_eq!(archive_seq("log", "other.001"), None);
        assert_eq!(archive_seq("log", "log.99999999999999999999999"), None);
    }

    #[test]
    fn test_is_archived() {
        assert!(is_archived(Path::new("/var/log/app.log.001")));
        assert!(is_archived(Path::new("app.log.1000")));

        assert!(!is_archived(Path::new("/var/log/app.log")));
        assert!(!is_archived(Path::new("app")));
        assert!(!is_archived(Path::new("app.log.001.z")));
        assert!(!is_archived(Path::new("app.")));
    }

    #[test]
    fn test_next_archive_path_scans_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("log");

        assert_eq!(next_archive_path(&live).unwrap(), temp_dir.path().join("log.001"));

        for name in ["log.003", "log.017", "log.999.z", "log.", "log.9a9999", "logger.500"] {
            File::create(temp_dir.path().join(name)).unwrap();
        }

        assert_eq!(next_archive_path(&live).unwrap(), temp_dir.path().join("log.018"));
    }

    #[test]
    fn test_next_archive_path_exhausted() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("log");
        File::create(temp_dir.path().join(format!("log.{}", u64::MAX))).unwrap();

        let result = next_archive_path(&live);
        assert!(matches!(result, Err(LogError::SequenceExhausted)));
    }
}
