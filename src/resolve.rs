//! Destination resolution: turning a rule's destination spec into one
//! concrete file path against the live filesystem.
//!
//! Resolution is recomputed per submission; directory contents change
//! between calls, so nothing here is cached.

use crate::matcher::Matcher;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where a rule (or the default) wants entries written.
pub enum DestinationSpec {
    /// A fixed file; the writer may create it and its parents.
    File(PathBuf),
    /// The most recently modified candidate in a directory, optionally
    /// filtered by a filename pattern. Never auto-created.
    Directory {
        dir: PathBuf,
        file_match: Option<Box<dyn Matcher>>,
    },
}

impl DestinationSpec {
    pub fn describe(&self) -> String {
        match self {
            DestinationSpec::File(path) => path.display().to_string(),
            DestinationSpec::Directory { dir, file_match } => match file_match {
                Some(matcher) => format!("{}/ matching {:?}", dir.display(), matcher.pattern()),
                None => format!("{}/ (newest file)", dir.display()),
            },
        }
    }
}

/// A concrete target for one write.
#[derive(Debug)]
pub struct ResolvedDestination {
    pub path: PathBuf,
    /// Directory-mode targets must already exist; a fixed path may be
    /// created on first write.
    pub must_exist: bool,
}

/// Resolve `spec` to a writable file, or fail with the reason a candidate
/// could not be picked.
pub fn resolve(spec: &DestinationSpec) -> Result<ResolvedDestination> {
    match spec {
        DestinationSpec::File(path) => Ok(ResolvedDestination {
            path: path.clone(),
            must_exist: false,
        }),
        DestinationSpec::Directory { dir, file_match } => {
            let path = newest_matching_file(dir, file_match.as_deref())?;
            Ok(ResolvedDestination {
                path,
                must_exist: true,
            })
        }
    }
}

fn newest_matching_file(dir: &Path, file_match: Option<&dyn Matcher>) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(anyhow!("directory {} not found", dir.display()));
    }
    let entries =
        fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;

    // (mtime, filename) so one sort gives mtime-desc with filename-desc
    // breaking exact ties.
    let mut candidates: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if !metadata.is_file() {
            continue;
        }
        if let Some(matcher) = file_match {
            if !matcher.is_match(&name) {
                continue;
            }
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, name, entry.path()));
    }

    if candidates.is_empty() {
        return Err(match file_match {
            Some(matcher) => anyhow!(
                "no file in {} matched pattern {:?}",
                dir.display(),
                matcher.pattern()
            ),
            None => anyhow!("no candidate file in {}", dir.display()),
        });
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    let (_, _, path) = candidates.remove(0);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RegexMatcher;
    use std::fs::{File, FileTimes};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, modified: SystemTime) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_times(FileTimes::new().set_modified(modified))
            .unwrap();
        path
    }

    fn spec(dir: &Path, pattern: Option<&str>) -> DestinationSpec {
        DestinationSpec::Directory {
            dir: dir.to_path_buf(),
            file_match: pattern
                .map(|p| Box::new(RegexMatcher::compile(p).unwrap()) as Box<dyn Matcher>),
        }
    }

    #[test]
    fn fixed_path_always_resolves() {
        let resolved = resolve(&DestinationSpec::File(PathBuf::from("/tmp/never/made.md")))
            .unwrap();
        assert!(!resolved.must_exist);
        assert_eq!(resolved.path, PathBuf::from("/tmp/never/made.md"));
    }

    #[test]
    fn picks_most_recently_modified_match() {
        let tmp = TempDir::new().unwrap();
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let t2 = t1 + Duration::from_secs(60);
        touch(tmp.path(), "a-2024-01-01.md", t1);
        let newer = touch(tmp.path(), "a-2024-01-02.md", t2);
        touch(tmp.path(), "unrelated.txt", t2 + Duration::from_secs(60));

        let resolved = resolve(&spec(tmp.path(), Some(r"^a-\d{4}-\d{2}-\d{2}\.md$"))).unwrap();
        assert_eq!(resolved.path, newer);
        assert!(resolved.must_exist);
    }

    #[test]
    fn equal_mtimes_break_ties_by_filename_descending() {
        let tmp = TempDir::new().unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(tmp.path(), "a.md", t);
        let expected = touch(tmp.path(), "b.md", t);

        let resolved = resolve(&spec(tmp.path(), None)).unwrap();
        assert_eq!(resolved.path, expected);
    }

    #[test]
    fn hidden_files_and_subdirectories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(tmp.path(), ".hidden.md", t + Duration::from_secs(60));
        fs::create_dir(tmp.path().join("sub.md")).unwrap();
        let expected = touch(tmp.path(), "plain.md", t);

        let resolved = resolve(&spec(tmp.path(), None)).unwrap();
        assert_eq!(resolved.path, expected);
    }

    #[test]
    fn missing_directory_is_a_descriptive_failure() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone");
        let err = resolve(&spec(&gone, None)).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn empty_filtered_set_is_a_descriptive_failure() {
        let tmp = TempDir::new().unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(tmp.path(), "notes.txt", t);
        let err = resolve(&spec(tmp.path(), Some(r"\.md$"))).unwrap_err();
        assert!(format!("{err:#}").contains("no file"));
    }
}
