//! Purpose: Validated, ordered collection of paths to wait on.
//! Exports: `WatchSet`.
//! Role: Input boundary for every wait operation.
//! Invariants: Never empty; no entry is an empty path.
//! Invariants: Duplicates are kept and counted independently.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WatchSet {
    paths: Vec<PathBuf>,
}

impl WatchSet {
    pub fn new<I, P>(paths: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("watch set is empty")
                .with_hint("Pass at least one path to wait for."));
        }
        if let Some(index) = paths.iter().position(|path| path.as_os_str().is_empty()) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("watch set entry {index} is an empty path")));
        }
        Ok(Self { paths })
    }

    pub fn single(path: impl Into<PathBuf>) -> Result<Self, Error> {
        Self::new([path.into()])
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Entries that are currently regular files (symlinks followed).
    pub fn regular_files(&self) -> Vec<&Path> {
        self.iter().filter(|path| path.is_file()).collect()
    }

    pub fn count_existing(&self) -> usize {
        self.iter().filter(|path| path.exists()).count()
    }

    pub(crate) fn describe(&self, noun: &str) -> String {
        match self.paths.as_slice() {
            [only] => format!("{noun} \"{}\"", only.display()),
            many => format!("{} {noun}s", many.len()),
        }
    }
}

impl TryFrom<Vec<PathBuf>> for WatchSet {
    type Error = Error;

    fn try_from(paths: Vec<PathBuf>) -> Result<Self, Self::Error> {
        Self::new(paths)
    }
}

impl TryFrom<&str> for WatchSet {
    type Error = Error;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::single(path)
    }
}

impl TryFrom<&Path> for WatchSet {
    type Error = Error;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        Self::single(path)
    }
}

#[cfg(test)]
mod tests {
    use super::WatchSet;
    use crate::core::error::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn empty_set_is_rejected() {
        let err = WatchSet::new(Vec::<PathBuf>::new()).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn empty_entry_is_rejected() {
        let err = WatchSet::new(["a", ""]).expect_err("empty entry");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.message(), Some("watch set entry 1 is an empty path"));
    }

    #[test]
    fn duplicates_are_counted_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("out.mif");
        std::fs::write(&file, b"x").expect("write");

        let set = WatchSet::new([&file, &file]).expect("set");
        assert_eq!(set.len(), 2);
        assert_eq!(set.count_existing(), 2);
        assert_eq!(set.regular_files().len(), 2);
    }

    #[test]
    fn regular_files_skip_directories_and_missing_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").expect("write");
        let missing = dir.path().join("missing");

        let set = WatchSet::new([dir.path(), file.as_path(), missing.as_path()]).expect("set");
        assert_eq!(set.count_existing(), 2);
        assert_eq!(set.regular_files(), vec![file.as_path()]);
    }

    #[test]
    fn describe_uses_path_for_single_entry() {
        let set = WatchSet::try_from("/tmp/out.mif").expect("set");
        assert_eq!(set.describe("new item"), "new item \"/tmp/out.mif\"");

        let set = WatchSet::new(["a", "b", "c"]).expect("set");
        assert_eq!(set.describe("new file"), "3 new files");
    }
}
