use chrono::NaiveDate;
use log::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The extension of reference frames.
pub const FRAME_EXTENSION: &str = "jpg";

/// The reference frames of every day, stored as `<root>/<YYYYMMDD>/<identity>.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y%m%d").to_string())
    }

    /// Lists the frames of a day, keyed by file name.
    ///
    /// Only a day directory that cannot be read is an error; unreadable entries are skipped.
    pub fn frames(&self, date: NaiveDate) -> io::Result<BTreeMap<String, PathBuf>> {
        let entries = fs::read_dir(self.day_dir(date))?;
        Ok(collect_frames(entries.map(|entry| entry.map(|entry| entry.path()))))
    }
}

fn collect_frames(
    paths: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> BTreeMap<String, PathBuf> {
    let mut frames = BTreeMap::new();
    for path in paths {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if !path.is_file() || !is_frame(&path) {
            continue;
        }
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => {
                frames.insert(name.to_owned(), path);
            }
            None => warn!("skipping frame with a non UTF-8 name: {}", path.display()),
        }
    }
    frames
}

/// Checks for the frame extension, ignoring case.
pub fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| {
            extension.eq_ignore_ascii_case(FRAME_EXTENSION)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_frames() {
        assert!(is_frame(Path::new("/f/cam-11.jpg")));
        assert!(is_frame(Path::new("CAM.JPG")));
        assert!(!is_frame(Path::new("cam.jpeg")));
        assert!(!is_frame(Path::new("cam.mkv")));
        assert!(!is_frame(Path::new("jpg")));
    }

    #[test]
    fn lists_frames_of_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let day = store.day_dir(date);
        assert_eq!(day, dir.path().join("20240102"));

        fs::create_dir_all(day.join("nested.jpg")).unwrap();
        fs::write(day.join("cam1.jpg"), b"").unwrap();
        fs::write(day.join("cam2.JPG"), b"").unwrap();
        fs::write(day.join("cam1-11.mkv"), b"").unwrap();

        let frames = store.frames(date).unwrap();
        let names: Vec<&str> = frames.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["cam1.jpg", "cam2.JPG"]);
        assert_eq!(frames["cam1.jpg"], day.join("cam1.jpg"));
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cam1.jpg"), b"").unwrap();
        fs::write(dir.path().join("cam2.jpg"), b"").unwrap();
        let frames = collect_frames(vec![
            Ok(dir.path().join("cam1.jpg")),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(dir.path().join("cam2.jpg")),
        ]);
        let names: Vec<&str> = frames.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["cam1.jpg", "cam2.jpg"]);
    }

    #[test]
    fn missing_day_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(store.frames(date).is_err());
    }
}
