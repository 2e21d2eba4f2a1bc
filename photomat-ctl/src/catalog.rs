//! Video catalogs
//!
//! A catalog is an ordered list of video files for one category plus a
//! selection source deciding which entry plays next. Selection sources are
//! injectable so tests can pin the order (sequential) or the seed (random).

use std::fmt;
use std::path::{Path, PathBuf};

use photomat_common::config::{CatalogConfig, SelectionMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Result};

/// File extensions picked up when scanning a catalog directory
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mkv", "mov", "avi", "h264"];

/// Video category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Idle,
    Countdown,
    Applause,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Idle => "idle",
            Category::Countdown => "countdown",
            Category::Applause => "applause",
        })
    }
}

/// Decides which catalog entry is played next
pub trait SelectionSource: Send {
    /// Pick an index in `0..len` (`len` is never zero)
    fn next_index(&mut self, len: usize) -> usize;
}

/// Walks the catalog in order, wrapping around at the end
#[derive(Debug, Default)]
pub struct SequentialSource {
    cursor: usize,
}

impl SequentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a given entry
    pub fn starting_at(cursor: usize) -> Self {
        Self { cursor }
    }
}

impl SelectionSource for SequentialSource {
    fn next_index(&mut self, len: usize) -> usize {
        let index = self.cursor % len;
        self.cursor = (index + 1) % len;
        index
    }
}

/// Uniformly random selection
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Seeded for reproducible runs, or from OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl SelectionSource for RandomSource {
    fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// One selected catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub reference: PathBuf,
}

/// Ordered video list of one category with its selection policy
pub struct VideoCatalog {
    category: Category,
    entries: Vec<PathBuf>,
    source: Box<dyn SelectionSource>,
}

impl fmt::Debug for VideoCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoCatalog")
            .field("category", &self.category)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl VideoCatalog {
    pub fn new(category: Category, entries: Vec<PathBuf>, source: Box<dyn SelectionSource>) -> Self {
        Self {
            category,
            entries,
            source,
        }
    }

    /// Catalog played in list order starting at the first entry
    pub fn sequential(category: Category, entries: Vec<PathBuf>) -> Self {
        Self::new(category, entries, Box::new(SequentialSource::new()))
    }

    /// Build from configuration, scanning the configured directory if any
    pub fn from_config(category: Category, config: &CatalogConfig) -> Result<Self> {
        let mut entries = config.videos.clone();
        if let Some(dir) = &config.directory {
            entries.extend(scan_directory(dir)?);
        }

        let source: Box<dyn SelectionSource> = match config.mode {
            SelectionMode::Sequential => Box::new(SequentialSource::new()),
            SelectionMode::Random => Box::new(RandomSource::new(config.seed)),
        };

        Ok(Self::new(category, entries, source))
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the next video
    ///
    /// An empty catalog is a configuration error.
    pub fn select(&mut self) -> Result<Selection> {
        if self.entries.is_empty() {
            return Err(Error::EmptyCatalog(self.category));
        }

        let index = self.source.next_index(self.entries.len()).min(self.entries.len() - 1);
        Ok(Selection {
            index,
            reference: self.entries[index].clone(),
        })
    }
}

/// List the video files of a directory, sorted by file name
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_video {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn videos(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/videos/idle{:02}.mp4", i))).collect()
    }

    #[test]
    fn test_sequential_wraps_without_skipping() {
        let mut catalog = VideoCatalog::sequential(Category::Idle, videos(4));
        let order: Vec<usize> = (0..9).map(|_| catalog.select().unwrap().index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_sequential_starting_cursor() {
        let mut catalog = VideoCatalog::new(
            Category::Idle,
            videos(3),
            Box::new(SequentialSource::starting_at(2)),
        );
        assert_eq!(catalog.select().unwrap().index, 2);
        assert_eq!(catalog.select().unwrap().index, 0);
    }

    #[test]
    fn test_random_is_reproducible_with_seed() {
        let mut a = VideoCatalog::new(Category::Applause, videos(7), Box::new(RandomSource::new(Some(11))));
        let mut b = VideoCatalog::new(Category::Applause, videos(7), Box::new(RandomSource::new(Some(11))));

        for _ in 0..20 {
            let pick = a.select().unwrap();
            assert!(pick.index < 7);
            assert_eq!(pick, b.select().unwrap());
        }
    }

    #[test]
    fn test_empty_catalog_is_configuration_error() {
        let mut catalog = VideoCatalog::sequential(Category::Countdown, Vec::new());
        match catalog.select() {
            Err(Error::EmptyCatalog(Category::Countdown)) => {}
            other => panic!("expected empty catalog error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_directory_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.mkv"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.mp4")).unwrap();

        let found: Vec<String> = scan_directory(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.MOV", "b.mp4", "c.mkv"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig {
            directory: Some(dir.path().join("gone")),
            ..CatalogConfig::default()
        };
        match VideoCatalog::from_config(Category::Applause, &config) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected I/O error, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_from_config_appends_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extra.mp4"), b"x").unwrap();

        let config = CatalogConfig {
            videos: vec![PathBuf::from("/videos/first.mp4")],
            directory: Some(dir.path().to_path_buf()),
            ..CatalogConfig::default()
        };
        let catalog = VideoCatalog::from_config(Category::Idle, &config).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0], PathBuf::from("/videos/first.mp4"));
        assert!(catalog.entries()[1].ends_with("extra.mp4"));
    }
}
