use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of the manifest file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub title: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub file: String,
    pub artist: Option<String>,
    /// `data:` URI of the embedded cover, filled in after listing.
    pub cover: Option<String>,
    pub duration_seconds: Option<u32>,
}

impl From<ManifestEntry> for Track {
    fn from(entry: ManifestEntry) -> Self {
        Self {
            title: entry.title,
            file: entry.file,
            artist: entry.artist.filter(|artist| !artist.trim().is_empty()),
            cover: None,
            duration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_songs_dir")]
    pub songs_dir: PathBuf,
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_seek_step_seconds")]
    pub seek_step_seconds: u16,
    /// When set, "previous" past this many seconds restarts the current track.
    #[serde(default)]
    pub restart_previous_after_seconds: Option<u16>,
    #[serde(default = "default_extract_cover_art")]
    pub extract_cover_art: bool,
}

fn default_songs_dir() -> PathBuf {
    PathBuf::from("songs")
}

fn default_volume() -> f32 {
    1.0
}

fn default_seek_step_seconds() -> u16 {
    5
}

fn default_extract_cover_art() -> bool {
    true
}

impl Settings {
    /// Falls back to `songs.json` inside the songs folder.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.songs_dir.join("songs.json"))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: default_songs_dir(),
            manifest: None,
            volume: default_volume(),
            seek_step_seconds: default_seek_step_seconds(),
            restart_previous_after_seconds: None,
            extract_cover_art: default_extract_cover_art(),
        }
    }
}
