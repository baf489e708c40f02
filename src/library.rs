use crate::model::{ManifestEntry, Track};
use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac"];

pub fn load_manifest(path: &Path) -> Result<Vec<Track>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    parse_manifest(&raw).with_context(|| format!("failed to parse manifest {}", path.display()))
}

pub fn parse_manifest(raw: &str) -> Result<Vec<Track>> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .map(|mut entry| {
            if entry.title.trim().is_empty() {
                entry.title = file_stem_title(Path::new(&entry.file));
            }
            Track::from(entry)
        })
        .collect())
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Builds manifest entries for every audio file under `songs_dir`, with
/// `file` relative to it.
pub fn scan_manifest(songs_dir: &Path) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(songs_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio(path) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(songs_dir) else {
            continue;
        };

        let (title, artist) = tag_title_artist(path);
        entries.push(ManifestEntry {
            title: title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| file_stem_title(path)),
            file: manifest_file_reference(relative),
            artist: artist.filter(|artist| !artist.trim().is_empty()),
        });
    }

    entries
}

pub fn resolve_track_path(songs_dir: &Path, file: &str) -> PathBuf {
    let reference = Path::new(file);
    if reference.is_absolute() {
        return reference.to_path_buf();
    }
    songs_dir.join(reference)
}

/// Indices of tracks whose title or artist contains `term`, ignoring case.
/// An empty term keeps everything.
pub fn filter_view(tracks: &[Track], term: &str) -> Vec<usize> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return (0..tracks.len()).collect();
    }

    tracks
        .iter()
        .enumerate()
        .filter(|(_, track)| {
            track.title.to_lowercase().contains(&needle)
                || track
                    .artist
                    .as_deref()
                    .is_some_and(|artist| artist.to_lowercase().contains(&needle))
        })
        .map(|(idx, _)| idx)
        .collect()
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

fn tag_title_artist(path: &Path) -> (Option<String>, Option<String>) {
    let Ok(tagged_file) = Probe::open(path).and_then(|probe| probe.read()) else {
        return (None, None);
    };
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return (None, None);
    };
    (
        tag.title().map(|title| title.trim().to_string()),
        tag.artist().map(|artist| artist.trim().to_string()),
    )
}

fn file_stem_title(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("unknown")
        .to_string()
}

fn manifest_file_reference(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn track(title: &str, artist: Option<&str>) -> Track {
        Track {
            title: title.to_string(),
            file: format!("{title}.mp3"),
            artist: artist.map(str::to_string),
            cover: None,
            duration_seconds: None,
        }
    }

    #[test]
    fn manifest_accepts_missing_artist() {
        let tracks = parse_manifest(
            r#"[
                { "title": "Lucid Dreams", "file": "lucid_dreams.mp3" },
                { "title": "Robbery", "file": "robbery.mp3", "artist": "JW", "extra": 1 }
            ]"#,
        )
        .expect("parse");

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, None);
        assert_eq!(tracks[1].artist.as_deref(), Some("JW"));
        assert_eq!(tracks[1].cover, None);
    }

    #[test]
    fn blank_title_falls_back_to_file_stem() {
        let tracks = parse_manifest(r#"[{ "title": " ", "file": "dir/wishing_well.mp3" }]"#)
            .expect("parse");
        assert_eq!(tracks[0].title, "wishing_well");
    }

    #[test]
    fn manifest_without_file_is_rejected() {
        assert!(parse_manifest(r#"[{ "title": "a" }]"#).is_err());
    }

    #[test]
    fn missing_manifest_reports_path() {
        let dir = tempdir().expect("tempdir");
        let err = load_manifest(&dir.path().join("songs.json")).expect_err("should fail");
        assert!(format!("{err:#}").contains("failed to read manifest"));
    }

    #[test]
    fn written_manifest_loads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("songs.json");
        let entries = vec![ManifestEntry {
            title: String::from("Legends"),
            file: String::from("legends.mp3"),
            artist: None,
        }];
        write_manifest(&path, &entries).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(!raw.contains("artist"));
        let tracks = load_manifest(&path).expect("load");
        assert_eq!(tracks[0].title, "Legends");
    }

    #[test]
    fn scan_lists_audio_files_relative_to_root() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("album")).expect("mkdir");
        fs::write(dir.path().join("b_song.mp3"), b"not really audio").expect("write");
        fs::write(dir.path().join("album").join("a_song.FLAC"), b"x").expect("write");
        fs::write(dir.path().join("cover.jpg"), b"x").expect("write");
        fs::write(dir.path().join("stream.opus"), b"x").expect("write");

        let entries = scan_manifest(dir.path());
        let files: Vec<&str> = entries.iter().map(|entry| entry.file.as_str()).collect();
        assert_eq!(files, vec!["album/a_song.FLAC", "b_song.mp3"]);
        assert_eq!(entries[1].title, "b_song");
        assert_eq!(entries[1].artist, None);
    }

    #[test]
    fn filter_matches_title_and_artist_case_insensitively() {
        let tracks = vec![
            track("Lucid Dreams", None),
            track("Robbery", Some("Juice")),
            track("Bandit", None),
        ];

        assert_eq!(filter_view(&tracks, "DREAM"), vec![0]);
        assert_eq!(filter_view(&tracks, "juice"), vec![1]);
        assert_eq!(filter_view(&tracks, "b"), vec![1, 2]);
        assert_eq!(filter_view(&tracks, ""), vec![0, 1, 2]);
        assert!(filter_view(&tracks, "  ").is_empty());
        assert_eq!(filter_view(&tracks, "d d"), vec![0]);
        assert!(filter_view(&tracks, " lucid").is_empty());
        assert!(filter_view(&tracks, "zzz").is_empty());
    }

    #[test]
    fn opus_is_not_a_playable_extension() {
        assert!(is_audio(Path::new("a.ogg")));
        assert!(is_audio(Path::new("a.M4A")));
        assert!(!is_audio(Path::new("a.opus")));
        assert!(!is_audio(Path::new("a")));
    }

    #[test]
    fn relative_references_resolve_under_songs_dir() {
        let resolved = resolve_track_path(Path::new("songs"), "album/a.mp3");
        assert_eq!(resolved, Path::new("songs").join("album/a.mp3"));
    }
}
