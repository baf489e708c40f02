use crate::audio::AudioEngine;
use crate::cover::{CoverArtEvent, CoverArtWorker, Thumbnail};
use crate::library;
use crate::model::{Settings, Track};
use crate::sequencer::{EndOfTrack, PlaybackSequencer};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const VOLUME_STEP: f32 = 0.05;

/// Glue between the sequencer, the audio engine and what the UI shows.
/// Everything here runs on the UI thread.
#[derive(Debug)]
pub struct Player {
    pub tracks: Vec<Track>,
    pub sequencer: PlaybackSequencer,
    pub settings: Settings,
    pub search: String,
    /// Full-list indices currently listed, in display order.
    pub view: Vec<usize>,
    pub selected_row: usize,
    pub status: String,
    pub dirty: bool,
    thumbnails: HashMap<usize, Thumbnail>,
    now_playing_thumbnail: Option<Thumbnail>,
}

impl Player {
    pub fn new(settings: Settings, tracks: Vec<Track>) -> Self {
        Self::with_sequencer(settings, PlaybackSequencer::new(tracks.len()), tracks)
    }

    pub fn with_sequencer(
        settings: Settings,
        sequencer: PlaybackSequencer,
        tracks: Vec<Track>,
    ) -> Self {
        let view = (0..tracks.len()).collect();
        let status = if tracks.is_empty() {
            String::from("No songs found. Add them to the manifest.")
        } else {
            format!("Loaded {} songs", tracks.len())
        };
        Self {
            tracks,
            sequencer,
            settings,
            search: String::new(),
            view,
            selected_row: 0,
            status,
            dirty: true,
            thumbnails: HashMap::new(),
            now_playing_thumbnail: None,
        }
    }

    /// Loads the manifest named by `settings`. A manifest that cannot be read
    /// leaves the player empty with the failure on the status line.
    pub fn from_settings(settings: Settings) -> Self {
        let manifest = settings.manifest_path();
        match library::load_manifest(&manifest) {
            Ok(tracks) => {
                tracing::info!(count = tracks.len(), manifest = %manifest.display(), "manifest loaded");
                Self::new(settings, tracks)
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "failed to load manifest");
                let mut player = Self::new(settings, Vec::new());
                player.set_status(&format!("Failed to load songs: {err:#}"));
                player
            }
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.sequencer
            .current()
            .and_then(|index| self.tracks.get(index))
    }

    pub fn track_path(&self, index: usize) -> Option<PathBuf> {
        self.tracks
            .get(index)
            .map(|track| library::resolve_track_path(&self.settings.songs_dir, &track.file))
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.sequencer.current() == Some(index)
    }

    pub fn thumbnail_for(&self, index: usize) -> Option<&Thumbnail> {
        self.thumbnails.get(&index)
    }

    pub fn now_playing_thumbnail(&self) -> Option<&Thumbnail> {
        self.now_playing_thumbnail.as_ref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.view.get(self.selected_row).copied()
    }

    /// Starts the track at full-list `index`. Out-of-range indices do nothing.
    pub fn select_track(&mut self, index: usize, audio: &mut dyn AudioEngine) {
        if self.sequencer.select_track(index).is_none() {
            return;
        }
        self.start_track(index, audio);
    }

    pub fn next(&mut self, audio: &mut dyn AudioEngine) {
        if let Some(index) = self.sequencer.advance() {
            self.start_track(index, audio);
        }
    }

    pub fn previous(&mut self, audio: &mut dyn AudioEngine) {
        if let Some(threshold) = self.settings.restart_previous_after_seconds
            && self.sequencer.current().is_some()
            && audio
                .position()
                .is_some_and(|position| position > Duration::from_secs(u64::from(threshold)))
        {
            self.restart_current(audio);
            return;
        }

        if let Some(index) = self.sequencer.retreat() {
            self.start_track(index, audio);
        }
    }

    pub fn handle_track_ended(&mut self, audio: &mut dyn AudioEngine) {
        match self.sequencer.on_track_ended() {
            // A finished track's output is drained, so a restart loads it again.
            EndOfTrack::Restart(index) | EndOfTrack::Advance(index) => {
                self.start_track(index, audio)
            }
            EndOfTrack::Idle => {
                audio.stop();
                self.set_status("Nothing to play");
            }
        }
    }

    pub fn toggle_play(&mut self, audio: &mut dyn AudioEngine) {
        if self.tracks.is_empty() {
            return;
        }

        if audio.current_track().is_none() {
            match self.sequencer.current() {
                Some(index) => self.start_track(index, audio),
                None => self.activate_selected(audio),
            }
            return;
        }

        if audio.is_paused() {
            audio.resume();
            self.set_status("Resumed");
        } else {
            audio.pause();
            self.set_status("Paused");
        }
    }

    pub fn toggle_shuffle(&mut self) {
        let enabled = self.sequencer.toggle_shuffle();
        self.set_status(if enabled { "Shuffle on" } else { "Shuffle off" });
    }

    pub fn toggle_loop(&mut self) {
        let enabled = self.sequencer.toggle_loop();
        self.set_status(if enabled { "Loop on" } else { "Loop off" });
    }

    /// Seeks to `fraction` of the current track, as a progress bar click does.
    pub fn seek_fraction(&mut self, fraction: f64, audio: &mut dyn AudioEngine) {
        let Some(duration) = self.known_duration(audio) else {
            return;
        };
        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        self.seek(target, audio);
    }

    pub fn seek_relative(&mut self, forward: bool, audio: &mut dyn AudioEngine) {
        let Some(position) = audio.position() else {
            return;
        };
        let step = Duration::from_secs(u64::from(self.settings.seek_step_seconds));
        let mut target = if forward {
            position.saturating_add(step)
        } else {
            position.saturating_sub(step)
        };
        if let Some(duration) = self.known_duration(audio) {
            target = target.min(duration);
        }
        self.seek(target, audio);
    }

    pub fn set_volume(&mut self, level: f32, audio: &mut dyn AudioEngine) {
        audio.set_volume(level.clamp(0.0, 1.0));
        self.settings.volume = audio.volume();
        self.set_status(&format!(
            "Volume: {}%",
            (audio.volume() * 100.0).round() as u16
        ));
    }

    pub fn adjust_volume(&mut self, up: bool, audio: &mut dyn AudioEngine) {
        let delta = if up { VOLUME_STEP } else { -VOLUME_STEP };
        self.set_volume(audio.volume() + delta, audio);
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.view = library::filter_view(&self.tracks, &self.search);
        self.selected_row = self.selected_row.min(self.view.len().saturating_sub(1));
        self.dirty = true;
    }

    pub fn push_search_char(&mut self, ch: char) {
        let mut term = self.search.clone();
        term.push(ch);
        self.set_search(&term);
    }

    pub fn pop_search_char(&mut self) {
        let mut term = self.search.clone();
        term.pop();
        self.set_search(&term);
    }

    pub fn clear_search(&mut self) {
        self.set_search("");
    }

    pub fn select_next_row(&mut self) {
        if self.view.is_empty() {
            return;
        }
        self.selected_row = (self.selected_row + 1).min(self.view.len() - 1);
        self.dirty = true;
    }

    pub fn select_prev_row(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
        self.dirty = true;
    }

    /// Plays whatever the highlighted row shows, by its full-list index.
    pub fn activate_selected(&mut self, audio: &mut dyn AudioEngine) {
        let Some(index) = self.selected_index() else {
            self.set_status("Nothing selected");
            return;
        };
        self.select_track(index, audio);
    }

    pub fn activate_row(&mut self, row: usize, audio: &mut dyn AudioEngine) {
        if row >= self.view.len() {
            return;
        }
        self.selected_row = row;
        self.activate_selected(audio);
    }

    /// Queues every listed track once for a cover and duration lookup.
    pub fn request_covers(&self, worker: &CoverArtWorker) {
        if !self.settings.extract_cover_art {
            return;
        }
        for index in 0..self.tracks.len() {
            if let Some(path) = self.track_path(index) {
                worker.request(index, path);
            }
        }
    }

    /// Caches a finished lookup. The now-playing thumbnail only changes when the
    /// result belongs to the track that is current right now.
    pub fn apply_cover_event(&mut self, event: CoverArtEvent) {
        let Some(track) = self.tracks.get_mut(event.index) else {
            return;
        };
        if event.duration_seconds.is_some() {
            track.duration_seconds = event.duration_seconds;
        }
        if let Some(cover) = &event.cover {
            track.cover = Some(cover.data_uri());
        }
        if let Some(thumbnail) = event.thumbnail {
            if self.sequencer.current() == Some(event.index) {
                self.now_playing_thumbnail = Some(thumbnail.clone());
            }
            self.thumbnails.insert(event.index, thumbnail);
        }
        self.dirty = true;
    }

    fn start_track(&mut self, index: usize, audio: &mut dyn AudioEngine) {
        let Some(path) = self.track_path(index) else {
            return;
        };
        self.now_playing_thumbnail = self.thumbnails.get(&index).cloned();

        match audio.play(&path) {
            Ok(()) => {
                let title = self.tracks[index].title.clone();
                tracing::info!(index, title = %title, "playing");
                self.set_status(&format!("Playing {title}"));
            }
            Err(err) => {
                tracing::warn!(index, error = %format!("{err:#}"), "playback failed");
                self.set_status(&format!("playback error: {err:#}"));
            }
        }
    }

    fn restart_current(&mut self, audio: &mut dyn AudioEngine) {
        let Some(index) = self.sequencer.current() else {
            return;
        };
        if audio.current_track().is_some()
            && !audio.is_finished()
            && audio.seek_to(Duration::ZERO).is_ok()
        {
            audio.resume();
            self.dirty = true;
            return;
        }
        self.start_track(index, audio);
    }

    fn seek(&mut self, target: Duration, audio: &mut dyn AudioEngine) {
        if let Err(err) = audio.seek_to(target) {
            tracing::debug!(error = %format!("{err:#}"), "seek rejected");
            self.set_status(&format!("seek error: {err:#}"));
            return;
        }
        self.dirty = true;
    }

    fn known_duration(&self, audio: &dyn AudioEngine) -> Option<Duration> {
        audio.duration().or_else(|| {
            self.current_track()
                .and_then(|track| track.duration_seconds)
                .map(|seconds| Duration::from_secs(u64::from(seconds)))
        })
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

/// `m:ss`, with `0:00` when the time is unknown.
pub fn format_time(time: Option<Duration>) -> String {
    let Some(time) = time else {
        return String::from("0:00");
    };
    let total = time.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
