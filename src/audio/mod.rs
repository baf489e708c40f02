use anyhow::{Context, Result, bail};
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The playback primitive the player drives. End of track is observed by
/// polling [`AudioEngine::is_finished`].
pub trait AudioEngine {
    fn play(&mut self, path: &Path) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn current_track(&self) -> Option<&Path>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    fn volume(&self) -> f32;
    /// Clamped to `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    fn output_name(&self) -> Option<String>;
    fn is_finished(&self) -> bool;
}

pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    volume: f32,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let quiet = StderrSilencer::engage();
        let opened = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start default output stream");
        drop(quiet);
        let mut stream = opened?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 1.0,
        })
    }
}

impl AudioEngine for RodioAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.current = None;
        self.track_duration = None;

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = source.total_duration();
        self.sink.append(source);
        self.sink.set_volume(self.volume);
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn current_track(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            bail!("no active track");
        }
        // try_seek on an empty sink reports success and plays nothing.
        if self.sink.empty() {
            bail!("track has already drained");
        }

        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("System default output"))
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }
}

/// Points fd 2 at `/dev/null` until dropped. ALSA and JACK device discovery is noisy
/// on stderr and would scribble over the TUI.
#[cfg(unix)]
struct StderrSilencer {
    saved: libc::c_int,
}

#[cfg(unix)]
impl StderrSilencer {
    fn engage() -> Option<Self> {
        let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
        if saved < 0 {
            return None;
        }
        let devnull = unsafe { libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY) };
        if devnull < 0 {
            unsafe { libc::close(saved) };
            return None;
        }
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
        Some(Self { saved })
    }
}

#[cfg(unix)]
impl Drop for StderrSilencer {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved, libc::STDERR_FILENO);
            libc::close(self.saved);
        }
    }
}

#[cfg(not(unix))]
struct StderrSilencer;

#[cfg(not(unix))]
impl StderrSilencer {
    fn engage() -> Option<Self> {
        Some(Self)
    }
}

/// Wall-clock stand-in for a sink's playback position.
#[derive(Debug, Default, Clone, Copy)]
struct PlaybackClock {
    running_since: Option<Instant>,
    banked: Duration,
}

impl PlaybackClock {
    fn started_at(offset: Duration, running: bool) -> Self {
        Self {
            running_since: running.then(Instant::now),
            banked: offset,
        }
    }

    fn elapsed(&self) -> Duration {
        self.running_since
            .map_or(self.banked, |since| self.banked.saturating_add(since.elapsed()))
    }

    fn hold(&mut self) {
        self.banked = self.elapsed();
        self.running_since = None;
    }

    fn release(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }
}

pub type LengthReader = fn(&Path) -> Option<Duration>;

fn track_length(path: &Path) -> Option<Duration> {
    crate::cover::duration_seconds(path)
        .filter(|seconds| *seconds > 0)
        .map(|seconds| Duration::from_secs(u64::from(seconds)))
}

/// Silent engine used when no output device opens. It behaves like a rodio
/// sink that drains after the track's measured length: once drained it reports
/// finished and refuses to seek, so the player has to play the file again.
pub struct SilentAudioEngine {
    current: Option<PathBuf>,
    paused: bool,
    clock: PlaybackClock,
    length: Option<Duration>,
    volume: f32,
    read_length: LengthReader,
}

impl SilentAudioEngine {
    pub fn new() -> Self {
        Self::with_length_reader(track_length)
    }

    pub fn with_length_reader(read_length: LengthReader) -> Self {
        Self {
            current: None,
            paused: false,
            clock: PlaybackClock::default(),
            length: None,
            volume: 1.0,
            read_length,
        }
    }

    fn drained(&self) -> bool {
        self.current.is_some()
            && self
                .length
                .is_some_and(|length| self.clock.elapsed() >= length)
    }
}

impl Default for SilentAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for SilentAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.length = (self.read_length)(path);
        self.current = Some(path.to_path_buf());
        self.paused = false;
        self.clock = PlaybackClock::started_at(Duration::ZERO, true);
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.hold();
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
        if self.current.is_some() {
            self.clock.release();
        }
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = false;
        self.clock = PlaybackClock::default();
        self.length = None;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_track(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        let elapsed = self.clock.elapsed();
        Some(self.length.map_or(elapsed, |length| elapsed.min(length)))
    }

    fn duration(&self) -> Option<Duration> {
        self.length
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            bail!("no active track");
        }
        if self.drained() {
            bail!("track has already drained");
        }
        let target = self.length.map_or(position, |length| position.min(length));
        self.clock = PlaybackClock::started_at(target, !self.paused);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("Silent output"))
    }

    fn is_finished(&self) -> bool {
        !self.paused && self.drained()
    }
}
