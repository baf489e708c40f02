use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use lofty::file::TaggedFileExt;
use lofty::picture::{Picture, PictureType};
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

/// Thumbnail size in terminal cells. Each cell shows two pixel rows.
pub const THUMBNAIL_COLUMNS: u32 = 16;
pub const THUMBNAIL_ROWS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub mime: String,
    pub data: Vec<u8>,
}

impl CoverArt {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

/// Downscaled RGB pixels, row-major, `height` is an even number of pixel rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Thumbnail {
    pub fn decode(bytes: &[u8], columns: u32, rows: u32) -> Option<Self> {
        if columns == 0 || rows == 0 {
            return None;
        }
        let decoded = image::load_from_memory(bytes).ok()?;
        let height = rows * 2;
        let rgb = decoded
            .resize_exact(columns, height, FilterType::Triangle)
            .to_rgb8();
        let pixels = rgb.pixels().map(|pixel| pixel.0).collect();
        Some(Self {
            width: columns,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Reads the embedded picture from a track's tags, preferring the front cover.
pub fn extract_cover_art(path: &Path) -> Option<CoverArt> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let pictures: Vec<&Picture> = tagged_file
        .tags()
        .iter()
        .flat_map(|tag| tag.pictures())
        .filter(|picture| !picture.data().is_empty())
        .collect();

    let picture = pictures
        .iter()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let data = picture.data().to_vec();
    let mime = picture
        .mime_type()
        .map(|mime| mime.as_str().to_string())
        .filter(|mime| mime.starts_with("image/"))
        .or_else(|| sniff_mime(&data))?;
    Some(CoverArt { mime, data })
}

fn sniff_mime(data: &[u8]) -> Option<String> {
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

pub fn duration_seconds(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    let time_base = params.time_base?;
    let frames = params.n_frames?;
    let time = time_base.calc_time(frames);
    let mut seconds = u32::try_from(time.seconds).unwrap_or(u32::MAX);
    if time.frac >= 0.5 {
        seconds = seconds.saturating_add(1);
    }
    Some(seconds)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverArtEvent {
    pub index: usize,
    /// `None` means "keep the placeholder".
    pub cover: Option<CoverArt>,
    pub thumbnail: Option<Thumbnail>,
    pub duration_seconds: Option<u32>,
}

struct CoverRequest {
    index: usize,
    path: PathBuf,
}

/// Background tag reader. Requests are served in order on one thread;
/// results are picked up with [`CoverArtWorker::try_events`].
pub struct CoverArtWorker {
    request_tx: Sender<CoverRequest>,
    event_rx: Receiver<CoverArtEvent>,
}

impl CoverArtWorker {
    pub fn start() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<CoverRequest>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            for request in request_rx {
                let event = read_cover_event(request.index, &request.path);
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self {
            request_tx,
            event_rx,
        }
    }

    pub fn request(&self, index: usize, path: PathBuf) {
        if self.request_tx.send(CoverRequest { index, path }).is_err() {
            tracing::warn!(index, "cover art worker is gone");
        }
    }

    pub fn try_events(&self) -> Vec<CoverArtEvent> {
        self.event_rx.try_iter().collect()
    }
}

fn read_cover_event(index: usize, path: &Path) -> CoverArtEvent {
    let cover = extract_cover_art(path);
    if cover.is_none() {
        tracing::debug!(path = %path.display(), "no embedded cover art");
    }
    let thumbnail = cover
        .as_ref()
        .and_then(|art| Thumbnail::decode(&art.data, THUMBNAIL_COLUMNS, THUMBNAIL_ROWS));
    CoverArtEvent {
        index,
        cover,
        thumbnail,
        duration_seconds: duration_seconds(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::fs;
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn png_bytes(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 32, Rgb(color));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("png encode");
        out
    }

    #[test]
    fn data_uri_uses_standard_base64() {
        let art = CoverArt {
            mime: String::from("image/jpeg"),
            data: b"hello".to_vec(),
        };
        assert_eq!(art.data_uri(), "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn thumbnail_keeps_solid_color() {
        let thumb = Thumbnail::decode(&png_bytes([200, 10, 30]), 4, 2).expect("decode");
        assert_eq!((thumb.width, thumb.height), (4, 4));
        assert_eq!(thumb.pixel(3, 3), Some([200, 10, 30]));
        assert_eq!(thumb.pixel(4, 0), None);
    }

    #[test]
    fn thumbnail_rejects_garbage() {
        assert!(Thumbnail::decode(b"definitely not an image", 4, 2).is_none());
    }

    #[test]
    fn sniffs_png_mime() {
        assert_eq!(sniff_mime(&png_bytes([0, 0, 0])).as_deref(), Some("image/png"));
    }

    #[test]
    fn unreadable_track_has_no_cover() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.mp3");
        fs::write(&path, b"not an mp3").expect("write");

        assert!(extract_cover_art(&path).is_none());
        assert!(extract_cover_art(&dir.path().join("missing.mp3")).is_none());
        assert!(duration_seconds(&path).is_none());
    }

    #[test]
    fn worker_reports_failures_as_placeholder_events() {
        let dir = tempdir().expect("tempdir");
        let worker = CoverArtWorker::start();
        worker.request(3, dir.path().join("missing.mp3"));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.is_empty() && Instant::now() < deadline {
            events = worker.try_events();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 3);
        assert!(events[0].cover.is_none());
        assert!(events[0].thumbnail.is_none());
    }
}
