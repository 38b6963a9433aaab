use crate::core::audio;
use crate::game::sequencer::MIN_FRAMES;
use image::{ImageReader, RgbaImage};
use log::{info, warn};
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Overlay frames, one per scorable zone.
pub const OVERLAY_COUNT: usize = 3;
/// Countdown cards: 3, 2, 1.
pub const COUNTDOWN_CARDS: usize = 3;

/// The ordered crowd sequence for one session. Index 0 is the opening
/// scene, the last index the flash frame, the one before it the hidden
/// frame. Immutable once built.
pub struct FrameSet {
    frames: Vec<Arc<RgbaImage>>,
}

impl FrameSet {
    pub fn new(frames: Vec<Arc<RgbaImage>>) -> Result<Self, String> {
        if frames.len() < MIN_FRAMES {
            return Err(format!(
                "frame set too small: need at least {MIN_FRAMES} frames, got {}",
                frames.len()
            ));
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> &Arc<RgbaImage> {
        &self.frames[index.min(self.frames.len() - 1)]
    }
}

/// Exactly three outcome overlays, indexed by zone (0 = earliest).
pub struct OverlaySet {
    frames: [Arc<RgbaImage>; OVERLAY_COUNT],
}

impl OverlaySet {
    pub fn get(&self, index: usize) -> &Arc<RgbaImage> {
        &self.frames[index.min(OVERLAY_COUNT - 1)]
    }
}

/// Pre-rendered result messages, one per outcome the evaluation screen
/// can land on.
pub struct OutcomeCards {
    pub no_threat: Arc<RgbaImage>,
    pub excellent: Arc<RgbaImage>,
    pub great: Arc<RgbaImage>,
    pub too_slow: Arc<RgbaImage>,
}

pub struct GameAssets {
    pub frames: FrameSet,
    pub overlays: OverlaySet,
    pub intro: Arc<RgbaImage>,
    pub countdown: [Arc<RgbaImage>; COUNTDOWN_CARDS],
    pub outcomes: OutcomeCards,
    /// Decoded shot clip; `None` when audio is unavailable or the file
    /// is bad. The session still runs, just silently.
    pub shot_clip: Option<Arc<Vec<i16>>>,
}

/// Loads and validates the full asset pack up front, so every handle the
/// core touches later is already decoded and known-good.
pub fn load(dir: &Path) -> Result<GameAssets, Box<dyn Error>> {
    let started = Instant::now();

    let frames = FrameSet::new(load_frame_dir(&dir.join("frames"))?)?;

    let overlays = OverlaySet {
        frames: [
            load_image(&dir.join("overlays/overlay_0.png"))?,
            load_image(&dir.join("overlays/overlay_1.png"))?,
            load_image(&dir.join("overlays/overlay_2.png"))?,
        ],
    };

    let intro = load_image(&dir.join("ui/intro.png"))?;

    let countdown = [
        load_image(&dir.join("ui/count_3.png"))?,
        load_image(&dir.join("ui/count_2.png"))?,
        load_image(&dir.join("ui/count_1.png"))?,
    ];

    let outcomes = OutcomeCards {
        no_threat: load_image(&dir.join("ui/result_no_threat.png"))?,
        excellent: load_image(&dir.join("ui/result_excellent.png"))?,
        great: load_image(&dir.join("ui/result_great.png"))?,
        too_slow: load_image(&dir.join("ui/result_too_slow.png"))?,
    };

    let clip_path = dir.join("audio/shot.mp3");
    let shot_clip = match audio::load_clip(&clip_path) {
        Ok(clip) => Some(clip),
        Err(e) => {
            warn!("Shot clip unavailable ({e}); continuing without sound.");
            None
        }
    };

    info!(
        "Loaded {} frames, {OVERLAY_COUNT} overlays, {COUNTDOWN_CARDS} cards in {:.1?}.",
        frames.len(),
        started.elapsed()
    );
    Ok(GameAssets {
        frames,
        overlays,
        intro,
        countdown,
        outcomes,
        shot_clip,
    })
}

/// Reads every PNG in `dir`, ordered by file name. Zero-padded names
/// (frame_00.png, frame_01.png, ...) keep the sequence stable.
fn load_frame_dir(dir: &Path) -> Result<Vec<Arc<RgbaImage>>, Box<dyn Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| format!("cannot read frame directory '{}': {e}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")))
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        frames.push(load_image(path)?);
    }
    Ok(frames)
}

fn load_image(path: &Path) -> Result<Arc<RgbaImage>, Box<dyn Error>> {
    let image = ImageReader::open(path)
        .map_err(|e| format!("cannot open '{}': {e}", path.display()))?
        .decode()
        .map_err(|e| format!("cannot decode '{}': {e}", path.display()))?
        .to_rgba8();
    Ok(Arc::new(image))
}
