use crate::assets::GameAssets;
use crate::core::gfx;
use crate::game::scoring::{SCORED_ZONE_FRAMES, ScoreResult};
use crate::game::sequencer::MAX_SHOTS;
use crate::screens::{Screen, ScreenAction};
use image::RgbaImage;
use log::info;
use std::sync::Arc;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

const BAR_COLOR: [u8; 4] = [0xff, 0x22, 0x22, 0xff];
const BAR_FRAME_COLOR: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

/// Tier to bump a score into the "reacted super fast" message.
const EXCELLENT_AT: u32 = 90;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Outcome {
    /// Reacted before the exposure window: no threat was on screen yet.
    NoThreat,
    Excellent,
    Great,
    TooSlow,
}

fn classify(result: &ScoreResult, total_frames: usize) -> Outcome {
    if result.stopped_at_index + SCORED_ZONE_FRAMES < total_frames {
        Outcome::NoThreat
    } else if result.score >= EXCELLENT_AT {
        Outcome::Excellent
    } else if result.score > 0 {
        Outcome::Great
    } else {
        Outcome::TooSlow
    }
}

pub struct State {
    backdrop: Arc<RgbaImage>,
}

/// Interprets the finish event and builds the result backdrop: the frame
/// the user stopped on, dimmed, with the outcome card over it and the
/// score as a bar along the bottom.
pub fn init(result: &ScoreResult, assets: &GameAssets) -> State {
    let outcome = classify(result, assets.frames.len());

    let card = match outcome {
        Outcome::NoThreat => {
            info!("Result: reacted before any threat was present.");
            &assets.outcomes.no_threat
        }
        Outcome::Excellent => {
            info!("Result: score {}. Excellent, reacted super fast.", result.score);
            &assets.outcomes.excellent
        }
        Outcome::Great => {
            info!("Result: score {}. Great effort, keep practicing.", result.score);
            &assets.outcomes.great
        }
        Outcome::TooSlow => {
            info!("Result: score 0. Too slow this time.");
            &assets.outcomes.too_slow
        }
    };
    if outcome != Outcome::NoThreat {
        let stopped = MAX_SHOTS - result.shot_count.min(MAX_SHOTS);
        info!("Stopped {stopped} of {MAX_SHOTS} shots that could have been fired.");
    }

    let mut backdrop = (**assets.frames.get(result.stopped_at_index)).clone();
    gfx::dim(&mut backdrop, 0.4);
    gfx::blit_center(&mut backdrop, card);
    draw_score_bar(&mut backdrop, result.score);

    State {
        backdrop: Arc::new(backdrop),
    }
}

fn draw_score_bar(image: &mut RgbaImage, score: u32) {
    let (w, h) = (image.width(), image.height());
    if w < 20 || h < 20 {
        return;
    }
    let bar_h = (h / 20).max(4);
    let margin = w / 10;
    let inner_w = w - 2 * margin;
    let y = h - 2 * bar_h;

    // Outline, then fill proportional to the score.
    gfx::fill_rect(image, margin - 2, y - 2, inner_w + 4, bar_h + 4, BAR_FRAME_COLOR);
    gfx::fill_rect(image, margin, y, inner_w, bar_h, [0, 0, 0, 0xff]);
    let fill = inner_w * score.min(100) / 100;
    if fill > 0 {
        gfx::fill_rect(image, margin, y, fill, bar_h, BAR_COLOR);
    }
}

pub fn handle_key(_state: &mut State, key_event: &KeyEvent) -> ScreenAction {
    if key_event.state != ElementState::Pressed || key_event.repeat {
        return ScreenAction::None;
    }
    match key_event.physical_key {
        PhysicalKey::Code(KeyCode::Space) | PhysicalKey::Code(KeyCode::Enter) => {
            // Try again: everything is rebuilt from scratch.
            ScreenAction::Navigate(Screen::Countdown)
        }
        PhysicalKey::Code(KeyCode::Escape) => ScreenAction::Exit,
        _ => ScreenAction::None,
    }
}

pub fn draw(state: &State) -> &Arc<RgbaImage> {
    &state.backdrop
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 10;

    fn result(stopped_at_index: usize, score: u32, shot_count: u32) -> ScoreResult {
        ScoreResult {
            stopped_at_index,
            score,
            shot_count,
        }
    }

    #[test]
    fn pre_window_reaction_reads_as_no_threat() {
        // Zone boundary: index N-4 is out, N-3 is in.
        assert_eq!(classify(&result(0, 0, 0), N), Outcome::NoThreat);
        assert_eq!(classify(&result(N - 4, 0, 0), N), Outcome::NoThreat);
        assert_ne!(classify(&result(N - 3, 100, 0), N), Outcome::NoThreat);
    }

    #[test]
    fn scored_outcomes_follow_the_message_tiers() {
        assert_eq!(classify(&result(N - 3, 96, 0), N), Outcome::Excellent);
        assert_eq!(classify(&result(N - 3, 90, 0), N), Outcome::Excellent);
        assert_eq!(classify(&result(N - 2, 71, 0), N), Outcome::Great);
        assert_eq!(classify(&result(N - 1, 25, 3), N), Outcome::Great);
        assert_eq!(classify(&result(N - 1, 0, 6), N), Outcome::TooSlow);
    }
}
