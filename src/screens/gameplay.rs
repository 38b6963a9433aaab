use crate::assets::GameAssets;
use crate::game::cue::ShotCue;
use crate::game::session::Session;
use crate::screens::ScreenAction;
use image::RgbaImage;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Thin shell around [`Session`]: routes the two reaction signals in,
/// applies sequencer transitions (blit + cue) out.
pub struct State {
    session: Session,
    cue: ShotCue,
    shown_frame: usize,
    overlay: Option<usize>,
    reaction_key: KeyCode,
}

pub fn init(assets: &GameAssets, reaction_key: KeyCode, now: Instant) -> Result<State, String> {
    let session = Session::new(assets.frames.len(), now)?;
    info!(
        "Session started: {} frames, reaction key {reaction_key:?}.",
        assets.frames.len()
    );
    Ok(State {
        session,
        cue: ShotCue::new(assets.shot_clip.clone()),
        shown_frame: 0,
        overlay: None,
        reaction_key,
    })
}

pub fn handle_key(state: &mut State, key_event: &KeyEvent, now: Instant) -> ScreenAction {
    if key_event.state != ElementState::Pressed || key_event.repeat {
        return ScreenAction::None;
    }
    if key_event.physical_key == PhysicalKey::Code(state.reaction_key) {
        react(state, now);
    }
    ScreenAction::None
}

pub fn handle_pointer(state: &mut State, now: Instant) -> ScreenAction {
    react(state, now);
    ScreenAction::None
}

fn react(state: &mut State, now: Instant) {
    match state.session.react(now) {
        Some(reaction) => {
            state.overlay = reaction.overlay;
            debug!("Reaction accepted; overlay: {:?}.", reaction.overlay);
        }
        // Already resolved: the losing signal of the race, ignored.
        None => debug!("Reaction ignored; session already resolved."),
    }
}

pub fn update(state: &mut State, now: Instant) -> ScreenAction {
    if let Some(advance) = state.session.tick(now) {
        state.shown_frame = advance.frame;
        if advance.cue {
            state.cue.cue();
        }
    }
    if let Some(result) = state.session.poll_finish(now) {
        info!(
            "Session finished: index {}, score {}, shots {}.",
            result.stopped_at_index, result.score, result.shot_count
        );
        return ScreenAction::Finish(result);
    }
    ScreenAction::None
}

pub fn draw<'a>(state: &State, assets: &'a GameAssets) -> &'a Arc<RgbaImage> {
    match state.overlay {
        Some(zone) => assets.overlays.get(zone),
        None => assets.frames.get(state.shown_frame),
    }
}
