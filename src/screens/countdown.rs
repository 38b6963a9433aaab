use crate::assets::GameAssets;
use crate::screens::{Screen, ScreenAction};
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Dwell per countdown step (3, 2, 1).
pub const STEP_DWELL: Duration = Duration::from_millis(1400);

pub struct State {
    /// Counts down 3 -> 1; gameplay starts when 1 expires.
    step: u32,
    step_started: Instant,
}

pub fn init(now: Instant) -> State {
    State {
        step: 3,
        step_started: now,
    }
}

pub fn update(state: &mut State, now: Instant) -> ScreenAction {
    if now.duration_since(state.step_started) < STEP_DWELL {
        return ScreenAction::None;
    }
    if state.step <= 1 {
        return ScreenAction::Navigate(Screen::Gameplay);
    }
    state.step -= 1;
    state.step_started = now;
    ScreenAction::None
}

pub fn draw<'a>(state: &State, assets: &'a GameAssets) -> &'a Arc<RgbaImage> {
    let card = (3 - state.step.clamp(1, 3)) as usize;
    &assets.countdown[card]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn counts_three_steps_then_starts_gameplay() {
        let base = Instant::now();
        let mut state = init(base);
        assert_eq!(state.step, 3);

        assert!(matches!(update(&mut state, at(base, 1399)), ScreenAction::None));
        assert!(matches!(update(&mut state, at(base, 1400)), ScreenAction::None));
        assert_eq!(state.step, 2);
        assert!(matches!(update(&mut state, at(base, 2800)), ScreenAction::None));
        assert_eq!(state.step, 1);
        assert!(matches!(
            update(&mut state, at(base, 4200)),
            ScreenAction::Navigate(Screen::Gameplay)
        ));
    }
}
