use crate::assets::GameAssets;
use crate::screens::{Screen, ScreenAction};
use image::RgbaImage;
use std::sync::Arc;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Entry screen: shows the how-it-works card until the user starts a
/// round. Stateless; Space, Enter or any pointer press moves on.
pub fn handle_key(key_event: &KeyEvent) -> ScreenAction {
    if key_event.state != ElementState::Pressed || key_event.repeat {
        return ScreenAction::None;
    }
    match key_event.physical_key {
        PhysicalKey::Code(code) => start_action(code),
        _ => ScreenAction::None,
    }
}

pub fn handle_pointer() -> ScreenAction {
    ScreenAction::Navigate(Screen::Countdown)
}

fn start_action(code: KeyCode) -> ScreenAction {
    match code {
        KeyCode::Space | KeyCode::Enter => ScreenAction::Navigate(Screen::Countdown),
        _ => ScreenAction::None,
    }
}

pub fn draw(assets: &GameAssets) -> &Arc<RgbaImage> {
    &assets.intro
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_keys_advance_to_the_countdown() {
        assert!(matches!(
            start_action(KeyCode::Space),
            ScreenAction::Navigate(Screen::Countdown)
        ));
        assert!(matches!(
            start_action(KeyCode::Enter),
            ScreenAction::Navigate(Screen::Countdown)
        ));
        assert!(matches!(
            handle_pointer(),
            ScreenAction::Navigate(Screen::Countdown)
        ));
    }

    #[test]
    fn other_keys_stay_on_the_instructions() {
        assert!(matches!(start_action(KeyCode::KeyA), ScreenAction::None));
        assert!(matches!(start_action(KeyCode::Escape), ScreenAction::None));
    }
}
