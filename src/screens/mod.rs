pub mod countdown;
pub mod evaluation;
pub mod gameplay;
pub mod intro;

use crate::game::scoring::ScoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Countdown,
    Gameplay,
    Evaluation,
}

#[derive(Debug, Clone, Copy)]
pub enum ScreenAction {
    None,
    Navigate(Screen),
    /// The session emitted its finish event; show the result.
    Finish(ScoreResult),
    Exit,
}
