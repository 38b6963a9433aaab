pub mod cue;
pub mod scoring;
pub mod sequencer;
pub mod session;
