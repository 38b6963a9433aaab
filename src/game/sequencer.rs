use crate::game::scoring::ReactionSnapshot;
use std::time::{Duration, Instant};

/// A session needs the initial scene, at least one approach frame, the
/// hidden frame and the flash frame.
pub const MIN_FRAMES: usize = 4;

/// Completed flash exposures after which the blink stops on its own.
pub const MAX_SHOTS: u32 = 6;

/// Dwell per frame while walking toward the flash frame.
pub const APPROACH_DWELL: Duration = Duration::from_millis(2000);
/// How long the flash frame stays up before the threat hides again.
pub const FLASH_DWELL: Duration = Duration::from_millis(100);
/// How long the threat stays hidden before the next flash.
pub const HIDDEN_DWELL: Duration = Duration::from_millis(500);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Walking forward through the crowd frames, one every two seconds.
    Approaching,
    /// Flash frame on screen; hides after `FLASH_DWELL`.
    BlinkVisible,
    /// Hidden frame on screen; flashes again after `HIDDEN_DWELL`.
    BlinkHidden,
    /// Inert. Either the shots ran out or the resolver froze the state.
    Finished,
}

/// The single transition (if any) produced by one scheduler tick. The
/// caller owns the side effects: blit `frame`, and fire the shot cue
/// when `cue` is set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Advance {
    pub frame: usize,
    pub cue: bool,
}

/// Discrete animation state for one session. Driven purely by wall-clock
/// timestamps handed to [`Sequencer::advance`]; it never counts ticks,
/// so irregular or late ticks only delay transitions, never skip them.
#[derive(Debug)]
pub struct Sequencer {
    frame_count: usize,
    phase: Phase,
    current_index: usize,
    last_change: Instant,
    shot_count: u32,
}

impl Sequencer {
    pub fn new(frame_count: usize, now: Instant) -> Result<Self, String> {
        if frame_count < MIN_FRAMES {
            return Err(format!(
                "frame set too small: need at least {MIN_FRAMES} frames, got {frame_count}"
            ));
        }
        Ok(Self {
            frame_count,
            phase: Phase::Approaching,
            current_index: 0,
            last_change: now,
            shot_count: 0,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn shot_count(&self) -> u32 {
        self.shot_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Performs at most one transition for this tick. Returns what the
    /// caller should now show (and whether to fire the shot cue), or
    /// `None` when the current dwell has not elapsed yet.
    pub fn advance(&mut self, now: Instant) -> Option<Advance> {
        let flash = self.frame_count - 1;
        match self.phase {
            Phase::Finished => None,
            Phase::Approaching => {
                if now.duration_since(self.last_change) < APPROACH_DWELL {
                    return None;
                }
                self.current_index += 1;
                self.last_change = now;
                if self.current_index == flash {
                    self.phase = Phase::BlinkVisible;
                    Some(Advance { frame: flash, cue: true })
                } else {
                    Some(Advance { frame: self.current_index, cue: false })
                }
            }
            Phase::BlinkVisible => {
                if now.duration_since(self.last_change) < FLASH_DWELL {
                    return None;
                }
                self.current_index = flash - 1;
                self.last_change = now;
                self.phase = Phase::BlinkHidden;
                Some(Advance { frame: flash - 1, cue: false })
            }
            Phase::BlinkHidden => {
                if now.duration_since(self.last_change) < HIDDEN_DWELL {
                    return None;
                }
                self.current_index = flash;
                self.last_change = now;
                if self.shot_count >= MAX_SHOTS {
                    // Out of shots: the flash frame stays up, silently,
                    // and the blink ends for good.
                    self.phase = Phase::Finished;
                    Some(Advance { frame: flash, cue: false })
                } else {
                    self.shot_count += 1;
                    self.phase = Phase::BlinkVisible;
                    Some(Advance { frame: flash, cue: true })
                }
            }
        }
    }

    /// Stops all further self-advancement. Idempotent; `advance` becomes
    /// a guaranteed no-op afterwards.
    pub fn freeze(&mut self) {
        self.phase = Phase::Finished;
    }

    /// Frozen view of the state at `now`, the only input scoring sees.
    pub fn snapshot(&self, now: Instant) -> ReactionSnapshot {
        ReactionSnapshot {
            index: self.current_index,
            elapsed_since_change: now.duration_since(self.last_change),
            shot_count: self.shot_count.min(MAX_SHOTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 10;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn rejects_tiny_frame_sets() {
        let now = Instant::now();
        assert!(Sequencer::new(0, now).is_err());
        assert!(Sequencer::new(3, now).is_err());
        assert!(Sequencer::new(4, now).is_ok());
    }

    #[test]
    fn approach_advances_every_two_seconds() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();

        assert_eq!(seq.advance(at(base, 1999)), None);
        assert_eq!(
            seq.advance(at(base, 2000)),
            Some(Advance { frame: 1, cue: false })
        );
        // Dwell restarts from the tick that moved the frame.
        assert_eq!(seq.advance(at(base, 3999)), None);
        assert_eq!(
            seq.advance(at(base, 4000)),
            Some(Advance { frame: 2, cue: false })
        );
    }

    #[test]
    fn approach_index_never_decreases() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        let mut last = 0;
        for ms in (0..18_000u64).step_by(100) {
            seq.advance(at(base, ms));
            assert!(seq.current_index() >= last);
            last = seq.current_index();
        }
    }

    /// Walks the approach to completion and returns the timestamp at
    /// which the flash frame first appeared.
    fn walk_to_flash(seq: &mut Sequencer, base: Instant) -> u64 {
        let mut ms = 0;
        while seq.phase() == Phase::Approaching {
            ms += 2000;
            let adv = seq.advance(at(base, ms)).expect("approach transition");
            if adv.frame == N - 1 {
                assert!(adv.cue, "arrival at the flash frame must cue");
                return ms;
            }
            assert!(!adv.cue, "approach frames must not cue");
        }
        unreachable!("approach never reached the flash frame");
    }

    #[test]
    fn arrival_cues_once_and_starts_blink() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        let arrival = walk_to_flash(&mut seq, base);
        assert_eq!(arrival, 2000 * (N as u64 - 1));
        assert_eq!(seq.phase(), Phase::BlinkVisible);
        assert_eq!(seq.current_index(), N - 1);
        assert_eq!(seq.shot_count(), 0);
    }

    #[test]
    fn blink_uses_asymmetric_dwells() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        let mut ms = walk_to_flash(&mut seq, base);

        // Flash frame hides after 100 ms, not before.
        assert_eq!(seq.advance(at(base, ms + 99)), None);
        ms += 100;
        assert_eq!(
            seq.advance(at(base, ms)),
            Some(Advance { frame: N - 2, cue: false })
        );
        assert_eq!(seq.current_index(), N - 2);

        // Hidden frame holds for 500 ms, then flashes with a cue.
        assert_eq!(seq.advance(at(base, ms + 499)), None);
        ms += 500;
        assert_eq!(
            seq.advance(at(base, ms)),
            Some(Advance { frame: N - 1, cue: true })
        );
        assert_eq!(seq.shot_count(), 1);
    }

    #[test]
    fn blink_only_visits_the_last_two_frames() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        let mut ms = walk_to_flash(&mut seq, base);
        while !seq.is_finished() {
            ms += 100;
            seq.advance(at(base, ms));
            let idx = seq.current_index();
            assert!(idx == N - 1 || idx == N - 2, "blink wandered to {idx}");
        }
    }

    #[test]
    fn blink_terminates_after_six_shots() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        let mut ms = walk_to_flash(&mut seq, base);

        let mut cues = 1; // arrival
        while !seq.is_finished() {
            ms += 100;
            if let Some(adv) = seq.advance(at(base, ms)) {
                if adv.cue {
                    cues += 1;
                }
            }
            assert!(ms < 60_000, "blink never terminated");
        }

        assert_eq!(seq.shot_count(), MAX_SHOTS);
        assert_eq!(cues, 1 + MAX_SHOTS);
        // Rests on the flash frame so a late reaction still scores there.
        assert_eq!(seq.current_index(), N - 1);

        // Permanently inert from here on.
        for extra in 1..10u64 {
            assert_eq!(seq.advance(at(base, ms + extra * 1000)), None);
        }
    }

    #[test]
    fn advance_after_freeze_is_a_no_op() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        seq.advance(at(base, 2000));
        seq.freeze();
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.advance(at(base, 10_000)), None);
        assert_eq!(seq.current_index(), 1);
        seq.freeze(); // idempotent
        assert!(seq.is_finished());
    }

    #[test]
    fn large_tick_gaps_do_not_skip_the_cue() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        // One tick arrives 9 s late: still exactly one transition.
        assert_eq!(
            seq.advance(at(base, 9000)),
            Some(Advance { frame: 1, cue: false })
        );
        assert_eq!(seq.current_index(), 1);
    }

    #[test]
    fn snapshot_reports_elapsed_since_last_change() {
        let base = Instant::now();
        let mut seq = Sequencer::new(N, base).unwrap();
        seq.advance(at(base, 2000));
        let snap = seq.snapshot(at(base, 2450));
        assert_eq!(snap.index, 1);
        assert_eq!(snap.elapsed_since_change, Duration::from_millis(450));
        assert_eq!(snap.shot_count, 0);
    }
}
