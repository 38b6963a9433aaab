use crate::game::scoring::{self, SCORED_ZONE_FRAMES, ScoreResult};
use crate::game::sequencer::{Advance, Sequencer};
use std::time::{Duration, Instant};

/// How long a reaction overlay stays on screen before the finish event.
pub const OVERLAY_HOLD: Duration = Duration::from_millis(500);

/// What the first reaction signal produced: which overlay frame to show,
/// if the reaction landed in the exposure window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reaction {
    pub overlay: Option<usize>,
}

/// One run of the trainer: the sequencer plus the finish resolution.
///
/// Both reaction signals (key and pointer) funnel into [`Session::react`];
/// whichever lands first wins and every later call is ignored, so a key
/// press and a synthetic pointer press in the same dispatch turn cannot
/// double-finish. Winit delivers ticks and input on one thread, so a
/// plain flag is the whole guard.
#[derive(Debug)]
pub struct Session {
    sequencer: Sequencer,
    frame_count: usize,
    result: Option<ScoreResult>,
    finish_due: Option<Instant>,
}

impl Session {
    pub fn new(frame_count: usize, now: Instant) -> Result<Self, String> {
        Ok(Self {
            sequencer: Sequencer::new(frame_count, now)?,
            frame_count,
            result: None,
            finish_due: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    /// Scheduler tick. Inert once the session is resolved.
    pub fn tick(&mut self, now: Instant) -> Option<Advance> {
        if self.result.is_some() {
            return None;
        }
        self.sequencer.advance(now)
    }

    /// First reaction signal wins; later calls return `None`.
    ///
    /// Freezes the sequencer, scores the frozen snapshot, and schedules
    /// the finish event: delayed by [`OVERLAY_HOLD`] when the reaction
    /// landed in the exposure window (so the overlay is actually seen),
    /// immediate otherwise.
    pub fn react(&mut self, now: Instant) -> Option<Reaction> {
        if self.result.is_some() {
            return None;
        }

        let snapshot = self.sequencer.snapshot(now);
        self.sequencer.freeze();

        self.result = Some(ScoreResult {
            stopped_at_index: snapshot.index,
            score: scoring::score(&snapshot, self.frame_count),
            shot_count: snapshot.shot_count,
        });

        let overlay = (snapshot.index + SCORED_ZONE_FRAMES >= self.frame_count)
            .then(|| snapshot.index + SCORED_ZONE_FRAMES - self.frame_count);
        self.finish_due = Some(if overlay.is_some() {
            now + OVERLAY_HOLD
        } else {
            now
        });

        Some(Reaction { overlay })
    }

    /// Emits the finish event exactly once, when its delay has elapsed.
    pub fn poll_finish(&mut self, now: Instant) -> Option<ScoreResult> {
        let due = self.finish_due?;
        if now < due {
            return None;
        }
        self.finish_due = None;
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::sequencer::{APPROACH_DWELL, Phase};

    const N: usize = 10;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    /// Ticks the session once per 2 s until `index` is on screen.
    fn run_to_index(session: &mut Session, base: Instant, index: usize) -> u64 {
        let mut ms = 0;
        for _ in 0..index {
            ms += APPROACH_DWELL.as_millis() as u64;
            session.tick(at(base, ms));
        }
        ms
    }

    #[test]
    fn construction_rejects_small_frame_sets() {
        assert!(Session::new(2, Instant::now()).is_err());
    }

    #[test]
    fn double_signal_resolves_exactly_once() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let ms = run_to_index(&mut session, base, 2);

        // Key and pointer land in the same dispatch turn.
        assert!(session.react(at(base, ms + 10)).is_some());
        assert!(session.react(at(base, ms + 10)).is_none());
        assert!(session.react(at(base, ms + 700)).is_none());

        // One finish event, then silence.
        assert!(session.poll_finish(at(base, ms + 10)).is_some());
        assert!(session.poll_finish(at(base, ms + 10)).is_none());
        assert!(session.poll_finish(at(base, ms + 9999)).is_none());
    }

    #[test]
    fn early_reaction_finishes_immediately_without_overlay() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let ms = run_to_index(&mut session, base, 2);

        let reaction = session.react(at(base, ms + 10)).unwrap();
        assert_eq!(reaction.overlay, None);

        // No presentation delay: due on the very same timestamp.
        let result = session.poll_finish(at(base, ms + 10)).unwrap();
        assert_eq!(result.stopped_at_index, 2);
        assert_eq!(result.score, 0);
        assert_eq!(result.shot_count, 0);
    }

    #[test]
    fn exposure_reaction_holds_the_overlay_for_half_a_second() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let ms = run_to_index(&mut session, base, N - 1);

        let reaction = session.react(at(base, ms + 10)).unwrap();
        assert_eq!(reaction.overlay, Some(2));

        assert!(session.poll_finish(at(base, ms + 10)).is_none());
        assert!(session.poll_finish(at(base, ms + 509)).is_none());
        assert!(session.poll_finish(at(base, ms + 510)).is_some());
    }

    #[test]
    fn overlay_tracks_the_stopped_frame() {
        for (index, overlay) in [(N - 3, 0usize), (N - 2, 1), (N - 1, 2)] {
            let base = Instant::now();
            let mut session = Session::new(N, base).unwrap();
            let ms = run_to_index(&mut session, base, index);
            let reaction = session.react(at(base, ms + 150)).unwrap();
            assert_eq!(reaction.overlay, Some(overlay), "index {index}");
        }
    }

    #[test]
    fn ticks_after_resolution_are_inert() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let ms = run_to_index(&mut session, base, 1);
        session.react(at(base, ms + 10));

        for extra in 1..6u64 {
            assert_eq!(session.tick(at(base, ms + extra * 2000)), None);
        }
    }

    #[test]
    fn mid_approach_reaction_scores_the_current_dwell() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let ms = run_to_index(&mut session, base, N - 3);

        // 450 ms into frame N-3: two decay steps off the 100 ceiling.
        session.react(at(base, ms + 450)).unwrap();
        let result = session.poll_finish(at(base, ms + 1000)).unwrap();
        assert_eq!(result.stopped_at_index, N - 3);
        assert_eq!(result.score, 96);
    }

    #[test]
    fn unanswered_session_runs_dry_then_scores_zero() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();

        // Never react; just tick generously until nothing moves anymore.
        let mut ms = 0;
        let mut last_advance = 0;
        while ms < 60_000 {
            ms += 100;
            if session.tick(at(base, ms)).is_some() {
                last_advance = ms;
            }
        }
        assert!(last_advance > 0);

        // A very late reaction still resolves cleanly.
        let reaction = session.react(at(base, ms)).unwrap();
        assert_eq!(reaction.overlay, Some(2));
        let result = session
            .poll_finish(at(base, ms + OVERLAY_HOLD.as_millis() as u64))
            .unwrap();
        assert_eq!(result.stopped_at_index, N - 1);
        assert_eq!(result.shot_count, 6);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn blink_hidden_reaction_scores_the_hidden_zone() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        let mut ms = run_to_index(&mut session, base, N - 1);

        // 100 ms later the threat hides; react 50 ms into the hide.
        ms += 100;
        let adv = session.tick(at(base, ms)).unwrap();
        assert_eq!(adv.frame, N - 2);
        session.react(at(base, ms + 50)).unwrap();

        let result = session.poll_finish(at(base, ms + 9999)).unwrap();
        assert_eq!(result.stopped_at_index, N - 2);
        assert_eq!(result.score, 80);
    }

    #[test]
    fn resolution_freezes_the_sequencer_phase() {
        let base = Instant::now();
        let mut session = Session::new(N, base).unwrap();
        session.react(base);
        assert_eq!(session.sequencer.phase(), Phase::Finished);
        assert!(session.is_resolved());
    }
}
