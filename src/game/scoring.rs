use crate::game::sequencer::MAX_SHOTS;
use std::time::Duration;

/// Number of trailing frames in which a reaction still earns points.
pub const SCORED_ZONE_FRAMES: usize = 3;

/// One decay step of the linear score ramps.
pub const DECAY_STEP: Duration = Duration::from_millis(200);

/// Everything the scorer is allowed to see, frozen at reaction time.
/// Taking the snapshot first and scoring second means a late scheduler
/// tick can never shift the score after the fact.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReactionSnapshot {
    pub index: usize,
    pub elapsed_since_change: Duration,
    pub shot_count: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScoreResult {
    pub stopped_at_index: usize,
    pub score: u32,
    pub shot_count: u32,
}

/// Linear ramp from `ceiling` down to `floor`, losing a tenth of the
/// range every completed 200 ms step.
fn ramp(elapsed: Duration, ceiling: i64, floor: i64) -> u32 {
    let step = (elapsed.as_millis() / DECAY_STEP.as_millis()) as i64;
    let raw = ceiling - step * ((ceiling - floor) / 10);
    raw.clamp(floor, ceiling) as u32
}

/// Maps a frozen reaction snapshot to a score in `[0, 100]`.
///
/// The three scorable zones are the last three frame indices:
/// the frame right before the draw, the hidden frame, and the flash
/// frame itself. During the flash only the number of completed shots
/// matters; earlier it is pure exposure time. A reaction anywhere else
/// means the threat had not appeared yet and scores zero.
pub fn score(snapshot: &ReactionSnapshot, total_frames: usize) -> u32 {
    if snapshot.index + SCORED_ZONE_FRAMES == total_frames {
        ramp(snapshot.elapsed_since_change, 100, 80)
    } else if snapshot.index + 2 == total_frames {
        ramp(snapshot.elapsed_since_change, 80, 50)
    } else if snapshot.index + 1 == total_frames {
        let shots = snapshot.shot_count.min(MAX_SHOTS);
        let raw = 50.0 - f64::from(shots) * (50.0 / f64::from(MAX_SHOTS));
        raw.round().max(0.0) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 10;

    fn snap(index: usize, elapsed_ms: u64, shot_count: u32) -> ReactionSnapshot {
        ReactionSnapshot {
            index,
            elapsed_since_change: Duration::from_millis(elapsed_ms),
            shot_count,
        }
    }

    #[test]
    fn pre_exposure_reaction_scores_zero() {
        for index in 0..N - 3 {
            assert_eq!(score(&snap(index, 50, 0), N), 0);
        }
    }

    #[test]
    fn approach_zone_decays_two_points_per_step() {
        // 450 ms into frame N-3: two completed steps.
        assert_eq!(score(&snap(7, 450, 0), N), 96);
        assert_eq!(score(&snap(7, 0, 0), N), 100);
        assert_eq!(score(&snap(7, 199, 0), N), 100);
        assert_eq!(score(&snap(7, 200, 0), N), 98);
    }

    #[test]
    fn approach_zone_is_clamped_and_non_increasing() {
        let mut last = 100;
        for ms in (0..4000u64).step_by(50) {
            let s = score(&snap(7, ms, 0), N);
            assert!(s <= last, "score rose from {last} to {s} at {ms} ms");
            assert!((80..=100).contains(&s));
            last = s;
        }
        // Far past the ramp it pins to the floor.
        assert_eq!(score(&snap(7, 60_000, 0), N), 80);
    }

    #[test]
    fn hidden_zone_decays_three_points_per_step() {
        assert_eq!(score(&snap(8, 650, 0), N), 71);
        assert_eq!(score(&snap(8, 0, 0), N), 80);
        assert_eq!(score(&snap(8, 60_000, 0), N), 50);
    }

    #[test]
    fn hidden_zone_bounds() {
        for ms in (0..5000u64).step_by(100) {
            let s = score(&snap(8, ms, 0), N);
            assert!((50..=80).contains(&s));
        }
    }

    #[test]
    fn flash_zone_counts_shots_not_time() {
        // Elapsed time is irrelevant on the flash frame.
        assert_eq!(score(&snap(9, 0, 3), N), score(&snap(9, 9999, 3), N));
        assert_eq!(score(&snap(9, 0, 0), N), 50);
        assert_eq!(score(&snap(9, 0, 3), N), 25);
        assert_eq!(score(&snap(9, 0, 6), N), 0);
    }

    #[test]
    fn flash_zone_full_table() {
        let expected = [50, 42, 33, 25, 17, 8, 0];
        let mut last = u32::MAX;
        for (shots, want) in expected.iter().enumerate() {
            let s = score(&snap(9, 0, shots as u32), N);
            assert_eq!(s, *want, "shots={shots}");
            assert!(s <= last);
            last = s;
        }
    }

    #[test]
    fn flash_zone_caps_shot_count() {
        assert_eq!(score(&snap(9, 0, 7), N), 0);
        assert_eq!(score(&snap(9, 0, 100), N), 0);
    }
}
