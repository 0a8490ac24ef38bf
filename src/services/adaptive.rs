//! Adaptive difficulty recommendation.
//!
//! Pure functions over a bounded sliding window of recent answer outcomes
//! (most recent last, capacity [`WINDOW_CAP`]). Accuracy above 75% bumps the
//! difficulty, below 45% lowers it, always clamped to 1-5.

pub const WINDOW_CAP: usize = 20;
pub const MIN_DIFFICULTY: i32 = 1;
pub const MAX_DIFFICULTY: i32 = 5;

const RAISE_THRESHOLD_PCT: f64 = 75.0;
const LOWER_THRESHOLD_PCT: f64 = 45.0;

pub fn clamp_difficulty(d: i32) -> i32 {
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Compute the next recommended difficulty from the current one and the
/// recent-answer window. An empty window leaves the difficulty unchanged.
pub fn next_difficulty(current: i32, recent_answers: &[bool]) -> i32 {
    if recent_answers.is_empty() {
        return clamp_difficulty(current);
    }

    let total = recent_answers.len() as f64;
    let correct = recent_answers.iter().filter(|ok| **ok).count() as f64;
    let accuracy_pct = correct / total * 100.0;

    if accuracy_pct > RAISE_THRESHOLD_PCT {
        clamp_difficulty(current + 1)
    } else if accuracy_pct < LOWER_THRESHOLD_PCT {
        clamp_difficulty(current - 1)
    } else {
        clamp_difficulty(current)
    }
}

/// Append an outcome to the window, evicting the oldest entry beyond
/// [`WINDOW_CAP`] (strict FIFO).
pub fn push_outcome(window: &mut Vec<bool>, correct: bool) {
    window.push(correct);
    while window.len() > WINDOW_CAP {
        window.remove(0);
    }
}
