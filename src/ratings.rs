use crate::stage_batch::{STAGE_COUNT, STAGE_SIZE};

/// Points available across a full game.
pub const GAME_TOTAL: u32 = STAGE_COUNT as u32 * STAGE_SIZE as u32;

/// Whole-number percentage of `score` out of `total`; zero when nothing was asked.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

pub fn stage_rating(percent: u32) -> &'static str {
    match percent {
        80.. => "Outstanding!",
        60.. => "Great Job!",
        40.. => "Good Effort!",
        _ => "Keep Trying!",
    }
}

pub fn game_rating(percent: u32) -> &'static str {
    match percent {
        90.. => "LEGENDARY!",
        80.. => "AMAZING!",
        70.. => "EXCELLENT!",
        _ => "GREAT JOB!",
    }
}
