//! Scoring rules: combo and chain multipliers, level curve, drop speed.

use std::time::Duration;

/// Points per cleared particle before multipliers.
pub const CLEAR_POINTS: f64 = 10.0;
/// Points per particle destroyed by a blast.
pub const BLAST_POINTS: f64 = 5.0;
/// Extra chain multiplier per chained pass.
pub const CHAIN_BONUS: f64 = 0.5;

/// Multiplier for clearing `regions` regions in one pass. Anything past four
/// stays at the four-region value.
pub fn combo_multiplier(regions: u32) -> f64 {
    match regions {
        1 => 1.0,
        2 => 1.5,
        3 => 2.5,
        _ => 4.0,
    }
}

/// Chain 1 is the first clear of a turn.
pub fn chain_multiplier(chain: u32) -> f64 {
    1.0 + f64::from(chain.saturating_sub(1)) * CHAIN_BONUS
}

pub fn clear_points(particles: usize, level: u32, regions: u32, chain: u32) -> f64 {
    particles as f64 * CLEAR_POINTS * f64::from(level) * combo_multiplier(regions) * chain_multiplier(chain)
}

pub fn blast_points(destroyed: usize, level: u32) -> f64 {
    destroyed as f64 * BLAST_POINTS * f64::from(level)
}

/// Banner for a clearing pass, e.g. "Triple Clear! Chain x2!". `None` for a plain single clear.
pub fn combo_message(regions: u32, chain: u32) -> Option<String> {
    let mut message = match regions {
        0 | 1 => String::new(),
        2 => "Double Clear!".to_string(),
        3 => "Triple Clear!".to_string(),
        4 => "Quad Clear!".to_string(),
        n => format!("Combo x{n} Clear!"),
    };
    if chain > 1 {
        if !message.is_empty() {
            message.push(' ');
        }
        message.push_str(&format!("Chain x{chain}!"));
    }
    (!message.is_empty()).then_some(message)
}

/// Level reached after clearing `lines` regions in total; never lower than `current`.
pub fn level_for_lines(lines: u32, lines_per_level: u32, current: u32) -> u32 {
    if lines == 0 || lines_per_level == 0 {
        return current;
    }
    current.max((lines - 1) / lines_per_level + 1)
}

/// Auto-drop interval at `level`.
pub fn drop_interval(level: u32) -> Duration {
    let ms = 1000u64.saturating_sub(u64::from(level.saturating_sub(1)) * 50);
    Duration::from_millis(ms.max(100))
}
