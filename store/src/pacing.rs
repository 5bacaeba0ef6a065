use std::{ops::RangeInclusive, thread, time::Duration};

use rand::Rng;

pub const SPAWN_PAUSE: RangeInclusive<u64> = 1..=2;
pub const PRODUCE_PAUSE: RangeInclusive<u64> = 1..=3;
pub const CONSUME_PAUSE: RangeInclusive<u64> = 1..=5;

/// Sleeps a random whole number of seconds from `secs`, scaled by `scale`.
pub fn pause(rng: &mut impl Rng, secs: RangeInclusive<u64>, scale: f64) {
    let secs = rng.gen_range(secs);
    if scale > 0.0 {
        thread::sleep(Duration::from_secs_f64(secs as f64 * scale));
    }
}
