//! Background audio: a soft drone rendered once and looped by the backend.

use std::f64::consts::TAU;

/// Length of one loop. Every partial and the swell complete a whole number
/// of cycles in it, so the loop joins without a click.
pub const AMBIENT_LOOP_SECS: u32 = 4;

const PARTIALS: [(f64, f32); 3] = [(110.0, 0.05), (165.0, 0.03), (220.0, 0.02)];
const SWELL_HZ: f64 = 0.25;

/// One loop of the drone, mono at `sample_rate`.
pub fn render_ambient_loop(sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let len = (AMBIENT_LOOP_SECS * sample_rate) as usize;
    (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            let swell = 0.75 + 0.25 * (TAU * SWELL_HZ * t).cos() as f32;
            let drone: f32 = PARTIALS
                .iter()
                .map(|&(hz, gain)| gain * (TAU * hz * t).sin() as f32)
                .sum();
            swell * drone
        })
        .collect()
}
