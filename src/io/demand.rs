// src/io/demand.rs

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};

/// Length of the built-in preset patterns.
pub const PRESET_ROUNDS: usize = 36;

/// Names accepted by [`preset`].
pub const PRESET_NAMES: [&str; 5] = ["classic", "steady", "ramp", "spike", "seasonal"];

/// Generates a demand schedule where every round has the exact same order amount.
pub fn generate_constant_demand(rounds: usize, value: u32) -> Vec<u32> {
    vec![value; rounds]
}

/// Generates a "Step" pattern: 4 rounds of 4, then 8 for the rest.
/// This is the classic scenario used in the MIT Beer Game to trigger the Bullwhip effect.
pub fn generate_classic_beer_game_demand(rounds: usize) -> Vec<u32> {
    (0..rounds).map(|r| if r < 4 { 4 } else { 8 }).collect()
}

/// Generates a demand schedule based on a Normal (Bell Curve) distribution.
///
/// Seeded so the same arguments always produce the same schedule; two games
/// configured from the same seed share a benchmark.
pub fn generate_normal_demand(
    rounds: usize,
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Result<Vec<u32>, NormalError> {
    let normal = Normal::new(mean, std_dev)?;
    let mut rng = StdRng::seed_from_u64(seed);

    // Round to the nearest unit and clamp at zero; demand cannot be negative.
    Ok((0..rounds)
        .map(|_| normal.sample(&mut rng).round().max(0.0) as u32)
        .collect())
}

/// +1 unit every 4 rounds, starting at 4.
pub fn generate_ramp_demand(rounds: usize) -> Vec<u32> {
    (0..rounds).map(|r| 4 + (r / 4) as u32).collect()
}

/// A single spike of 16 at round 5 on a flat 4.
pub fn generate_spike_demand(rounds: usize) -> Vec<u32> {
    (0..rounds).map(|r| if r == 4 { 16 } else { 4 }).collect()
}

/// Oscillates between 2 and 10 with a ten-round period.
pub fn generate_seasonal_demand(rounds: usize) -> Vec<u32> {
    const CYCLE: [u32; 10] = [4, 6, 8, 10, 10, 8, 6, 4, 2, 2];
    (0..rounds).map(|r| CYCLE[r % CYCLE.len()]).collect()
}

/// Looks up a named preset.
pub fn preset(name: &str) -> Option<Vec<u32>> {
    let pattern = match name {
        "classic" => generate_classic_beer_game_demand(PRESET_ROUNDS),
        "steady" => generate_constant_demand(PRESET_ROUNDS, 4),
        "ramp" => generate_ramp_demand(PRESET_ROUNDS),
        "spike" => generate_spike_demand(PRESET_ROUNDS),
        "seasonal" => generate_seasonal_demand(PRESET_ROUNDS),
        _ => return None,
    };
    Some(pattern)
}

/// Extends `pattern` to at least `rounds` entries by repeating its last value.
pub fn pad_to(pattern: &mut Vec<u32>, rounds: usize) {
    if let Some(&last) = pattern.last() {
        if pattern.len() < rounds {
            pattern.resize(rounds, last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_expected_shapes() {
        let classic = preset("classic").unwrap();
        assert_eq!(&classic[..6], &[4, 4, 4, 4, 8, 8]);
        assert_eq!(classic.len(), PRESET_ROUNDS);

        let ramp = preset("ramp").unwrap();
        assert_eq!(ramp[0], 4);
        assert_eq!(ramp[35], 12);

        let spike = preset("spike").unwrap();
        assert_eq!(spike.iter().filter(|&&d| d == 16).count(), 1);
        assert_eq!(spike[4], 16);

        let seasonal = preset("seasonal").unwrap();
        assert_eq!(*seasonal.iter().min().unwrap(), 2);
        assert_eq!(*seasonal.iter().max().unwrap(), 10);

        for name in PRESET_NAMES {
            assert!(preset(name).is_some(), "{name}");
        }
        assert!(preset("chaos").is_none());
    }

    #[test]
    fn normal_demand_is_reproducible_and_non_negative() {
        let a = generate_normal_demand(50, 2.0, 5.0, 7).unwrap();
        let b = generate_normal_demand(50, 2.0, 5.0, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(generate_normal_demand(5, 1.0, -1.0, 0).is_err());
    }

    #[test]
    fn pad_repeats_last_value_and_never_truncates() {
        let mut pattern = vec![4, 8];
        pad_to(&mut pattern, 5);
        assert_eq!(pattern, vec![4, 8, 8, 8, 8]);
        pad_to(&mut pattern, 2);
        assert_eq!(pattern.len(), 5);

        let mut empty: Vec<u32> = Vec::new();
        pad_to(&mut empty, 3);
        assert!(empty.is_empty());
    }
}
