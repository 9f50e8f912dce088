//! Key statistics: Shannon entropy and quantum bit error rate.

use crate::protocols::Session;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Base-2 Shannon entropy of the empirical bit distribution of `bits`.
///
/// An empty key is treated as equiprobable, so its entropy is 1.0.
pub fn compute_entropy(bits: &[bool]) -> f64 {
    if bits.is_empty() {
        return 1.0;
    }

    let ones = bits.iter().filter(|&&b| b).count();
    let total = bits.len() as f64;

    [ones, bits.len() - ones]
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Fraction of positions where two index-aligned keys differ.
///
/// Empty input gives 0.0. Sequences of different length are compared over
/// their common prefix.
pub fn compute_qber(reference: &[bool], measured: &[bool]) -> f64 {
    if reference.len() != measured.len() {
        warn!(
            reference = reference.len(),
            measured = measured.len(),
            "QBER on keys of different length, comparing common prefix"
        );
    }

    let aligned = reference.len().min(measured.len());
    if aligned == 0 {
        return 0.0;
    }

    let errors = reference
        .iter()
        .zip(measured)
        .filter(|(a, b)| a != b)
        .count();
    errors as f64 / aligned as f64
}

/// Renders bits as a `'0'`/`'1'` string.
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Length, entropy and (where a reference exists) QBER of a session's key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub length: usize,
    pub entropy: f64,
    /// Only protocols that keep a reference key (BB84) have a QBER.
    pub qber: Option<f64>,
}

impl KeyStatistics {
    pub fn of(session: &Session) -> Self {
        let key = session.sifted_key();
        Self {
            length: key.len(),
            entropy: compute_entropy(key),
            qber: session
                .reference_key()
                .map(|reference| compute_qber(reference, key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BornRuleModel;
    use crate::protocols::{bb84::Bb84, e92::E92, run_session};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn entropy_of_balanced_key_is_one() {
        assert!((compute_entropy(&bits("0101")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_constant_key_is_zero() {
        assert_eq!(compute_entropy(&bits("0000")), 0.0);
        assert_eq!(compute_entropy(&bits("1")), 0.0);
    }

    #[test]
    fn entropy_of_empty_key_is_one() {
        assert_eq!(compute_entropy(&[]), 1.0);
    }

    #[test]
    fn entropy_of_skewed_key() {
        // p = 1/4: H = 0.811278...
        let h = compute_entropy(&bits("0001"));
        assert!((h - 0.811_278_124_459_132_8).abs() < 1e-12);
    }

    #[test]
    fn qber_counts_mismatches() {
        assert_eq!(compute_qber(&bits("0110"), &bits("0110")), 0.0);
        assert_eq!(compute_qber(&bits("0110"), &bits("1110")), 0.25);
        assert_eq!(compute_qber(&bits("01"), &bits("10")), 1.0);
    }

    #[test]
    fn qber_of_empty_keys_is_zero() {
        assert_eq!(compute_qber(&[], &[]), 0.0);
        assert_eq!(compute_qber(&bits("01"), &[]), 0.0);
    }

    #[test]
    fn qber_uses_common_prefix_for_ragged_input() {
        assert_eq!(compute_qber(&bits("011"), &bits("00")), 0.5);
        assert_eq!(compute_qber(&bits("00"), &bits("011")), 0.5);
    }

    #[test]
    fn only_bb84_statistics_carry_qber() {
        let model = BornRuleModel::new();
        let bb84 = run_session(&Bb84, &model, 100, &mut ChaCha8Rng::seed_from_u64(1));
        let e92 = run_session(&E92, &model, 100, &mut ChaCha8Rng::seed_from_u64(1));

        let stats = bb84.statistics();
        assert_eq!(stats.qber, Some(0.0));
        assert_eq!(stats.length, bb84.sifted_length());
        assert!((0.0..=1.0).contains(&stats.entropy));
        assert_eq!(e92.statistics().qber, None);
    }

    #[test]
    fn noisy_channel_raises_bb84_qber() {
        let model = BornRuleModel::new().with_flip_probability(0.2);
        let session = run_session(&Bb84, &model, 4000, &mut ChaCha8Rng::seed_from_u64(3));
        let qber = session.statistics().qber.unwrap();
        assert!((0.15..0.25).contains(&qber), "qber = {qber}");
    }
}
