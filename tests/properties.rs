use proptest::prelude::*;
use qkd_sim::detection::AnomalyClassifier;
use qkd_sim::model::BornRuleModel;
use qkd_sim::protocols::{Protocol, run_session};
use qkd_sim::statistics::{compute_entropy, compute_qber};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

proptest! {
    #[test]
    fn entropy_is_symmetric_under_bit_flip(bits in prop::collection::vec(any::<bool>(), 0..200)) {
        let flipped: Vec<bool> = bits.iter().map(|b| !b).collect();
        let h = compute_entropy(&bits);
        prop_assert!((h - compute_entropy(&flipped)).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&h));
    }

    #[test]
    fn qber_of_identical_keys_is_zero(bits in prop::collection::vec(any::<bool>(), 0..200)) {
        prop_assert_eq!(compute_qber(&bits, &bits), 0.0);
    }

    #[test]
    fn qber_is_symmetric(
        pairs in prop::collection::vec((any::<bool>(), any::<bool>()), 0..200)
    ) {
        let (a, b): (Vec<bool>, Vec<bool>) = pairs.into_iter().unzip();
        let q = compute_qber(&a, &b);
        prop_assert_eq!(q, compute_qber(&b, &a));
        prop_assert!((0.0..=1.0).contains(&q));
    }

    #[test]
    fn classifier_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let classifier = AnomalyClassifier::default();
        let low = classifier.classify(lo, false);
        let high = classifier.classify(hi, false);
        prop_assert!(low.confidence <= high.confidence);
        prop_assert!(low.severity <= high.severity);
        prop_assert!(!low.is_anomaly || high.is_anomaly);
    }

    #[test]
    fn sessions_have_n_rounds(n in 0usize..120, seed in any::<u64>()) {
        let model = BornRuleModel::new();
        for protocol in Protocol::ALL {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let session = run_session(protocol.driver().as_ref(), &model, n, &mut rng);
            prop_assert_eq!(session.raw_length(), n);
            if matches!(protocol, Protocol::E92 | Protocol::SixState) {
                prop_assert_eq!(session.sifted_length(), n);
            } else {
                prop_assert!(session.sifted_length() <= n);
            }
        }
    }

    #[test]
    fn noiseless_bb84_is_deterministic_on_agreeing_bases(n in 1usize..150, seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let session = run_session(Protocol::Bb84.driver().as_ref(), &BornRuleModel::new(), n, &mut rng);
        for &i in session.sifted_indices() {
            let round = session.rounds()[i];
            prop_assert_eq!(round.key_bit(), round.alice_bit());
        }
        prop_assert_eq!(session.reference_key(), Some(session.sifted_key()));
    }
}

