//! Integration tests for the batch-GCD pipeline: the end-to-end scan
//! scenarios, persistence round trips, and equivalence of the two
//! remainder variants on a realistic random batch.

use std::io::Write;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use rand::SeedableRng;

use batch_gcd::extract::{extract_gcds, scan_outcome, ScanOutcome};
use batch_gcd::input::{read_moduli_csv, ModuliTable};
use batch_gcd::remainder::{compute_remainders, compute_remainders_fast};
use batch_gcd::store::LevelStore;
use batch_gcd::tree::build_product_tree;
use factoring_core::{generate_rsa_target, generate_shared_factor_batch};

fn biguints(values: &[u64]) -> Vec<BigUint> {
    values.iter().map(|&v| BigUint::from(v)).collect()
}

/// Run the full pipeline over in-memory moduli with sequential IDs.
fn scan_moduli(moduli: Vec<BigUint>, fast: bool) -> ScanOutcome {
    let dir = tempfile::tempdir().unwrap();
    let store = LevelStore::new(dir.path());
    let ids: Vec<i64> = (0..moduli.len() as i64).collect();
    batch_gcd::scan(&store, ModuliTable { ids, moduli }, fast).unwrap()
}

// ============================================================
// End-to-end scan scenarios
// ============================================================

#[test]
fn test_coprime_pair_is_clean() {
    // N = [15, 77]: Z = 1155, R = [30, 1155], both gcds are 1.
    let outcome = scan_moduli(biguints(&[15, 77]), false);
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.compromised_count(), 0);
}

#[test]
fn test_shared_factor_pair_is_flagged() {
    // N = [15, 21] share 3: R = [90, 315], gcds = [3, 3].
    let outcome = scan_moduli(biguints(&[15, 21]), false);
    assert_eq!(outcome.compromised_count(), 2);
    assert_eq!(outcome.compromised[0].factor, "3");
    assert_eq!(outcome.compromised[1].factor, "3");
}

#[test]
fn test_pairwise_shared_odd_batch() {
    // N = [6, 10, 15]: every pair shares a prime, and the odd count
    // exercises the orphan carry. All three moduli surface whole.
    for fast in [false, true] {
        let outcome = scan_moduli(biguints(&[6, 10, 15]), fast);
        assert_eq!(outcome.compromised_count(), 3);
        let factors: Vec<&str> = outcome
            .compromised
            .iter()
            .map(|k| k.factor.as_str())
            .collect();
        assert_eq!(factors, vec!["6", "10", "15"]);
    }
}

#[test]
fn test_single_modulus_batch() {
    // k = 1: L = 1, R = [7 mod 49] = [7], gcd(7/7, 7) = 1.
    for fast in [false, true] {
        let outcome = scan_moduli(biguints(&[7]), fast);
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.compromised_count(), 0);
    }
}

// ============================================================
// Persistence
// ============================================================

#[test]
fn test_level_zero_round_trips_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = LevelStore::new(dir.path());

    let mut rng = StdRng::seed_from_u64(101);
    let moduli: Vec<BigUint> = (0..17)
        .map(|_| generate_rsa_target(128, &mut rng).n)
        .collect();
    let manifest = build_product_tree(&store, moduli.clone()).unwrap();

    assert_eq!(store.read_level(0, manifest.leaf_count()).unwrap(), moduli);
}

// ============================================================
// Variant equivalence
// ============================================================

#[test]
fn test_variants_agree_on_random_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = LevelStore::new(dir.path());

    // 100 moduli, a few of them sharing primes.
    let mut rng = StdRng::seed_from_u64(202);
    let batch = generate_shared_factor_batch(100, 64, 4, &mut rng);
    let manifest = build_product_tree(&store, batch.moduli).unwrap();

    let frugal = compute_remainders(&store, &manifest).unwrap();
    let fast = compute_remainders_fast(&store, &manifest).unwrap();
    assert_eq!(frugal.len(), 100);
    assert_eq!(frugal, fast);
}

// ============================================================
// Generated datasets: ground truth end to end
// ============================================================

#[test]
fn test_generated_batch_ground_truth() {
    let mut rng = StdRng::seed_from_u64(303);
    let batch = generate_shared_factor_batch(24, 96, 3, &mut rng);

    let outcome = scan_moduli(batch.moduli.clone(), false);
    let flagged: Vec<usize> = outcome.compromised.iter().map(|k| k.index).collect();
    assert_eq!(flagged, batch.compromised);

    // Each reported factor really divides its modulus, non-trivially.
    let one = BigUint::one();
    for key in &outcome.compromised {
        let factor: BigUint = key.factor.parse().unwrap();
        let n = &batch.moduli[key.index];
        assert!(factor > one && &factor < n);
        assert!((n % &factor).is_zero());
    }
}

// ============================================================
// CSV input to report output
// ============================================================

#[test]
fn test_csv_scan_and_report_round_trip() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    write!(csv, "100,,15\n200,,21\n300,,11\n").unwrap();

    let table = read_moduli_csv(csv.path()).unwrap();
    assert_eq!(table.ids, vec![100, 200, 300]);

    let dir = tempfile::tempdir().unwrap();
    let store = LevelStore::new(dir.path());
    let ModuliTable { ids, moduli } = table;
    let manifest = build_product_tree(&store, moduli).unwrap();
    let remainders = compute_remainders(&store, &manifest).unwrap();
    let leaves = store.read_level(0, manifest.leaf_count()).unwrap();
    let gcds = extract_gcds(&leaves, remainders).unwrap();
    let outcome = scan_outcome(&ids, &gcds);

    assert_eq!(outcome.compromised_count(), 2);
    assert_eq!(outcome.compromised[0].id, 100);
    assert_eq!(outcome.compromised[1].id, 200);

    // The JSON report round-trips.
    let json = serde_json::to_string_pretty(&outcome).unwrap();
    let back: ScanOutcome = serde_json::from_str(&json).unwrap();
    assert_eq!(back.total, outcome.total);
    assert_eq!(back.compromised.len(), outcome.compromised.len());
    assert_eq!(back.compromised[0].factor, outcome.compromised[0].factor);
}

// ============================================================
// Remainder correctness against the definition
// ============================================================

#[test]
fn test_remainders_match_definition_on_random_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = LevelStore::new(dir.path());

    let mut rng = StdRng::seed_from_u64(404);
    let moduli: Vec<BigUint> = (0..9)
        .map(|_| generate_rsa_target(64, &mut rng).n)
        .collect();
    let z: BigUint = moduli.iter().product();

    let manifest = build_product_tree(&store, moduli.clone()).unwrap();
    let remainders = compute_remainders_fast(&store, &manifest).unwrap();
    for (n, r) in moduli.iter().zip(&remainders) {
        assert_eq!(*r, &z % (n * n));
    }

    // And the final gcds match the pairwise definition.
    let gcds = extract_gcds(&moduli, remainders).unwrap();
    let one = BigUint::one();
    for (i, n) in moduli.iter().enumerate() {
        let others: BigUint = moduli
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, m)| m)
            .product();
        assert_eq!(gcds[i] > one, n.gcd(&others) > one);
    }
}
