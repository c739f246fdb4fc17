//! Final GCD extraction.
//!
//! With R[i] = Z mod Nᵢ², the quotient R[i] / Nᵢ is exact (Nᵢ divides Z,
//! hence divides R[i]), and gcd(R[i] / Nᵢ, Nᵢ) exceeds 1 exactly when Nᵢ
//! shares a prime with some other modulus in the batch. The gcd is then
//! a non-trivial factor of Nᵢ.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A modulus found to share a prime factor with another member of the
/// batch. The factor is carried in decimal, like the input moduli.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompromisedKey {
    pub id: i64,
    pub index: usize,
    pub factor: String,
}

/// Outcome of a full scan, serializable as the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Number of moduli scanned.
    pub total: usize,
    pub compromised: Vec<CompromisedKey>,
}

impl ScanOutcome {
    pub fn compromised_count(&self) -> usize {
        self.compromised.len()
    }
}

/// For each modulus, gcd(R[i] / Nᵢ, Nᵢ).
pub fn extract_gcds(
    moduli: &[BigUint],
    remainders: Vec<BigUint>,
) -> Result<Vec<BigUint>, Error> {
    if moduli.len() != remainders.len() {
        return Err(Error::Invariant(format!(
            "{} moduli but {} remainders",
            moduli.len(),
            remainders.len()
        )));
    }
    let mut gcds = Vec::with_capacity(moduli.len());
    for (n, r) in moduli.iter().zip(remainders) {
        if n.is_zero() {
            return Err(Error::Arithmetic("division by a zero modulus".into()));
        }
        let quotient = r / n;
        gcds.push(quotient.gcd(n));
    }
    Ok(gcds)
}

/// Pair the non-trivial gcds with their external IDs.
pub fn scan_outcome(ids: &[i64], gcds: &[BigUint]) -> ScanOutcome {
    let one = BigUint::one();
    let compromised = gcds
        .iter()
        .enumerate()
        .filter(|(_, g)| **g != one)
        .map(|(index, g)| CompromisedKey {
            id: ids[index],
            index,
            factor: g.to_string(),
        })
        .collect();
    ScanOutcome {
        total: gcds.len(),
        compromised,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biguints(values: &[u64]) -> Vec<BigUint> {
        values.iter().map(|&v| BigUint::from(v)).collect()
    }

    #[test]
    fn test_coprime_batch_is_clean() {
        // N = [15, 77], R = [30, 1155]
        let gcds = extract_gcds(&biguints(&[15, 77]), biguints(&[30, 1155])).unwrap();
        assert_eq!(gcds, biguints(&[1, 1]));
        let outcome = scan_outcome(&[10, 20], &gcds);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.compromised_count(), 0);
    }

    #[test]
    fn test_shared_factor_is_reported() {
        // N = [15, 21] share 3; R = [90, 315]
        let gcds = extract_gcds(&biguints(&[15, 21]), biguints(&[90, 315])).unwrap();
        assert_eq!(gcds, biguints(&[3, 3]));
        let outcome = scan_outcome(&[5, 6], &gcds);
        assert_eq!(outcome.compromised_count(), 2);
        assert_eq!(outcome.compromised[0].id, 5);
        assert_eq!(outcome.compromised[0].factor, "3");
        assert_eq!(outcome.compromised[1].index, 1);
    }

    #[test]
    fn test_zero_remainder_surfaces_whole_modulus() {
        // A zero remainder means Nᵢ² divides Z: gcd(0, Nᵢ) = Nᵢ.
        let gcds = extract_gcds(&biguints(&[6, 10, 15]), biguints(&[0, 0, 0])).unwrap();
        assert_eq!(gcds, biguints(&[6, 10, 15]));
        assert_eq!(scan_outcome(&[1, 2, 3], &gcds).compromised_count(), 3);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        match extract_gcds(&biguints(&[15]), biguints(&[30, 1155])) {
            Err(Error::Invariant(_)) => {}
            other => panic!("expected invariant error, got {:?}", other),
        }
    }
}
