//! Shared number-theory utilities and RSA key generation for the batch-GCD
//! pipeline: random primes, Miller-Rabin, and synthesis of moduli batches
//! in which a known subset of keys share a prime factor.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::seq::SliceRandom;
use rand::Rng;

/// An RSA modulus with known factors, used as ground truth when
/// synthesizing test datasets.
#[derive(Debug, Clone)]
pub struct RsaTarget {
    pub n: BigUint,
    pub p: BigUint,
    pub q: BigUint,
    pub bit_size: u32,
}

/// Generate a random prime of approximately `bits` bit size.
/// Uses probabilistic primality testing.
pub fn random_prime(bits: u32, rng: &mut impl Rng) -> BigUint {
    assert!(bits >= 2, "Cannot generate a prime with fewer than 2 bits");
    loop {
        let num_bytes = (bits as usize + 7) / 8;
        let mut bytes = vec![0u8; num_bytes];
        rng.fill(&mut bytes[..]);

        // Clear excess high bits so the candidate fits in `bits` bits,
        // then pin the top bit so it has exactly `bits` bits.
        let excess_bits = (num_bytes * 8) as u32 - bits;
        if excess_bits > 0 {
            bytes[0] &= (1u8 << (8 - excess_bits)) - 1;
        }
        let top_bit_in_byte = (bits - 1) % 8;
        bytes[0] |= 1u8 << top_bit_in_byte;

        // Odd candidates only
        if let Some(last) = bytes.last_mut() {
            *last |= 0x01;
        }

        let candidate = BigUint::from_bytes_be(&bytes);
        debug_assert!(candidate.bits() == bits as u64);
        if is_probably_prime(&candidate, 20) {
            return candidate;
        }
    }
}

/// Generate an RSA target with the given modulus bit size. The two prime
/// factors are distinct.
pub fn generate_rsa_target(bits: u32, rng: &mut impl Rng) -> RsaTarget {
    let half_bits = bits / 2;
    let p = random_prime(half_bits, rng);
    let q = loop {
        let q = random_prime(half_bits, rng);
        if q != p {
            break q;
        }
    };
    let n = &p * &q;
    RsaTarget {
        n,
        p,
        q,
        bit_size: bits,
    }
}

/// Miller-Rabin probabilistic primality test.
pub fn is_probably_prime(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = &one + &one;
    let three = &two + &one;

    if *n < two {
        return false;
    }
    if *n == two || *n == three {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // Write n-1 as 2^r * d
    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut r: u32 = 0;
    while d.is_even() {
        d >>= 1u32;
        r += 1;
    }

    let mut rng = rand::thread_rng();

    'witness: for _ in 0..rounds {
        // Random witness a in [2, n-2]
        let a = loop {
            let bytes = n.to_bytes_be();
            let mut random_bytes = vec![0u8; bytes.len()];
            rng.fill(&mut random_bytes[..]);
            let a = BigUint::from_bytes_be(&random_bytes) % n;
            if a >= two && a <= &n_minus_1 - &one {
                break a;
            }
        };

        let mut x = mod_pow(&a, &d, n);
        if x == one || x == n_minus_1 {
            continue 'witness;
        }

        for _ in 0..r - 1 {
            x = mod_pow(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Modular exponentiation: base^exp mod modulus.
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// A batch of RSA moduli where a known subset share a prime factor with
/// another member of the batch.
#[derive(Debug, Clone)]
pub struct SharedFactorBatch {
    /// The moduli, in output order.
    pub moduli: Vec<BigUint>,
    /// Indices of moduli that share a prime with some other member.
    pub compromised: Vec<usize>,
}

/// Synthesize `count` RSA moduli of `bits` bits, of which `shared_pairs`
/// pairs share one prime factor (so `2 * shared_pairs` moduli are
/// compromised). The batch is shuffled so compromised keys are scattered
/// through it, and all primes are pairwise distinct apart from the
/// deliberately shared ones.
pub fn generate_shared_factor_batch(
    count: usize,
    bits: u32,
    shared_pairs: usize,
    rng: &mut impl Rng,
) -> SharedFactorBatch {
    assert!(
        2 * shared_pairs <= count,
        "{} shared pairs need at least {} moduli, batch holds {}",
        shared_pairs,
        2 * shared_pairs,
        count
    );

    let half_bits = bits / 2;
    let mut used_primes: Vec<BigUint> = Vec::new();

    // (modulus, compromised) pairs, shuffled below.
    let mut entries: Vec<(BigUint, bool)> = Vec::with_capacity(count);
    for _ in 0..shared_pairs {
        let shared = fresh_prime(half_bits, &mut used_primes, rng);
        let q1 = fresh_prime(half_bits, &mut used_primes, rng);
        let q2 = fresh_prime(half_bits, &mut used_primes, rng);
        entries.push((&shared * &q1, true));
        entries.push((&shared * &q2, true));
    }
    for _ in entries.len()..count {
        let p = fresh_prime(half_bits, &mut used_primes, rng);
        let q = fresh_prime(half_bits, &mut used_primes, rng);
        entries.push((&p * &q, false));
    }
    entries.shuffle(rng);

    let compromised = entries
        .iter()
        .enumerate()
        .filter(|(_, (_, shared))| *shared)
        .map(|(i, _)| i)
        .collect();
    let moduli = entries.into_iter().map(|(n, _)| n).collect();

    SharedFactorBatch {
        moduli,
        compromised,
    }
}

/// Draw a random prime not already in `used`, and record it there.
fn fresh_prime(bits: u32, used: &mut Vec<BigUint>, rng: &mut impl Rng) -> BigUint {
    loop {
        let p = random_prime(bits, rng);
        if !used.contains(&p) {
            used.push(p.clone());
            return p;
        }
    }
}
