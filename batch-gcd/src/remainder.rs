//! Remainder computation: Z mod Nᵢ² for every input modulus.
//!
//! Two variants over the persisted tree:
//! 1. `compute_remainders` reads only the leaves and the root and reduces
//!    Z against each Nᵢ² directly. Minimum memory, k reductions against
//!    the full Z.
//! 2. `compute_remainders_fast` is Bernstein's descent: walk the levels
//!    top-down carrying R[i] = Z mod Lℓ[i]², so each reduction works
//!    against a modulus half the size of its parent. It holds a whole
//!    level of partial remainders; the first iteration is the memory
//!    peak (R starts as Z and the first square is about Z² in size).
//!
//! Both variants return bit-identical vectors.

use num_bigint::BigUint;
use num_traits::Zero;
use rayon::prelude::*;

use crate::error::Error;
use crate::store::LevelStore;
use crate::tree::TreeManifest;

/// Read the tree root Z, checking the top level holds exactly one element.
fn read_root(store: &LevelStore, manifest: &TreeManifest) -> Result<BigUint, Error> {
    let top = manifest.levels() - 1;
    if manifest.floor_size(top) != 1 {
        return Err(Error::Invariant(format!(
            "incomplete product tree: top level holds {} elements",
            manifest.floor_size(top)
        )));
    }
    store.read_one(top, 0)
}

/// Memory-frugal variant: R[i] = Z mod Nᵢ² straight from the leaves.
pub fn compute_remainders(
    store: &LevelStore,
    manifest: &TreeManifest,
) -> Result<Vec<BigUint>, Error> {
    let z = read_root(store, manifest)?;
    let leaves = store.read_level(0, manifest.leaf_count())?;
    leaves
        .par_iter()
        .map(|n| {
            if n.is_zero() {
                return Err(Error::Arithmetic(
                    "zero modulus at level 0, tree is corrupt".into(),
                ));
            }
            Ok(&z % (n * n))
        })
        .collect()
}

/// Bernstein descent: level-by-level partial remainders.
pub fn compute_remainders_fast(
    store: &LevelStore,
    manifest: &TreeManifest,
) -> Result<Vec<BigUint>, Error> {
    let z = read_root(store, manifest)?;
    let mut remainders = vec![z];

    for level in (0..manifest.levels() - 1).rev() {
        let m = manifest.floor_size(level);
        if m.div_ceil(2) != remainders.len() {
            return Err(Error::Invariant(format!(
                "level {} holds {} elements but level {} holds {}",
                level,
                m,
                level + 1,
                remainders.len()
            )));
        }
        log::info!("computing {} partial remainders at level {}", m, level);

        let mut next = Vec::with_capacity(m);
        for i in 0..m {
            let y = store.read_one(level, i)?;
            if y.is_zero() {
                return Err(Error::Arithmetic(format!(
                    "zero element at level {} index {}, tree is corrupt",
                    level, i
                )));
            }
            // parent(i) = i/2 holds for orphans too: an unpaired tail
            // element was promoted unchanged.
            let square = &y * &y;
            next.push(&remainders[i / 2] % square);
        }
        remainders = next;
    }

    Ok(remainders)
}
