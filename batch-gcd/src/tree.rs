//! Product-tree construction.
//!
//! Folds the input moduli bottom-up into a balanced pairwise-product
//! tree, streaming every level to the store as it is produced: the tree
//! for millions of 2048-bit keys does not fit in RAM, so at most two
//! levels are ever resident. The single element of the top level is
//! Z = Π Nᵢ.

use num_bigint::BigUint;
use rayon::prelude::*;

use crate::error::Error;
use crate::store::LevelStore;

/// Per-level element counts recorded while the tree is built, consumed
/// by the descent to know how many files each level holds.
#[derive(Debug, Clone)]
pub struct TreeManifest {
    floor_sizes: Vec<usize>,
}

impl TreeManifest {
    /// Total number of levels, leaves included.
    pub fn levels(&self) -> usize {
        self.floor_sizes.len()
    }

    /// Element count of level `level`.
    pub fn floor_size(&self, level: usize) -> usize {
        self.floor_sizes[level]
    }

    /// Number of input moduli (the size of level 0).
    pub fn leaf_count(&self) -> usize {
        self.floor_sizes[0]
    }
}

/// Build the product tree of `moduli`, persisting each level through the
/// store, and return the level manifest.
///
/// Takes the input vector by value: the leaves are dropped as soon as
/// level 0 is on disk and its pair products exist, so their RAM is
/// available for the much larger products higher up. Callers that still
/// need the leaves afterwards read level 0 back from the store.
pub fn build_product_tree(
    store: &LevelStore,
    moduli: Vec<BigUint>,
) -> Result<TreeManifest, Error> {
    if moduli.is_empty() {
        return Err(Error::Invariant(
            "cannot build a product tree from zero moduli".into(),
        ));
    }

    let mut floor_sizes = Vec::new();
    let mut current = moduli;
    let mut level = 0;
    while current.len() > 1 {
        floor_sizes.push(current.len());
        store.write_level(level, &current)?;

        log::info!(
            "multiplying {} integers of {} bits",
            current.len(),
            current[0].bits()
        );
        // Pairwise products; an odd tail is promoted unchanged (orphan
        // carry), keeping parent(i) = i/2 valid at every level.
        let next: Vec<BigUint> = current
            .par_chunks(2)
            .map(|pair| match pair {
                [a, b] => a * b,
                [orphan] => orphan.clone(),
                _ => unreachable!(),
            })
            .collect();

        // The previous level (the caller's leaves, on the first pass) is
        // released here, after it has been persisted.
        current = next;
        level += 1;
    }

    floor_sizes.push(current.len());
    store.write_level(level, &current)?;
    Ok(TreeManifest { floor_sizes })
}
