//! Batch-GCD factorization of RSA moduli (Bernstein's product/remainder
//! trees).
//!
//! Given a batch N₀…N_{k-1} of public moduli, finds every modulus that
//! shares a prime factor with another member of the batch (and is
//! therefore factorable) without the infeasible O(k²) pairwise GCDs:
//!
//! 1. Fold the moduli into a product tree whose root is Z = Π Nᵢ,
//!    streaming every level to disk (`tree`): the tree for millions of
//!    2048-bit keys occupies tens of gigabytes.
//! 2. Compute R[i] = Z mod Nᵢ² from the persisted levels (`remainder`).
//! 3. For each modulus, gcd(R[i] / Nᵢ, Nᵢ) > 1 exposes a shared prime
//!    and with it the full factorization of Nᵢ (`extract`).

pub mod error;
pub mod extract;
pub mod input;
pub mod remainder;
pub mod store;
pub mod tree;

pub use error::Error;
pub use extract::{extract_gcds, scan_outcome, CompromisedKey, ScanOutcome};
pub use input::{read_moduli_csv, ModuliTable};
pub use remainder::{compute_remainders, compute_remainders_fast};
pub use store::LevelStore;
pub use tree::{build_product_tree, TreeManifest};

/// Run the full pipeline over an in-memory moduli table: build the tree,
/// compute the remainders (Bernstein descent when `fast` is set), and
/// extract the gcds. The leaves are re-read from level 0 for the final
/// stage; the table's modulus vector is consumed by the tree build.
pub fn scan(store: &LevelStore, table: ModuliTable, fast: bool) -> Result<ScanOutcome, Error> {
    let ModuliTable { ids, moduli } = table;
    let manifest = build_product_tree(store, moduli)?;
    let remainders = if fast {
        compute_remainders_fast(store, &manifest)?
    } else {
        compute_remainders(store, &manifest)?
    };
    let leaves = store.read_level(0, manifest.leaf_count())?;
    let gcds = extract_gcds(&leaves, remainders)?;
    Ok(scan_outcome(&ids, &gcds))
}
