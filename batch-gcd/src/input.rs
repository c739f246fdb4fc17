//! CSV ingestion of the moduli table.
//!
//! One modulus per row, three comma-separated fields:
//! `id,<ignored>,modulus_decimal`. Only columns 0 and 2 are consumed;
//! the middle column is tolerated and ignored. IDs are opaque external
//! identifiers that travel alongside the moduli and are never reordered.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::Error;

/// The parsed moduli table: IDs and moduli as parallel vectors, in
/// input order.
#[derive(Debug, Default)]
pub struct ModuliTable {
    pub ids: Vec<i64>,
    pub moduli: Vec<BigUint>,
}

impl ModuliTable {
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }
}

/// Read a moduli table from a CSV file. Blank lines are skipped; a zero
/// modulus is rejected up front since it would poison the whole product.
pub fn read_moduli_csv(path: impl AsRef<Path>) -> Result<ModuliTable, Error> {
    let path = path.as_ref();
    log::info!("reading moduli from {}", path.display());
    let file = File::open(path).map_err(|e| Error::storage(path, e))?;
    let reader = BufReader::new(file);

    let mut table = ModuliTable::default();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.map_err(|e| Error::storage(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(Error::input(
                path,
                lineno,
                format!("expected 3 comma-separated fields, found {}", fields.len()),
            ));
        }

        let id = fields[0]
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::input(path, lineno, format!("bad id: {}", e)))?;
        let modulus = fields[2]
            .trim()
            .parse::<BigUint>()
            .map_err(|e| Error::input(path, lineno, format!("bad modulus: {}", e)))?;
        if modulus.is_zero() {
            return Err(Error::Invariant(format!(
                "modulus with id {} is zero",
                id
            )));
        }

        table.ids.push(id);
        table.moduli.push(modulus);
    }

    log::info!("read {} moduli", table.len());
    Ok(table)
}
