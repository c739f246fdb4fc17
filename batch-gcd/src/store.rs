//! On-disk store for product-tree levels.
//!
//! Each level ℓ lives in `<root>/level<ℓ>/`, one integer per file
//! (`0.bin`, `1.bin`, …). A file holds a 4-byte big-endian length header
//! followed by the big-endian magnitude bytes, mirroring the GMP raw
//! framing of the original on-disk trees. One file per integer keeps
//! single-element reads during the descent cheap, at the cost of inode
//! pressure.
//!
//! The store is single-threaded scratch space: callers persist a level
//! completely before reading anything back, and a missing or truncated
//! file is fatal.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use num_bigint::BigUint;

use crate::error::Error;

/// Handle to a product-tree directory.
#[derive(Debug, Clone)]
pub struct LevelStore {
    root: PathBuf,
}

impl LevelStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        LevelStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding level `level`.
    fn level_dir(&self, level: usize) -> PathBuf {
        self.root.join(format!("level{}", level))
    }

    fn element_path(&self, level: usize, index: usize) -> PathBuf {
        self.level_dir(level).join(format!("{}.bin", index))
    }

    /// Persist an ordered level, one file per element. Overwrites any
    /// previous run's files at the same paths.
    pub fn write_level(&self, level: usize, values: &[BigUint]) -> Result<(), Error> {
        let dir = self.level_dir(level);
        fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e))?;
        log::info!(
            "writing level {} ({} files) to {}",
            level,
            values.len(),
            dir.display()
        );
        for (i, value) in values.iter().enumerate() {
            write_raw(&self.element_path(level, i), value)?;
        }
        Ok(())
    }

    /// Read back the `count` elements of a level, in order.
    pub fn read_level(&self, level: usize, count: usize) -> Result<Vec<BigUint>, Error> {
        log::info!(
            "reading level {} ({} files) from {}",
            level,
            count,
            self.level_dir(level).display()
        );
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(self.read_one(level, i)?);
        }
        Ok(values)
    }

    /// Read a single element of a level.
    pub fn read_one(&self, level: usize, index: usize) -> Result<BigUint, Error> {
        read_raw(&self.element_path(level, index))
    }
}

/// Serialize one integer: u32 big-endian byte length, then the magnitude
/// in big-endian byte order.
fn write_raw(path: &Path, value: &BigUint) -> Result<(), Error> {
    let bytes = value.to_bytes_be();
    let len = u32::try_from(bytes.len()).map_err(|_| {
        Error::Invariant(format!(
            "integer of {} bytes exceeds the raw record format",
            bytes.len()
        ))
    })?;
    let mut file = File::create(path).map_err(|e| Error::storage(path, e))?;
    file.write_all(&len.to_be_bytes())
        .and_then(|_| file.write_all(&bytes))
        .map_err(|e| Error::storage(path, e))
}

/// Inverse of `write_raw`. A short header or body means the record was
/// truncated and is reported as a storage error.
fn read_raw(path: &Path) -> Result<BigUint, Error> {
    let mut file = File::open(path).map_err(|e| Error::storage(path, e))?;
    let mut header = [0u8; 4];
    file.read_exact(&mut header)
        .map_err(|e| Error::storage(path, e))?;
    let len = u32::from_be_bytes(header) as usize;
    let mut bytes = vec![0u8; len];
    file.read_exact(&mut bytes)
        .map_err(|e| Error::storage(path, e))?;
    Ok(BigUint::from_bytes_be(&bytes))
}
