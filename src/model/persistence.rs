//! Snapshot files: validated rkyv archives for checkpoints, JSON for
//! inspection.

use anyhow::Result;
use std::path::Path;
use tessera_data::LatticeSnapshot;

pub fn save_rkyv<P: AsRef<Path>>(snapshot: &LatticeSnapshot, path: P) -> Result<()> {
    let bytes = rkyv::to_bytes::<_, 4096>(snapshot)
        .map_err(|e| anyhow::anyhow!("Rkyv serialization error: {e:?}"))?;
    std::fs::write(path, bytes.as_slice())?;
    Ok(())
}

/// Reads an archive written by [`save_rkyv`], validating it first.
pub fn load_rkyv<P: AsRef<Path>>(path: P) -> Result<LatticeSnapshot> {
    let mut bytes = rkyv::AlignedVec::new();
    bytes.extend_from_slice(&std::fs::read(path)?);
    rkyv::from_bytes::<LatticeSnapshot>(&bytes)
        .map_err(|e| anyhow::anyhow!("Rkyv validation error: {e:?}"))
}

pub fn save_json<P: AsRef<Path>>(snapshot: &LatticeSnapshot, path: P) -> Result<()> {
    std::fs::write(path, serde_json::to_string(snapshot)?)?;
    Ok(())
}

pub fn load_json<P: AsRef<Path>>(path: P) -> Result<LatticeSnapshot> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
