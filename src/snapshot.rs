// Network Snapshot Loading — one CSV of real node records, read once at startup
// Each record carries the declared role, observed uptime, and total stake.

use std::path::Path;

use serde::Deserialize;

/// Declared role field of a snapshot record. Anything that is not a mixnode
/// is treated as a gateway (the snapshot distinguishes entry/exit gateways,
/// but layer placement is randomized at topology build time anyway).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredRole {
    Mixnode,
    #[serde(other)]
    Gateway,
}

/// One row of the network snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRecord {
    pub declared_role: DeclaredRole,
    /// Observed uptime fraction in [0, 1].
    pub uptime: f64,
    /// Total stake in micro-units (explorer format).
    pub total_stake: f64,
}

/// Errors raised while reading the snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] csv::Error),

    #[error("snapshot contains no node records")]
    Empty,
}

/// Read all node records from a snapshot CSV.
pub fn load_snapshot(path: &Path) -> Result<Vec<SnapshotRecord>, SnapshotError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: SnapshotRecord = row?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_and_fields() {
        let data = "declared_role,uptime,total_stake\n\
                    mixnode,0.97,1500000000\n\
                    entry_gateway,0.88,20000000\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let records: Vec<SnapshotRecord> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("valid csv");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].declared_role, DeclaredRole::Mixnode);
        assert_eq!(records[1].declared_role, DeclaredRole::Gateway);
        assert!((records[0].uptime - 0.97).abs() < f64::EPSILON);
    }
}
