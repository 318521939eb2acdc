//! Append-only spin history
//!
//! One JSON line per completed spin, keyed by spin id: bet, win, step
//! count, and the per-step validation hashes. Enough for compliance
//! review and long-run RTP verification without persisting full grids.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gf_engine::cascade::SpinResult;

use crate::error::SyncError;

/// One history line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub spin_id: String,
    pub recorded_at: DateTime<Utc>,
    pub bet: f64,
    pub total_win: f64,
    pub total_multiplier: u32,
    pub step_count: u32,
    pub step_hashes: Vec<String>,
}

impl AuditRecord {
    pub fn from_spin(spin: &SpinResult) -> Self {
        Self {
            spin_id: spin.spin_id.clone(),
            recorded_at: Utc::now(),
            bet: spin.bet,
            total_win: spin.total_win,
            total_multiplier: spin.total_multiplier,
            step_count: spin.steps.len() as u32,
            step_hashes: spin.steps.iter().map(|s| s.validation_hash.clone()).collect(),
        }
    }
}

/// Append-only JSON Lines log.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed spin.
    pub fn append(&self, spin: &SpinResult) -> Result<(), SyncError> {
        let record = AuditRecord::from_spin(spin);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read the full history (verification tooling, tests).
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, SyncError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_engine::{CascadeEngine, GameConfig, SpinRng};

    #[test]
    fn test_append_and_read_back() {
        let dir = std::env::temp_dir().join(format!("gf-audit-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let log = AuditLog::new(dir.join("spins.jsonl"));

        let mut engine =
            CascadeEngine::with_rng(GameConfig::default(), SpinRng::seeded("audit").unwrap());
        let a = engine.spin(1.0).unwrap();
        let b = engine.spin(2.0).unwrap();
        log.append(&a).unwrap();
        log.append(&b).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].spin_id, a.spin_id);
        assert_eq!(records[1].bet, 2.0);
        assert_eq!(records[0].step_count as usize, a.steps.len());
        assert_eq!(
            records[0].step_hashes,
            a.steps
                .iter()
                .map(|s| s.validation_hash.clone())
                .collect::<Vec<_>>()
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let log = AuditLog::new("/nonexistent/gf-audit/never.jsonl");
        assert!(log.read_all().unwrap().is_empty());
    }
}
