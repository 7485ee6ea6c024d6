// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per epoch next to the checkpoints.
//
// Columns:
//   - epoch:              the epoch number (1, 2, 3, ...)
//   - train_loss:         mean mesh loss over training batches
//   - f_score:            mean validation F-score of the epoch
//   - best_f_score:       best F-score of the run so far
//   - checkpoint_written: 1 if this epoch overwrote the checkpoint
//
// Example:
//   epoch,train_loss,f_score,best_f_score,checkpoint_written
//   1,0.412300,0.410000,0.410000,1
//   2,0.398100,0.390000,0.410000,0
//
// Rows are appended, so several runs can share one file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,f_score,best_f_score,checkpoint_written";

/// One row of metrics for a single epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:              usize,
    pub train_loss:         f64,
    pub f_score:            f64,
    pub best_f_score:       f64,
    pub checkpoint_written: bool,
}

/// Appends epoch metrics to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.f_score,
            m.best_f_score,
            u8::from(m.checkpoint_written),
        )?;

        tracing::debug!("Logged epoch {} metrics: f_score={:.4}", m.epoch, m.f_score);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn row(epoch: usize, written: bool) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.5,
            f_score: 0.41,
            best_f_score: 0.41,
            checkpoint_written: written,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(1, true)).unwrap();
        logger.log(&row(2, false)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "1,0.500000,0.410000,0.410000,1");
        assert_eq!(lines[2], "2,0.500000,0.410000,0.410000,0");
    }

    #[test]
    fn test_existing_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&row(1, true)).unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&row(1, true)).unwrap();

        let text = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(text.lines().filter(|l| *l == HEADER).count(), 1);
        assert_eq!(text.lines().count(), 3);
    }
}
