// ============================================================
// Layer 3 — Validation Score Bookkeeping
// ============================================================
// Two small pieces of state the epoch driver relies on:
//
//   mean_score  — the epoch's score is the plain mean of the
//                 per-batch validation scores
//   BestScore   — the best epoch score seen so far in the run;
//                 a checkpoint is written only when a new score
//                 is STRICTLY greater than every previous one
//
// Reference: Rust Book §6 (Option)

use anyhow::{ensure, Result};

/// Mean of the per-batch scores.
/// An empty validation stream has no meaningful mean and is an error.
pub fn mean_score(scores: &[f64]) -> Result<f64> {
    ensure!(!scores.is_empty(), "validation produced no batches; cannot compute a mean score");
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Highest validation score observed during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestScore {
    best: Option<f64>,
}

impl BestScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an epoch score. Returns true when it strictly improves on
    /// every score seen before (the first finite score always does).
    pub fn observe(&mut self, score: f64) -> bool {
        if score.is_nan() {
            return false;
        }
        let improved = self.best.map_or(true, |best| score > best);
        if improved {
            self.best = Some(score);
        }
        improved
    }

    pub fn get(&self) -> Option<f64> {
        self.best
    }

    /// Best score for display; 0 before any epoch has finished.
    pub fn value(&self) -> f64 {
        self.best.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_batch_scores() {
        let m = mean_score(&[0.2, 0.4, 0.9]).unwrap();
        assert!((m - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_of_empty_stream_is_error() {
        assert!(mean_score(&[]).is_err());
    }

    #[test]
    fn test_first_score_improves() {
        let mut b = BestScore::new();
        assert!(b.observe(0.0));
        assert_eq!(b.get(), Some(0.0));
    }

    #[test]
    fn test_only_strict_improvement_counts() {
        let mut b = BestScore::new();
        assert!(b.observe(0.5));
        // Equal is not an improvement
        assert!(!b.observe(0.5));
        assert!(!b.observe(0.4));
        assert!(b.observe(0.6));
        assert_eq!(b.value(), 0.6);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut b = BestScore::new();
        assert!(!b.observe(f64::NAN));
        assert_eq!(b.get(), None);
        assert_eq!(b.value(), 0.0);
    }
}
