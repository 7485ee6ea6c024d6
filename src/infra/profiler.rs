// ============================================================
// Layer 6 — Step Profiler
// ============================================================
// Opt-in (--profile) wall-clock timing of the phases of each
// training step: forward, backward, optimizer step.
//
// After every step a small table of that step's phases is
// printed, slowest first; at epoch end an aggregate table over
// all steps.
//
// Timings are host-side. On asynchronous GPU backends a phase
// can return before its kernels finish, so the time shows up
// in whichever later phase synchronises (usually the loss read).
//
// Reference: Rust Book §16 (std::time)

use std::{
    collections::BTreeMap,
    fmt::Write,
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Copy, Default)]
struct PhaseTotal {
    total: Duration,
    calls: usize,
}

#[derive(Debug, Default)]
pub struct StepProfiler {
    step:   Vec<(&'static str, Duration)>,
    totals: BTreeMap<&'static str, PhaseTotal>,
    steps:  usize,
}

impl StepProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its duration under `phase`.
    pub fn time<T>(&mut self, phase: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(phase, start.elapsed());
        out
    }

    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        self.step.push((phase, elapsed));
        let entry = self.totals.entry(phase).or_default();
        entry.total += elapsed;
        entry.calls += 1;
    }

    /// Close the current step and render its table.
    pub fn finish_step(&mut self) -> String {
        self.steps += 1;
        let mut rows: BTreeMap<&'static str, PhaseTotal> = BTreeMap::new();
        for (phase, elapsed) in self.step.drain(..) {
            let entry = rows.entry(phase).or_default();
            entry.total += elapsed;
            entry.calls += 1;
        }
        render(&format!("step {}", self.steps), rows)
    }

    /// Aggregate table over every step so far.
    pub fn summary(&self) -> String {
        render(&format!("{} steps", self.steps), self.totals.clone())
    }
}

fn render(title: &str, rows: BTreeMap<&'static str, PhaseTotal>) -> String {
    let mut rows: Vec<(&'static str, PhaseTotal)> = rows.into_iter().collect();
    rows.sort_by(|a, b| b.1.total.cmp(&a.1.total));

    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>6} {:>12} {:>12}   ({title})", "phase", "calls", "total (ms)", "mean (ms)");
    for (phase, t) in rows {
        let total_ms = t.total.as_secs_f64() * 1e3;
        let mean_ms  = total_ms / t.calls.max(1) as f64;
        let _ = writeln!(out, "{phase:<12} {:>6} {total_ms:>12.3} {mean_ms:>12.3}", t.calls);
    }
    out
}
