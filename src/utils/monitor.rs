use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

/// Rows handled by one pipeline phase and how long it took.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseStats {
    pub phase: &'static str,
    pub rows: usize,
    pub elapsed: Duration,
    /// Resident memory after the phase. Only sampled with `--monitor`.
    pub memory_mb: Option<u64>,
}

impl PhaseStats {
    pub fn rows_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (seconds > 0.0).then(|| self.rows as f64 / seconds)
    }
}

#[cfg(feature = "cli")]
struct MemorySampler {
    system: System,
    pid: Pid,
}

#[cfg(feature = "cli")]
impl MemorySampler {
    fn new() -> Option<Self> {
        match sysinfo::get_current_pid() {
            Ok(pid) => Some(Self {
                system: System::new(),
                pid,
            }),
            Err(e) => {
                tracing::warn!("Memory sampling unavailable: {}", e);
                None
            }
        }
    }

    fn resident_mb(&mut self) -> Option<u64> {
        self.system.refresh_all();
        self.system
            .process(self.pid)
            .map(|process| process.memory() / 1024 / 1024)
    }
}

// Builds without the `cli` feature have no sysinfo.
#[cfg(not(feature = "cli"))]
struct MemorySampler;

#[cfg(not(feature = "cli"))]
impl MemorySampler {
    fn new() -> Option<Self> {
        None
    }

    fn resident_mb(&mut self) -> Option<u64> {
        None
    }
}

/// Times each phase of a report run and counts the rows it handled.
pub struct PhaseMonitor {
    enabled: bool,
    started: Instant,
    phase_started: Mutex<Instant>,
    phases: Mutex<Vec<PhaseStats>>,
    sampler: Mutex<Option<MemorySampler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            started: now,
            phase_started: Mutex::new(now),
            phases: Mutex::new(Vec::new()),
            sampler: Mutex::new(if enabled { MemorySampler::new() } else { None }),
        }
    }

    pub fn start_phase(&self) {
        *lock(&self.phase_started) = Instant::now();
    }

    pub fn finish_phase(&self, phase: &'static str, rows: usize) {
        let stats = PhaseStats {
            phase,
            rows,
            elapsed: lock(&self.phase_started).elapsed(),
            memory_mb: lock(&self.sampler)
                .as_mut()
                .and_then(MemorySampler::resident_mb),
        };

        if self.enabled {
            let rate = stats
                .rows_per_second()
                .map(|rate| format!("{:.0} rows/s", rate))
                .unwrap_or_else(|| "-".to_string());
            match stats.memory_mb {
                Some(memory) => tracing::info!(
                    "📊 {}: {} rows in {:?} ({}), memory {}MB",
                    phase,
                    rows,
                    stats.elapsed,
                    rate,
                    memory
                ),
                None => tracing::info!("📊 {}: {} rows in {:?} ({})", phase, rows, stats.elapsed, rate),
            }
        }
        lock(&self.phases).push(stats);
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        lock(&self.phases).clone()
    }

    pub fn log_summary(&self) {
        if !self.enabled {
            return;
        }
        let phases = lock(&self.phases);
        let slowest = phases.iter().max_by_key(|stats| stats.elapsed);
        let peak = phases.iter().filter_map(|stats| stats.memory_mb).max();

        tracing::info!(
            "📊 Run finished in {:?}; slowest phase {}; peak memory {}",
            self.started.elapsed(),
            slowest.map(|stats| stats.phase).unwrap_or("-"),
            peak.map(|mb| format!("{}MB", mb)).unwrap_or_else(|| "n/a".to_string())
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
