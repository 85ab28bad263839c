//! Modulo per il monitoraggio di CPU e memoria del processo server
//!
//! Le misure arrivano da `sysinfo` e riguardano solo il processo corrente. La
//! route di health legge la memoria su richiesta. Il monitor opzionale in
//! background logga un campione ogni `MONITOR_INTERVAL_SECS` tramite tracing.

use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Una misurazione del processo server
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Uso CPU dall'ultimo refresh, 100% equivale a un core intero
    pub cpu_percentage: f32,
    pub memory_mb: f64,
}

impl ProcessStats {
    pub fn format_for_log(&self) -> String {
        format!(
            "[{}] CPU: {:.2}% | Memory: {:.2} MB",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.cpu_percentage,
            self.memory_mb
        )
    }
}

/// Mantiene lo stato di `sysinfo` tra un refresh e l'altro, l'uso CPU è un delta
pub struct ProcessSampler {
    system: System,
    pid: Pid,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    pub fn sample(&mut self) -> Option<ProcessStats> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self.system.process(self.pid)?;
        Some(ProcessStats {
            timestamp: chrono::Utc::now(),
            cpu_percentage: process.cpu_usage(),
            memory_mb: bytes_to_mb(process.memory()),
        })
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Memoria residente del processo server in MB, 0 se non leggibile
pub fn current_memory_mb() -> f64 {
    ProcessSampler::new()
        .sample()
        .map(|stats| stats.memory_mb)
        .unwrap_or(0.0)
}

/// Logga le statistiche del processo ogni `interval` fino allo spegnimento del runtime
pub fn spawn_process_monitor(interval: Duration) -> JoinHandle<()> {
    info!(
        "Starting process monitor with interval: {} seconds",
        interval.as_secs()
    );
    tokio::spawn(async move {
        let mut sampler = ProcessSampler::new();
        // il primo refresh inizializza soltanto i contatori CPU
        sampler.sample();

        let mut ticker = time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sampler.sample() {
                Some(stats) => info!("Process stats {}", stats.format_for_log()),
                None => warn!("Server process not visible to sysinfo"),
            }
            debug!("Next process sample in {}s", interval.as_secs());
        }
    })
}
