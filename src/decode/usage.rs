#![allow(clippy::cast_precision_loss)]

use super::pm_table::{CoreArray, MAX_CORES};
use std::fs;
use std::io;
use std::path::Path;

/// Highest logical CPU id tracked.
pub const MAX_LOGICAL_CPUS: usize = 256;

/// Cumulative jiffies of one logical CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// `idle + iowait`.
    pub idle: u64,
    pub total: u64,
}

/// Per-logical-CPU times from one read of `/proc/stat`, indexed by CPU id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatSample {
    cpus: Vec<Option<CpuTimes>>,
}

impl StatSample {
    /// Parses the `cpuN ...` lines of `/proc/stat`; the aggregate `cpu` line is skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut cpus: Vec<Option<CpuTimes>> = Vec::new();

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let Some(id) = parts
                .next()
                .and_then(|k| k.strip_prefix("cpu"))
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };
            if id >= MAX_LOGICAL_CPUS {
                continue;
            }

            let fields: Vec<u64> = parts.map_while(|v| v.parse::<u64>().ok()).take(10).collect();
            if fields.len() < 4 {
                continue;
            }
            let idle = fields[3].saturating_add(fields.get(4).copied().unwrap_or(0));
            let total = fields.iter().fold(0u64, |acc, &v| acc.saturating_add(v));
            if total == 0 {
                continue;
            }

            if cpus.len() <= id {
                cpus.resize(id + 1, None);
            }
            cpus[id] = Some(CpuTimes { idle, total });
        }

        Self { cpus }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Number of logical CPUs covered (highest id seen + 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    #[must_use]
    pub fn get(&self, cpu: usize) -> Option<CpuTimes> {
        self.cpus.get(cpu).copied().flatten()
    }

    /// Busy percentage of each logical CPU since `prev`, clamped to 0..=100.
    ///
    /// CPUs without a previous reading (or on the first poll) report 0.
    #[must_use]
    pub fn usage_since(&self, prev: Option<&Self>) -> Vec<f32> {
        (0..self.len())
            .map(|cpu| {
                let (Some(now), Some(before)) = (self.get(cpu), prev.and_then(|p| p.get(cpu)))
                else {
                    return 0.0;
                };
                let dt = now.total.wrapping_sub(before.total);
                if dt == 0 {
                    return 0.0;
                }
                let di = now.idle.wrapping_sub(before.idle);
                ((1.0 - di as f32 / dt as f32) * 100.0).clamp(0.0, 100.0)
            })
            .collect()
    }
}

/// Folds SMT siblings into physical cores: core N = mean of logical 2N and 2N+1.
///
/// With `skip_zero` set, zero readings are left out of the mean.
#[must_use]
pub fn aggregate_smt_pairs(logical: &[f32], skip_zero: bool) -> CoreArray {
    let cores = logical.len().div_ceil(2).min(MAX_CORES);
    let mut out = CoreArray::default();

    for core in 0..cores {
        let (sum, n) = logical
            .iter()
            .skip(core * 2)
            .take(2)
            .filter(|&&v| !skip_zero || v > 0.0)
            .fold((0.0f32, 0u32), |(s, n), &v| (s + v, n + 1));
        out.set(core, if n > 0 { sum / n as f32 } else { 0.0 });
    }
    out
}

/// Per-logical-CPU `scaling_cur_freq` in MHz.
///
/// Stops at the first missing CPU after cpu0; a missing cpu0 reads as 0.
#[must_use]
pub fn read_logical_freqs_mhz(root: &Path) -> Vec<f32> {
    let mut freqs = Vec::new();
    for cpu in 0..MAX_LOGICAL_CPUS {
        let path = root.join(format!("cpu{cpu}/cpufreq/scaling_cur_freq"));
        let khz = fs::read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0);
        if khz == 0 {
            if cpu > 0 {
                break;
            }
            freqs.push(0.0);
            continue;
        }
        freqs.push(khz as f32 / 1000.0);
    }
    while freqs.last() == Some(&0.0) {
        freqs.pop();
    }
    freqs
}

/// Physical-core frequencies from the cpufreq tree under `root`.
#[must_use]
pub fn core_freqs_mhz(root: &Path) -> CoreArray {
    aggregate_smt_pairs(&read_logical_freqs_mhz(root), true)
}
