//! Reference clock (BCLK) derived from the P0 multiplier and the cpufreq ceiling.

#![allow(clippy::cast_precision_loss)]

use std::fs;
use std::path::Path;

/// Accepted BCLK window in MHz; anything outside is a misread.
pub const BCLK_RANGE_MHZ: (f32, f32) = (80.0, 120.0);

const P0_MULT_MAX: f32 = 200.0;

/// cpu0 attributes tried in order for the reference frequency, in kHz.
const REFERENCE_FREQ_FILES: &[&str] = &[
    "cpu0/cpufreq/cpuinfo_max_freq",
    "cpu0/cpufreq/scaling_max_freq",
    "cpu0/cpufreq/scaling_cur_freq",
];

/// Core multiplier encoded in a P-state MSR: `CpuFid / CpuDfsId * 2`.
///
/// `None` when either field is zero or the ratio is out of range.
#[must_use]
pub fn p0_multiplier(msr: u64) -> Option<f32> {
    let fid = (msr & 0xFF) as u32;
    let dfs = ((msr >> 8) & 0x3F) as u32;
    if fid == 0 || dfs == 0 {
        return None;
    }
    let mult = fid as f32 / dfs as f32 * 2.0;
    (mult > 0.1 && mult <= P0_MULT_MAX).then_some(mult)
}

/// BCLK in MHz from the raw P0 MSR and a reference frequency running at that multiplier.
#[must_use]
pub fn decode_bclk(msr: u64, ref_mhz: f32) -> Option<f32> {
    let bclk = ref_mhz / p0_multiplier(msr)?;
    (BCLK_RANGE_MHZ.0..=BCLK_RANGE_MHZ.1)
        .contains(&bclk)
        .then_some(bclk)
}

/// First positive cpu0 frequency limit under `cpufreq_root`, in MHz.
#[must_use]
pub fn reference_mhz(cpufreq_root: &Path) -> Option<f32> {
    REFERENCE_FREQ_FILES.iter().find_map(|name| {
        let khz = fs::read_to_string(cpufreq_root.join(name))
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()?;
        (khz > 0).then(|| khz as f32 / 1000.0)
    })
}
