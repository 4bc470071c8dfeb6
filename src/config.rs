use crate::decode::aod::AodOffsets;
use crate::decode::plausibility::{PlausibilityLimits, Range};
use crate::error::{TelemetryError, TelemetryResult};
use crate::smu::driver::DEFAULT_SMU_PATH;
use crate::smu::msr::DEFAULT_MSR_PATH;
use crate::smu::physmem::DEFAULT_DEVMEM_PATH;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_ACPI_TABLES_PATH: &str = "/sys/firmware/acpi/tables";
pub const DEFAULT_CPUFREQ_PATH: &str = "/sys/devices/system/cpu";

pub const ENV_SMU_PATH: &str = "RYZEN_SMU_PATH";
pub const ENV_ACPI_TABLES_PATH: &str = "RYZEN_ACPI_TABLES_PATH";
pub const ENV_DEVMEM_PATH: &str = "RYZEN_DEVMEM_PATH";
pub const ENV_MSR_PATH: &str = "RYZEN_MSR_PATH";
pub const ENV_CPUFREQ_PATH: &str = "RYZEN_CPUFREQ_PATH";
pub const ENV_AOD_OFFSETS: &str = "RYZEN_AOD_OFFSETS";
pub const ENV_LIMIT_VOLTAGE_MV: &str = "RYZEN_LIMIT_VOLTAGE_MV";
pub const ENV_LIMIT_POWER_W: &str = "RYZEN_LIMIT_POWER_W";
pub const ENV_LIMIT_CURRENT_A: &str = "RYZEN_LIMIT_CURRENT_A";
pub const ENV_LIMIT_TEMP_C: &str = "RYZEN_LIMIT_TEMP_C";
pub const ENV_LIMIT_CORE_CLOCK_GHZ: &str = "RYZEN_LIMIT_CORE_CLOCK_GHZ";

/// Where to find the hardware interfaces, and how strictly to filter readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub smu_path: PathBuf,
    pub acpi_tables_path: PathBuf,
    pub devmem_path: PathBuf,
    /// MSR device of the CPU whose P0 state is used for BCLK.
    pub msr_path: PathBuf,
    /// Root holding `cpuN/cpufreq/`.
    pub cpufreq_path: PathBuf,
    pub limits: PlausibilityLimits,
    pub aod_offsets: AodOffsets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smu_path: PathBuf::from(DEFAULT_SMU_PATH),
            acpi_tables_path: PathBuf::from(DEFAULT_ACPI_TABLES_PATH),
            devmem_path: PathBuf::from(DEFAULT_DEVMEM_PATH),
            msr_path: PathBuf::from(DEFAULT_MSR_PATH),
            cpufreq_path: PathBuf::from(DEFAULT_CPUFREQ_PATH),
            limits: PlausibilityLimits::default(),
            aod_offsets: AodOffsets::default(),
        }
    }
}

impl Config {
    /// Defaults with `RYZEN_*` environment overrides applied.
    ///
    /// # Errors
    /// Returns [`TelemetryError::InvalidConfig`] for a malformed override.
    pub fn from_env() -> TelemetryResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> TelemetryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup(ENV_SMU_PATH) {
            cfg.smu_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_ACPI_TABLES_PATH) {
            cfg.acpi_tables_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DEVMEM_PATH) {
            cfg.devmem_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_MSR_PATH) {
            cfg.msr_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CPUFREQ_PATH) {
            cfg.cpufreq_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_AOD_OFFSETS) {
            cfg.aod_offsets = parse_offsets(ENV_AOD_OFFSETS, &v)?;
        }

        let limits = &mut cfg.limits;
        for (key, slot) in [
            (ENV_LIMIT_VOLTAGE_MV, &mut limits.voltage_mv),
            (ENV_LIMIT_POWER_W, &mut limits.power_w),
            (ENV_LIMIT_CURRENT_A, &mut limits.current_a),
            (ENV_LIMIT_TEMP_C, &mut limits.temperature_c),
            (ENV_LIMIT_CORE_CLOCK_GHZ, &mut limits.core_clock_ghz),
        ] {
            if let Some(v) = lookup(key) {
                *slot = parse_range(key, &v)?;
            }
        }

        Ok(cfg)
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> TelemetryError {
    TelemetryError::InvalidConfig(format!("{key}={value:?}, expected {expected}"))
}

/// Parses `min:max`.
fn parse_range(key: &str, value: &str) -> TelemetryResult<Range> {
    let parsed = value
        .split_once(':')
        .and_then(|(lo, hi)| Some((lo.trim().parse::<f32>().ok()?, hi.trim().parse::<f32>().ok()?)));

    match parsed {
        Some((min, max)) if min.is_finite() && max.is_finite() && min <= max => {
            Ok(Range::new(min, max))
        }
        _ => Err(invalid(key, value, "min:max with min <= max")),
    }
}

/// Parses `vddio,vddq,vpp` byte offsets, accepting decimal or `0x` hex.
fn parse_offsets(key: &str, value: &str) -> TelemetryResult<AodOffsets> {
    let parts: Vec<Option<usize>> = value.split(',').map(|p| parse_usize(p.trim())).collect();
    match parts.as_slice() {
        [Some(vddio), Some(vddq), Some(vpp)] => Ok(AodOffsets {
            mem_vddio: *vddio,
            mem_vddq: *vddq,
            mem_vpp: *vpp,
        }),
        _ => Err(invalid(key, value, "three comma-separated byte offsets")),
    }
}

fn parse_usize(s: &str) -> Option<usize> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
