use crate::config::Config;
use crate::decode::acpi::load_ssdts;
use crate::decode::agesa::{BIOS_SHADOW_BASE, BIOS_SHADOW_LEN, find_agesa_version};
use crate::decode::aml::{self, AodRegion};
use crate::decode::aod::{self, AodField, AodVoltages, DumpRow, VoltageCandidate};
use crate::decode::bclk;
use crate::decode::dram::{self, DramTimings};
use crate::decode::pm_table::{Metrics, PmTableDecoder};
use crate::decode::usage::{self, StatSample};
use crate::error::{TelemetryError, TelemetryResult};
use crate::smu::codename::{Codename, MemoryType};
use crate::smu::driver::SmuDriver;
use crate::smu::msr::{self, MSR_PSTATE_0};
use crate::smu::physmem::PhysRegion;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

const PROC_STAT: &str = "/proc/stat";
const DMI_TABLES: &[&str] = &[
    "/sys/firmware/dmi/tables/DMI",
    "/sys/firmware/dmi/tables/smbios_entry_point",
];
const AGESA_ACPI_TABLES: &[&str] = &["DSDT", "FACP", "XSDT", "RSDT"];

/// Everything one poll produces.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub codename: Codename,
    pub smu_version: Option<String>,
    pub pm_table_version: u32,
    pub metrics: Metrics,
    pub timings: DramTimings,
    pub memory_type: MemoryType,
    pub memory_frequency_mhz: Option<f32>,
}

/// Ties the driver handle, decoders and configuration together.
///
/// Holds the previous `/proc/stat` sample so that per-core usage is a delta
/// between consecutive polls.
#[derive(Debug)]
pub struct Session {
    config: Config,
    driver: SmuDriver,
    decoder: PmTableDecoder,
    prev_stat: Option<StatSample>,
}

impl Session {
    /// # Errors
    /// Fails if the `ryzen_smu` driver is not present at `config.smu_path`.
    pub fn open(config: Config) -> TelemetryResult<Self> {
        let driver = SmuDriver::open(&config.smu_path)?;
        let decoder = PmTableDecoder::new(config.limits);
        Ok(Self {
            config,
            driver,
            decoder,
            prev_stat: None,
        })
    }

    pub fn from_env() -> TelemetryResult<Self> {
        Self::open(Config::from_env()?)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn driver(&self) -> &SmuDriver {
        &self.driver
    }

    /// Reads and decodes one PM table snapshot plus DRAM timings.
    ///
    /// # Errors
    /// Returns [`TelemetryError::Io`] if the PM table cannot be read.
    pub fn poll(&mut self) -> TelemetryResult<Summary> {
        let codename = self.driver.codename();
        let pm_table_version = self.driver.pm_table_version();
        let table = self.driver.pm_table()?;

        let mut metrics = self.decoder.decode(pm_table_version, &table, codename);
        self.apply_os_counters(&mut metrics);

        let mut timings = dram::read_timings(codename, &self.driver);
        let memory_type = codename.memory_type();
        let memory_frequency_mhz = match timings.frequency_hint_mhz.filter(|&f| f > 0.0) {
            Some(f) => Some(f),
            None if memory_type == MemoryType::Ddr4 && metrics.mclk_mhz > 0.0 => {
                timings.apply_frequency(metrics.mclk_mhz);
                Some(metrics.mclk_mhz)
            }
            None => None,
        };

        Ok(Summary {
            codename,
            smu_version: self.driver.version().ok(),
            pm_table_version,
            metrics,
            timings,
            memory_type,
            memory_frequency_mhz,
        })
    }

    fn apply_os_counters(&mut self, metrics: &mut Metrics) {
        match StatSample::read(Path::new(PROC_STAT)) {
            Ok(sample) => {
                let logical = sample.usage_since(self.prev_stat.as_ref());
                metrics.core_usage_pct = usage::aggregate_smt_pairs(&logical, false);
                self.prev_stat = Some(sample);
            }
            Err(e) => debug!("cannot read {PROC_STAT}: {e}"),
        }
        metrics.core_freq_mhz = usage::core_freqs_mhz(&self.config.cpufreq_path);
        metrics.bclk_mhz = self.bclk_mhz();
    }

    /// BCLK from cpu0's P0 multiplier and its cpufreq ceiling.
    ///
    /// `None` without access to the MSR device (root and the `msr` module are needed).
    #[must_use]
    pub fn bclk_mhz(&self) -> Option<f32> {
        let p0 = msr::try_read_msr(&self.config.msr_path, MSR_PSTATE_0)?;
        let reference = bclk::reference_mhz(&self.config.cpufreq_path)?;
        bclk::decode_bclk(p0, reference)
    }

    /// Resolves the AODE region from the firmware's SSDTs.
    ///
    /// # Errors
    /// [`TelemetryError::RegionNotFound`] if no AOD table declares the region.
    pub fn locate_aod(&self) -> TelemetryResult<AodRegion> {
        let tables = load_ssdts(&self.config.acpi_tables_path)?;
        aml::locate(&tables).ok_or(TelemetryError::RegionNotFound)
    }

    fn map_aod(&self) -> TelemetryResult<PhysRegion> {
        let region = self.locate_aod()?;
        PhysRegion::map(&self.config.devmem_path, region.phys_addr, region.size as usize)
    }

    /// Memory rails at the configured AOD offsets.
    pub fn read_aod_voltages(&self) -> TelemetryResult<AodVoltages> {
        let mapped = self.map_aod()?;
        Ok(aod::read_voltages(mapped.as_bytes(), &self.config.aod_offsets))
    }

    /// Every millivolt-range value in the AODE region.
    pub fn scan_aod_voltages(&self) -> TelemetryResult<Vec<VoltageCandidate>> {
        let mapped = self.map_aod()?;
        Ok(aod::scan_voltages(mapped.as_bytes(), self.config.limits.voltage_mv))
    }

    /// Raw dwords of one AODE field.
    pub fn dump_aod_field(&self, field: AodField) -> TelemetryResult<Vec<DumpRow>> {
        let mapped = self.map_aod()?;
        Ok(aod::dump_field(mapped.as_bytes(), field))
    }

    /// Searches the BIOS shadow, then ACPI and DMI tables, for the AGESA version.
    #[must_use]
    pub fn agesa_version(&self) -> Option<String> {
        match PhysRegion::map(&self.config.devmem_path, BIOS_SHADOW_BASE, BIOS_SHADOW_LEN) {
            Ok(shadow) => {
                if let Some(v) = find_agesa_version(shadow.as_bytes()) {
                    return Some(v);
                }
            }
            Err(e) => debug!("BIOS shadow not readable: {e}"),
        }

        let acpi = AGESA_ACPI_TABLES
            .iter()
            .map(|name| self.config.acpi_tables_path.join(name));
        let dmi = DMI_TABLES.iter().map(|p| Path::new(p).to_path_buf());

        acpi.chain(dmi)
            .filter_map(|path| fs::read(path).ok())
            .find_map(|buf| find_agesa_version(&buf))
    }
}
