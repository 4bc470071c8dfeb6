#![allow(clippy::cast_precision_loss)]

use super::family::{
    self, Addressing, FamilyLayout, GRANITE_RIDGE, GRANITE_RIDGE_BYTE_OFFSETS, MetricField,
    NamedSlot,
};
use super::plausibility::{PlausibilityLimits, first_plausible_at, safe_get};
use crate::smu::codename::Codename;
use serde::{Serialize, Serializer};

/// Capacity of every per-core array in [`Metrics`].
pub const MAX_CORES: usize = 16;

/// Shorter tables cannot hold any telemetry.
pub const MIN_TABLE_LEN: usize = 4;

// Slots shared by every family's heuristic pass.
const IOD_HOTSPOT_INDEX: usize = 11;
const TDIE_SENSOR_PAIR: [usize; 2] = [448, 449];
const CORE_CLOCK_START: usize = 325;
const PPT_CANDIDATES: &[usize] = &[3, 1, 13, 29, 5, 38];
const POWER_CANDIDATES: &[usize] = &[29, 1, 13, 38, 5, 220, 187, 42, 0];
const CURRENT_CANDIDATES: &[usize] = &[41, 46, 3, 10, 11, 4];
const TEMP_CANDIDATES: &[usize] = &[1, 448, 449];

// ===============================================================================================
// Output Record
// ===============================================================================================

/// Fixed-capacity per-core readings; only the first `len()` entries are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreArray {
    values: [f32; MAX_CORES],
    count: usize,
}

impl CoreArray {
    /// Replaces the contents with `src`, truncated to [`MAX_CORES`].
    pub fn fill_from(&mut self, src: &[f32]) {
        let n = src.len().min(MAX_CORES);
        self.values = [0.0; MAX_CORES];
        self.values[..n].copy_from_slice(&src[..n]);
        self.count = n;
    }

    /// Sets a single core, growing `len()` to cover it. Out-of-capacity cores are ignored.
    pub fn set(&mut self, core: usize, value: f32) -> bool {
        let Some(slot) = self.values.get_mut(core) else {
            return false;
        };
        *slot = value;
        self.count = self.count.max(core + 1);
        true
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.count]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn max(&self) -> Option<f32> {
        self.as_slice().iter().copied().reduce(f32::max)
    }
}

impl Serialize for CoreArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

/// Decoded power-management telemetry.
///
/// Rails and fabric clocks are raw slot values (0.0 when the slot is outside the
/// table). Everything that passes a plausibility check is an `Option` so that a
/// rejected reading is distinguishable from a real zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    // Power
    pub package_power_w: Option<f32>,
    pub ppt_w: Option<f32>,
    pub package_current_a: Option<f32>,

    // Voltages (V)
    pub vcore: f32,
    pub vsoc: f32,
    pub vddp: f32,
    pub vddg_ccd: f32,
    pub vddg_iod: f32,
    pub vdd_misc: f32,
    pub vid: Option<f32>,

    // Clocks
    pub core_clock_mhz: Option<f32>,
    pub fclk_mhz: f32,
    pub uclk_mhz: f32,
    pub mclk_mhz: f32,
    pub bclk_mhz: Option<f32>,
    pub core_clocks_ghz: CoreArray,

    // Temperatures (°C)
    pub cpu_temp_c: Option<f32>,
    pub core_temps_c: CoreArray,
    pub tdie_c: Option<f32>,
    pub iod_hotspot_c: Option<f32>,

    // Per-core
    pub core_voltages: CoreArray,
    pub core_usage_pct: CoreArray,
    pub core_freq_mhz: CoreArray,
}

// ===============================================================================================
// Decoder
// ===============================================================================================

/// Maps a raw PM table onto [`Metrics`].
///
/// Stateless apart from its plausibility limits, so one instance can decode any
/// number of tables from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct PmTableDecoder {
    limits: PlausibilityLimits,
}

impl PmTableDecoder {
    #[must_use]
    pub const fn new(limits: PlausibilityLimits) -> Self {
        Self { limits }
    }

    /// Decodes `table` for the given PM table version and silicon family.
    ///
    /// Granite Ridge reads its rails and clocks by byte offset and then runs the
    /// index pass of its own layout; every other family is looked up by `version`.
    #[must_use]
    pub fn decode(&self, version: u32, table: &[f32], codename: Codename) -> Metrics {
        if table.len() < MIN_TABLE_LEN {
            return Metrics::default();
        }

        if codename.uses_byte_offset_pm_table() {
            self.decode_layout(
                &GRANITE_RIDGE,
                GRANITE_RIDGE_BYTE_OFFSETS,
                Addressing::ByteOffset,
                table,
            )
        } else {
            let layout = family::lookup(version);
            self.decode_layout(layout, layout.named, Addressing::FloatIndex, table)
        }
    }

    /// Decodes against an explicit layout. `named` is addressed according to `addressing`.
    #[must_use]
    pub fn decode_layout(
        &self,
        layout: &FamilyLayout,
        named: &[NamedSlot],
        addressing: Addressing,
        table: &[f32],
    ) -> Metrics {
        let mut m = Metrics::default();
        if table.len() < MIN_TABLE_LEN {
            return m;
        }

        self.apply_named(named, addressing, table, &mut m);
        Self::apply_core_arrays(layout, table, &mut m);
        self.apply_known_indices(layout, table, &mut m);
        self.apply_derived(table, &mut m);

        m
    }

    fn apply_named(
        &self,
        named: &[NamedSlot],
        addressing: Addressing,
        table: &[f32],
        m: &mut Metrics,
    ) {
        for entry in named {
            let v = safe_get(table, FamilyLayout::resolve(*entry, addressing));
            match entry.field {
                MetricField::Fclk => m.fclk_mhz = v,
                MetricField::Uclk => m.uclk_mhz = v,
                MetricField::Mclk => m.mclk_mhz = v,
                MetricField::Vsoc => m.vsoc = v,
                MetricField::Vddp => m.vddp = v,
                MetricField::VddgIod => m.vddg_iod = v,
                MetricField::VddgCcd => m.vddg_ccd = v,
                MetricField::VddMisc => m.vdd_misc = v,
                MetricField::Vcore => m.vcore = v,
                MetricField::IodHotspot => {
                    if self.limits.temperature_c.contains(v) {
                        m.iod_hotspot_c = Some(v);
                    }
                }
            }
        }
    }

    fn apply_core_arrays(layout: &FamilyLayout, table: &[f32], m: &mut Metrics) {
        let cores = layout.max_cores.min(MAX_CORES);

        if let Some(temps) = table.get(layout.core_temp_start..layout.core_temp_start + cores) {
            m.core_temps_c.fill_from(temps);
        }
        if let Some(volts) =
            table.get(layout.core_voltage_start..layout.core_voltage_start + cores)
        {
            m.core_voltages.fill_from(volts);
        }
    }

    fn apply_known_indices(&self, layout: &FamilyLayout, table: &[f32], m: &mut Metrics) {
        let limits = &self.limits;

        let vid = safe_get(table, layout.vid_index);
        if vid > 0.0 {
            m.vid = Some(vid);
        }

        let ppt_candidates: Vec<usize> = std::iter::once(layout.ppt_index)
            .chain(PPT_CANDIDATES.iter().copied())
            .collect();
        m.ppt_w = first_plausible_at(table, &ppt_candidates, limits.power_w);

        let power_candidates: Vec<usize> = std::iter::once(layout.socket_power_index)
            .chain(POWER_CANDIDATES.iter().copied())
            .collect();
        m.package_power_w = first_plausible_at(table, &power_candidates, limits.power_w);

        m.package_current_a = first_plausible_at(table, CURRENT_CANDIDATES, limits.current_a);

        let [a_idx, b_idx] = TDIE_SENSOR_PAIR;
        if let (Some(&a), Some(&b)) = (table.get(a_idx), table.get(b_idx)) {
            m.tdie_c = if limits.temperature_c.contains(a) {
                Some(a)
            } else if limits.temperature_c.contains(b) {
                Some(b)
            } else if a > 0.0 && b > 0.0 {
                Some((a + b) * 0.5)
            } else {
                None
            };
        }

        if let Some(clocks) = table.get(CORE_CLOCK_START..CORE_CLOCK_START + MAX_CORES) {
            m.core_clocks_ghz.fill_from(clocks);
        }

        if m.iod_hotspot_c.is_none() {
            let v = safe_get(table, IOD_HOTSPOT_INDEX);
            if limits.temperature_c.contains(v) {
                m.iod_hotspot_c = Some(v);
            }
        }
    }

    fn apply_derived(&self, table: &[f32], m: &mut Metrics) {
        let limits = &self.limits;

        m.core_clock_mhz = m
            .core_clocks_ghz
            .max()
            .filter(|&ghz| limits.core_clock_ghz.contains(ghz))
            .map(|ghz| ghz * 1000.0);

        m.cpu_temp_c = match m.tdie_c {
            Some(t) if t > 0.0 => Some(t),
            _ => first_plausible_at(table, TEMP_CANDIDATES, limits.temperature_c),
        };
    }
}

/// Convenience wrapper using the default plausibility limits.
#[must_use]
pub fn decode(version: u32, table: &[f32], codename: Codename) -> Metrics {
    PmTableDecoder::default().decode(version, table, codename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::family::VERMEER_380805;

    fn granite_ridge_table() -> Vec<f32> {
        let mut t = vec![0.0f32; 460];
        t[3] = 120.0; // PPT
        t[11] = 55.0; // IOD hotspot
        t[29] = 95.0; // socket power
        t[41] = 80.0; // current
        t[58] = 1.05; // VDD misc
        t[71] = 2100.0;
        t[75] = 2100.0;
        t[79] = 3000.0;
        t[83] = 1.2;
        t[259] = 0.95;
        t[261] = 0.9;
        t[269] = 1.1;
        t[271] = 1.25;
        t[275] = 1.3;
        for (i, v) in t[309..317].iter_mut().enumerate() {
            *v = 1.0 + i as f32 * 0.01;
        }
        for v in &mut t[317..325] {
            *v = 50.0;
        }
        for v in &mut t[325..341] {
            *v = 4.5;
        }
        t[330] = 5.2;
        t[448] = 200.0;
        t[449] = 65.0;
        t
    }

    #[test]
    fn short_tables_yield_the_empty_record() {
        let short = [1.0, 2.0, 3.0];
        for codename in [Codename::GraniteRidge, Codename::Vermeer, Codename::Unknown] {
            for version in [0, 0x0038_0805, u32::MAX] {
                assert_eq!(decode(version, &short, codename), Metrics::default());
            }
        }
        assert_eq!(decode(0, &[], Codename::GraniteRidge), Metrics::default());
    }

    #[test]
    fn granite_ridge_byte_offset_pass() {
        let m = decode(0x0062_0205, &granite_ridge_table(), Codename::GraniteRidge);

        assert_eq!(m.fclk_mhz, 2100.0);
        assert_eq!(m.mclk_mhz, 3000.0);
        assert_eq!(m.vsoc, 1.2);
        assert_eq!(m.vddg_iod, 0.95);
        assert_eq!(m.vddg_ccd, 0.9);
        assert_eq!(m.vddp, 1.1);
        assert_eq!(m.vdd_misc, 1.05);
        assert_eq!(m.vcore, 1.25);
        assert_eq!(m.vid, Some(1.3));
        assert_eq!(m.ppt_w, Some(120.0));
        assert_eq!(m.package_power_w, Some(95.0));
        assert_eq!(m.package_current_a, Some(80.0));
        assert_eq!(m.iod_hotspot_c, Some(55.0));
        assert_eq!(m.core_temps_c.as_slice(), &[50.0; 8]);
        assert_eq!(m.core_voltages.len(), 8);
        assert_eq!(m.core_clocks_ghz.len(), 16);
    }

    #[test]
    fn granite_ridge_derived_fields() {
        let m = decode(0, &granite_ridge_table(), Codename::GraniteRidge);

        let clock = m.core_clock_mhz.expect("core clock");
        assert!((clock - 5200.0).abs() < 0.01);

        // 448 is implausible, so its sibling wins.
        assert_eq!(m.tdie_c, Some(65.0));
        assert_eq!(m.cpu_temp_c, Some(65.0));
    }

    #[test]
    fn decoding_is_deterministic() {
        let table = granite_ridge_table();
        let a = decode(0, &table, Codename::GraniteRidge);
        let b = decode(0, &table, Codename::GraniteRidge);
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn tdie_averages_when_both_sensors_are_implausible() {
        let mut t = granite_ridge_table();
        t[448] = 160.0;
        t[449] = 170.0;
        let m = decode(0, &t, Codename::GraniteRidge);
        assert_eq!(m.tdie_c, Some(165.0));

        t[448] = 0.0;
        let m = decode(0, &t, Codename::GraniteRidge);
        assert_eq!(m.tdie_c, None);
    }

    #[test]
    fn implausible_core_clock_is_left_absent() {
        let mut t = granite_ridge_table();
        t[330] = 4200.0;
        let m = decode(0, &t, Codename::GraniteRidge);
        assert_eq!(m.core_clock_mhz, None);
    }

    #[test]
    fn vermeer_16_core_layout() {
        let mut t = vec![0.0f32; 260];
        t[1] = 140.0;
        t[29] = 100.0;
        t[39] = 1.31;
        t[40] = 9.9;
        t[48] = 1800.0;
        t[10] = 1.4;
        for (i, v) in t[204..220].iter_mut().enumerate() {
            *v = 40.0 + i as f32;
        }
        for v in &mut t[188..204] {
            *v = 1.2;
        }

        let m = decode(0x0038_0805, &t, Codename::Vermeer);
        assert_eq!(m.vcore, 1.31);
        assert_eq!(m.fclk_mhz, 1800.0);
        assert_eq!(m.vid, Some(1.4));
        assert_eq!(m.ppt_w, Some(140.0));
        assert_eq!(m.package_power_w, Some(100.0));
        assert_eq!(m.core_temps_c.len(), 16);
        assert_eq!(m.core_temps_c.as_slice()[15], 55.0);
        assert_eq!(m.core_voltages.as_slice(), &[1.2; 16]);
        // Table too short for the shared clock slots.
        assert!(m.core_clocks_ghz.is_empty());
        assert_eq!(m.core_clock_mhz, None);
    }

    #[test]
    fn oversized_core_count_is_clamped() {
        let layout = FamilyLayout {
            max_cores: 20,
            ..GRANITE_RIDGE
        };
        let table = granite_ridge_table();
        let m = PmTableDecoder::default().decode_layout(
            &layout,
            layout.named,
            Addressing::FloatIndex,
            &table,
        );
        assert_eq!(m.core_temps_c.len(), MAX_CORES);
        assert_eq!(m.core_voltages.len(), MAX_CORES);
    }

    #[test]
    fn out_of_range_slots_read_as_zero() {
        let t = vec![0.0f32; 12];
        let m = decode(0x0040_0005, &t, Codename::Cezanne);
        assert_eq!(m.fclk_mhz, 0.0);
        assert_eq!(m.vddp, 0.0);
        assert!(m.core_temps_c.is_empty());
        assert!(m.core_voltages.is_empty());
        assert_eq!(m.vid, None);
        assert_eq!(m.iod_hotspot_c, None);
        assert_eq!(m.ppt_w, None);
    }

    #[test]
    fn implausible_hotspot_is_absent_not_zero() {
        let mut t = granite_ridge_table();
        t[11] = 400.0;
        let m = decode(0, &t, Codename::GraniteRidge);
        assert_eq!(m.iod_hotspot_c, None);

        t[11] = 0.0;
        let m = decode(0, &t, Codename::GraniteRidge);
        assert_eq!(m.iod_hotspot_c, None);
    }

    #[test]
    fn family_hotspot_slot_takes_precedence() {
        let mut t = vec![0.0f32; 40];
        t[11] = 70.0;
        t[29] = 61.0;
        let m = decode(0x0040_0005, &t, Codename::Cezanne);
        assert_eq!(m.iod_hotspot_c, Some(61.0));
    }

    #[test]
    fn unknown_version_uses_newest_layout_by_index() {
        let m = decode(0xDEAD_0001, &granite_ridge_table(), Codename::Raphael);
        assert_eq!(m.vcore, 1.25);
        assert_eq!(m.fclk_mhz, 2100.0);
    }

    #[test]
    fn custom_limits_change_acceptance() {
        let mut limits = PlausibilityLimits::default();
        limits.power_w.max = 50.0;
        let decoder = PmTableDecoder::new(limits);
        let m = decoder.decode(0, &granite_ridge_table(), Codename::GraniteRidge);
        // 120 W and 95 W are the only non-zero power candidates.
        assert_eq!(m.ppt_w, None);
        assert_eq!(m.package_power_w, None);
        assert_eq!(m.package_current_a, Some(80.0));
    }

    #[test]
    fn explicit_layout_matches_version_lookup() {
        let mut t = vec![0.0f32; 260];
        t[39] = 1.31;
        let decoder = PmTableDecoder::default();
        let by_version = decoder.decode(0x0038_0805, &t, Codename::Vermeer);
        let by_layout = decoder.decode_layout(
            &VERMEER_380805,
            VERMEER_380805.named,
            Addressing::FloatIndex,
            &t,
        );
        assert_eq!(by_version, by_layout);
    }

    #[test]
    fn core_array_set_is_bounded() {
        let mut a = CoreArray::default();
        assert!(a.set(3, 1.0));
        assert_eq!(a.len(), 4);
        assert!(!a.set(MAX_CORES, 1.0));
        assert_eq!(a.len(), 4);
        a.fill_from(&[1.0; 20]);
        assert_eq!(a.len(), MAX_CORES);
    }

    #[test]
    fn json_output_truncates_core_arrays_and_nulls_absent_fields() {
        let mut m = Metrics::default();
        m.core_temps_c.fill_from(&[40.0, 41.5]);
        m.tdie_c = Some(52.0);

        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["core_temps_c"], serde_json::json!([40.0, 41.5]));
        assert_eq!(v["core_voltages"], serde_json::json!([]));
        assert!(v["iod_hotspot_c"].is_null());
        assert!(v["bclk_mhz"].is_null());
        assert_eq!(v["tdie_c"], serde_json::json!(52.0));
    }
}
