use super::aml::AOD_REGION_SIZE;
use super::plausibility::Range;
use crate::utils::read_u32_le;
use serde::Serialize;
use std::ops::Range as ByteRange;

/// The first dword of the region is a status/version word.
const SCAN_START: usize = 4;

/// Byte offsets of the named memory rails inside the AODE region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AodOffsets {
    pub mem_vddio: usize,
    pub mem_vddq: usize,
    pub mem_vpp: usize,
}

impl Default for AodOffsets {
    /// Granite Ridge layout: `WCNS + 208/212/216`.
    fn default() -> Self {
        Self {
            mem_vddio: 9084,
            mem_vddq: 9088,
            mem_vpp: 9092,
        }
    }
}

/// Sub-field of the AODE region a byte offset falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AodField {
    /// SMI output buffer.
    Outb,
    Ctrl,
    /// XMP/timing profiles.
    Dspd,
    Resv,
    Rmpd,
    /// Overclocking settings, where the rails live.
    Wcns,
    Tail,
}

/// Dwords per row of [`dump_field`].
pub const DUMP_ROW_WORDS: usize = 4;

impl AodField {
    #[must_use]
    pub const fn for_offset(offset: usize) -> Self {
        match offset {
            0..196 => Self::Outb,
            196..208 => Self::Ctrl,
            208..8724 => Self::Dspd,
            8724..8736 => Self::Resv,
            8736..8876 => Self::Rmpd,
            8876..9388 => Self::Wcns,
            _ => Self::Tail,
        }
    }

    /// Byte span of the field; `Tail` runs to the end of the region.
    #[must_use]
    pub const fn span(self) -> ByteRange<usize> {
        match self {
            Self::Outb => 0..196,
            Self::Ctrl => 196..208,
            Self::Dspd => 208..8724,
            Self::Resv => 8724..8736,
            Self::Rmpd => 8736..8876,
            Self::Wcns => 8876..9388,
            Self::Tail => 9388..AOD_REGION_SIZE as usize,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Outb => "OUTB",
            Self::Ctrl => "CTRL",
            Self::Dspd => "DSPD",
            Self::Resv => "RESV",
            Self::Rmpd => "RMPD",
            Self::Wcns => "WCNS",
            Self::Tail => "TAIL",
        }
    }
}

/// Memory rails read from the AODE region, in millivolts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AodVoltages {
    pub mem_vddio_mv: Option<u32>,
    pub mem_vddq_mv: Option<u32>,
    pub mem_vpp_mv: Option<u32>,
}

/// A millivolt-range dword found while scanning the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoltageCandidate {
    pub offset: usize,
    pub field: AodField,
    pub millivolts: u32,
}

/// One row of a raw field dump: the byte offset of the first dword and up to
/// [`DUMP_ROW_WORDS`] little-endian dwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpRow {
    pub offset: usize,
    pub words: Vec<u32>,
}

fn region_limit(region: &[u8]) -> usize {
    region.len().min(AOD_REGION_SIZE as usize)
}

/// Reads a millivolt dword at `offset`; offsets that do not fit in the region are absent.
#[must_use]
pub fn read_millivolts(region: &[u8], offset: usize) -> Option<u32> {
    let limit = region_limit(region);
    if offset.checked_add(4)? > limit {
        return None;
    }
    read_u32_le(region, offset)
}

#[must_use]
pub fn read_voltages(region: &[u8], offsets: &AodOffsets) -> AodVoltages {
    AodVoltages {
        mem_vddio_mv: read_millivolts(region, offsets.mem_vddio),
        mem_vddq_mv: read_millivolts(region, offsets.mem_vddq),
        mem_vpp_mv: read_millivolts(region, offsets.mem_vpp),
    }
}

/// Lists every dword in `range` (millivolts) for locating rails on unknown boards.
#[must_use]
pub fn scan_voltages(region: &[u8], range: Range) -> Vec<VoltageCandidate> {
    let limit = region_limit(region);
    (SCAN_START..limit.saturating_sub(4))
        .step_by(4)
        .filter_map(|offset| {
            let mv = read_u32_le(region, offset)?;
            #[allow(clippy::cast_precision_loss)]
            range.contains(mv as f32).then_some(VoltageCandidate {
                offset,
                field: AodField::for_offset(offset),
                millivolts: mv,
            })
        })
        .collect()
}

/// Raw dwords of one field, for working out the layout when the scan finds nothing.
///
/// The dump stops at the last whole dword inside both the field and `region`.
#[must_use]
pub fn dump_field(region: &[u8], field: AodField) -> Vec<DumpRow> {
    let span = field.span();
    let end = span.end.min(region_limit(region));
    let words: Vec<(usize, u32)> = (span.start..end.saturating_sub(3))
        .step_by(4)
        .filter_map(|offset| Some((offset, read_u32_le(region, offset)?)))
        .collect();

    words
        .chunks(DUMP_ROW_WORDS)
        .map(|row| DumpRow {
            offset: row[0].0,
            words: row.iter().map(|&(_, v)| v).collect(),
        })
        .collect()
}
