//! Locates the AMD Overclocking Data (AOD) `OperationRegion` in ACPI bytecode.
//!
//! This is not an AML interpreter. It scans for one fixed encoding of
//! `OperationRegion (AODE, SystemMemory, <addr>, <len>)` and accepts exactly two
//! encodings of the address operand. Anything else is treated as "not here".

use super::acpi::SsdtTable;
use crate::utils::{read_u32_le, read_u64_le};
use log::{info, warn};
use serde::Serialize;

/// OEM table id of the SSDT that carries the AOD definitions (space padded).
pub const AOD_OEM_TABLE_ID: &[u8; 8] = b"AOD     ";

/// `DefOpRegion` (`5B 80`), NameSeg `AODE`, RegionSpace `SystemMemory` (`00`).
pub const AODE_PATTERN: [u8; 7] = [0x5B, 0x80, 0x41, 0x4F, 0x44, 0x45, 0x00];

/// Total size of the AODE region on known firmware. The AML length operand is not
/// the authoritative size, so it is never parsed.
pub const AOD_REGION_SIZE: u32 = 0x24BB;

/// Bytes that must follow a match for the operand to be decodable.
const OPERAND_SLACK: usize = 10;

const DWORD_PREFIX: u8 = 0x0C;
const QWORD_PREFIX: u8 = 0x0E;

/// Integer operand encodings accepted after the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmlInteger {
    DWord(u32),
    QWord(u64),
}

impl AmlInteger {
    /// Decodes a prefixed integer at the start of `bytes`.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&prefix, rest) = bytes.split_first()?;
        match prefix {
            DWORD_PREFIX => read_u32_le(rest, 0).map(Self::DWord),
            QWORD_PREFIX => read_u64_le(rest, 0).map(Self::QWord),
            _ => None,
        }
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        match self {
            Self::DWord(v) => v as u64,
            Self::QWord(v) => v,
        }
    }
}

/// Physical window of the AODE region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AodRegion {
    pub phys_addr: u64,
    pub size: u32,
}

/// Scans one AML body for the AODE declaration and returns its base address.
#[must_use]
pub fn scan_aml(aml: &[u8]) -> Option<u64> {
    let limit = aml.len().checked_sub(AODE_PATTERN.len() + OPERAND_SLACK)?;

    (0..limit)
        .filter(|&i| aml[i..].starts_with(&AODE_PATTERN))
        .find_map(|i| AmlInteger::decode(&aml[i + AODE_PATTERN.len()..]))
        .map(AmlInteger::value)
}

/// Finds the AODE region among `tables`, considering only AOD-tagged SSDTs.
pub fn locate<'a, I>(tables: I) -> Option<AodRegion>
where
    I: IntoIterator<Item = &'a SsdtTable>,
{
    for table in tables {
        if &table.oem_table_id != AOD_OEM_TABLE_ID {
            continue;
        }
        if let Some(phys_addr) = scan_aml(&table.aml) {
            info!("AODE region phys=0x{phys_addr:x} size=0x{AOD_REGION_SIZE:x}");
            return Some(AodRegion {
                phys_addr,
                size: AOD_REGION_SIZE,
            });
        }
        warn!("found AOD SSDT but no AODE OpRegion pattern");
    }
    None
}
