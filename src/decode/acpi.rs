use crate::error::{TelemetryError, TelemetryResult};
use std::fs;
use std::path::Path;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Size of the common ACPI System Description Table header.
pub const SDT_HEADER_LEN: usize = 36;

/// Common header at the start of every ACPI description table.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    /// Total table length, header included.
    pub length: U32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: U32,
    pub creator_id: [u8; 4],
    pub creator_revision: U32,
}

const _: () = assert!(size_of::<SdtHeader>() == SDT_HEADER_LEN);

/// An SSDT reduced to what the AML scanner needs: its OEM table id and AML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdtTable {
    pub oem_table_id: [u8; 8],
    pub aml: Vec<u8>,
}

impl SsdtTable {
    #[must_use]
    pub fn new(oem_table_id: [u8; 8], aml: Vec<u8>) -> Self {
        Self { oem_table_id, aml }
    }

    /// Splits a raw table (header included) into id and AML body.
    ///
    /// The header's length field bounds the body; trailing bytes past it are ignored.
    pub fn parse(raw: &[u8]) -> TelemetryResult<Self> {
        let Ok((header, _)) = SdtHeader::read_from_prefix(raw) else {
            return Err(TelemetryError::InvalidTable(format!(
                "{} bytes is shorter than an SDT header",
                raw.len()
            )));
        };
        if &header.signature != b"SSDT" {
            return Err(TelemetryError::InvalidTable(format!(
                "signature {:?} is not SSDT",
                String::from_utf8_lossy(&header.signature)
            )));
        }

        let declared = header.length.get() as usize;
        if declared < SDT_HEADER_LEN || declared > raw.len() {
            return Err(TelemetryError::InvalidTable(format!(
                "declared length {declared} does not fit {} available bytes",
                raw.len()
            )));
        }

        Ok(Self {
            oem_table_id: header.oem_table_id,
            aml: raw[SDT_HEADER_LEN..declared].to_vec(),
        })
    }

    #[must_use]
    pub fn oem_table_id_str(&self) -> String {
        String::from_utf8_lossy(&self.oem_table_id).into_owned()
    }
}

/// Loads every `SSDT*` table exported under `dir` (normally `/sys/firmware/acpi/tables`).
///
/// Tables that cannot be read or parsed are skipped.
pub fn load_ssdts(dir: &Path) -> TelemetryResult<Vec<SsdtTable>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("SSDT"))
        })
        .collect();

    paths.sort_by_key(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.trim_start_matches("SSDT").parse::<u32>().ok())
            .unwrap_or(0)
    });

    let mut tables = Vec::new();
    for path in paths {
        let parsed = fs::read(&path)
            .map_err(TelemetryError::from)
            .and_then(|raw| SsdtTable::parse(&raw));
        match parsed {
            Ok(table) => tables.push(table),
            Err(e) => log::debug!("skipping {}: {e}", path.display()),
        }
    }
    Ok(tables)
}

#[cfg(test)]
pub(crate) fn build_raw_ssdt(oem_table_id: &[u8; 8], aml: &[u8]) -> Vec<u8> {
    let total = (SDT_HEADER_LEN + aml.len()) as u32;
    let mut raw = Vec::with_capacity(total as usize);
    raw.extend_from_slice(b"SSDT");
    raw.extend_from_slice(&total.to_le_bytes());
    raw.push(2); // revision
    raw.push(0); // checksum
    raw.extend_from_slice(b"ALASKA");
    raw.extend_from_slice(oem_table_id);
    raw.extend_from_slice(&1u32.to_le_bytes());
    raw.extend_from_slice(b"INTL");
    raw.extend_from_slice(&0x2020_0925u32.to_le_bytes());
    raw.extend_from_slice(aml);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_header_and_body() {
        let raw = build_raw_ssdt(b"AOD     ", &[0x10, 0x20, 0x30]);
        let t = SsdtTable::parse(&raw).unwrap();
        assert_eq!(&t.oem_table_id, b"AOD     ");
        assert_eq!(t.aml, vec![0x10, 0x20, 0x30]);
        assert_eq!(t.oem_table_id_str(), "AOD     ");
    }

    #[test]
    fn header_fields_are_read_in_place() {
        let raw = build_raw_ssdt(b"AOD     ", &[0xAA; 4]);
        let (header, body) = SdtHeader::read_from_prefix(raw.as_slice()).unwrap();
        assert_eq!(&header.signature, b"SSDT");
        assert_eq!(header.length.get(), 40);
        assert_eq!(header.revision, 2);
        assert_eq!(&header.oem_id, b"ALASKA");
        assert_eq!(&header.creator_id, b"INTL");
        assert_eq!(header.creator_revision.get(), 0x2020_0925);
        assert_eq!(body, &[0xAA; 4]);
    }

    #[test]
    fn parse_honours_declared_length() {
        let mut raw = build_raw_ssdt(b"CPUSSDT ", &[1, 2]);
        raw.extend_from_slice(&[0xFF; 8]);
        assert_eq!(SsdtTable::parse(&raw).unwrap().aml, vec![1, 2]);
    }

    #[test]
    fn parse_rejects_malformed_tables() {
        assert!(matches!(
            SsdtTable::parse(&[0u8; 10]),
            Err(TelemetryError::InvalidTable(_))
        ));

        let mut raw = build_raw_ssdt(b"AOD     ", &[]);
        raw[..4].copy_from_slice(b"DSDT");
        assert!(SsdtTable::parse(&raw).is_err());

        let mut raw = build_raw_ssdt(b"AOD     ", &[0; 4]);
        raw[4..8].copy_from_slice(&1000u32.to_le_bytes());
        assert!(SsdtTable::parse(&raw).is_err());
    }

    #[test]
    fn load_ssdts_reads_only_ssdt_files() {
        let dir = std::env::temp_dir().join(format!("ryzen-telemetry-acpi-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SSDT2"), build_raw_ssdt(b"AOD     ", &[2])).unwrap();
        fs::write(dir.join("SSDT1"), build_raw_ssdt(b"CPUSSDT ", &[1])).unwrap();
        fs::write(dir.join("SSDT3"), b"garbage").unwrap();
        fs::write(dir.join("DSDT"), build_raw_ssdt(b"DSDT    ", &[9])).unwrap();

        let tables = load_ssdts(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].aml, vec![1]);
        assert_eq!(&tables[1].oem_table_id, b"AOD     ");
    }
}
