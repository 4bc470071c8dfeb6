use serde::Serialize;

// ===============================================================================================
// Codename Lookup
// ===============================================================================================

/// Silicon family as reported by the `ryzen_smu` driver's `codename` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Codename {
    #[default]
    Unknown,
    Colfax,
    Renoir,
    Picasso,
    Matisse,
    Threadripper,
    CastlePeak,
    RavenRidge,
    RavenRidge2,
    SummitRidge,
    PinnacleRidge,
    Rembrandt,
    Vermeer,
    Vangogh,
    Cezanne,
    Milan,
    Dali,
    Lucienne,
    Naples,
    Chagall,
    Raphael,
    Phoenix,
    StrixPoint,
    GraniteRidge,
    HawkPoint,
    StormPeak,
}

struct CodenameLookup {
    index: i32,
    codename: Codename,
    name: &'static str,
}

#[rustfmt::skip]
const CODENAME_LOOKUP_TABLE: &[CodenameLookup] = &[
    CodenameLookup { index: 1, codename: Codename::Colfax, name: "Colfax" },
    CodenameLookup { index: 2, codename: Codename::Renoir, name: "Renoir" },
    CodenameLookup { index: 3, codename: Codename::Picasso, name: "Picasso" },
    CodenameLookup { index: 4, codename: Codename::Matisse, name: "Matisse" },
    CodenameLookup { index: 5, codename: Codename::Threadripper, name: "Threadripper" },
    CodenameLookup { index: 6, codename: Codename::CastlePeak, name: "Castle Peak" },
    CodenameLookup { index: 7, codename: Codename::RavenRidge, name: "Raven Ridge" },
    CodenameLookup { index: 8, codename: Codename::RavenRidge2, name: "Raven Ridge 2" },
    CodenameLookup { index: 9, codename: Codename::SummitRidge, name: "Summit Ridge" },
    CodenameLookup { index: 10, codename: Codename::PinnacleRidge, name: "Pinnacle Ridge" },
    CodenameLookup { index: 11, codename: Codename::Rembrandt, name: "Rembrandt" },
    CodenameLookup { index: 12, codename: Codename::Vermeer, name: "Vermeer" },
    CodenameLookup { index: 13, codename: Codename::Vangogh, name: "Vangogh" },
    CodenameLookup { index: 14, codename: Codename::Cezanne, name: "Cezanne" },
    CodenameLookup { index: 15, codename: Codename::Milan, name: "Milan" },
    CodenameLookup { index: 16, codename: Codename::Dali, name: "Dali" },
    CodenameLookup { index: 17, codename: Codename::Lucienne, name: "Luciene" },
    CodenameLookup { index: 18, codename: Codename::Naples, name: "Naples" },
    CodenameLookup { index: 19, codename: Codename::Chagall, name: "Chagall" },
    CodenameLookup { index: 20, codename: Codename::Raphael, name: "Raphael" },
    CodenameLookup { index: 21, codename: Codename::Phoenix, name: "Phoenix" },
    CodenameLookup { index: 22, codename: Codename::StrixPoint, name: "Strix Point" },
    CodenameLookup { index: 23, codename: Codename::GraniteRidge, name: "Granite Ridge" },
    CodenameLookup { index: 24, codename: Codename::HawkPoint, name: "Hawk Point" },
    CodenameLookup { index: 25, codename: Codename::StormPeak, name: "Storm Peak" },
];

/// DRAM technology attached to a given family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MemoryType {
    #[default]
    Unknown,
    Ddr4,
    Ddr5,
}

impl Codename {
    /// Maps the driver's numeric codename index. Unlisted values become `Unknown`.
    #[must_use]
    pub fn from_index(index: i32) -> Self {
        CODENAME_LOOKUP_TABLE
            .iter()
            .find(|e| e.index == index)
            .map_or(Self::Unknown, |e| e.codename)
    }

    #[must_use]
    pub fn index(self) -> Option<i32> {
        CODENAME_LOOKUP_TABLE
            .iter()
            .find(|e| e.codename == self)
            .map(|e| e.index)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        CODENAME_LOOKUP_TABLE
            .iter()
            .find(|e| e.codename == self)
            .map_or("Unknown", |e| e.name)
    }

    /// Only the desktop/HEDT families with known UMC layouts resolve to a DRAM type.
    #[must_use]
    pub const fn memory_type(self) -> MemoryType {
        match self {
            Self::GraniteRidge => MemoryType::Ddr5,
            Self::Matisse
            | Self::SummitRidge
            | Self::PinnacleRidge
            | Self::Vermeer
            | Self::Naples
            | Self::Chagall => MemoryType::Ddr4,
            _ => MemoryType::Unknown,
        }
    }

    /// The newest generation, whose PM table is addressed by byte offsets.
    #[must_use]
    pub const fn uses_byte_offset_pm_table(self) -> bool {
        matches!(self, Self::GraniteRidge)
    }
}

impl std::fmt::Display for Codename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "Unknown",
            Self::Ddr4 => "DDR4",
            Self::Ddr5 => "DDR5",
        })
    }
}
