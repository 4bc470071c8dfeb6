//! PM table layouts per SMU table version.
//!
//! Every layout here was recovered by diffing live tables against known sensor
//! readings. Indices are `f32` slots unless the layout says otherwise.

use log::debug;

/// Named scalar a layout slot feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    Fclk,
    Uclk,
    Mclk,
    Vsoc,
    Vddp,
    VddgIod,
    VddgCcd,
    VddMisc,
    Vcore,
    IodHotspot,
}

/// How a layout's named slots are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Slot numbers are direct `f32` indices.
    FloatIndex,
    /// Slot numbers are byte offsets into the table (`index = offset / 4`).
    ByteOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedSlot {
    pub slot: usize,
    pub field: MetricField,
}

const fn slot(slot: usize, field: MetricField) -> NamedSlot {
    NamedSlot { slot, field }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyLayout {
    pub name: &'static str,
    pub named: &'static [NamedSlot],
    pub vid_index: usize,
    pub ppt_index: usize,
    pub socket_power_index: usize,
    pub core_voltage_start: usize,
    pub core_temp_start: usize,
    pub max_cores: usize,
}

impl FamilyLayout {
    /// Float index of a named slot under the given addressing scheme.
    #[must_use]
    pub const fn resolve(slot: NamedSlot, addressing: Addressing) -> usize {
        match addressing {
            Addressing::FloatIndex => slot.slot,
            Addressing::ByteOffset => slot.slot / 4,
        }
    }
}

// ===============================================================================================
// Layout Tables
// ===============================================================================================

use MetricField::{Fclk, IodHotspot, Mclk, Uclk, Vcore, VddMisc, VddgCcd, VddgIod, Vddp, Vsoc};

pub const GRANITE_RIDGE: FamilyLayout = FamilyLayout {
    name: "Granite Ridge",
    named: &[
        slot(11, IodHotspot),
        slot(58, VddMisc),
        slot(71, Fclk),
        slot(75, Uclk),
        slot(79, Mclk),
        slot(83, Vsoc),
        slot(259, VddgIod),
        slot(261, VddgCcd),
        slot(269, Vddp),
        slot(271, Vcore),
    ],
    vid_index: 275,
    ppt_index: 3,
    socket_power_index: 29,
    core_voltage_start: 309,
    core_temp_start: 317,
    max_cores: 8,
};

/// Byte offsets for the newest generation's core rails and clocks.
pub const GRANITE_RIDGE_BYTE_OFFSETS: &[NamedSlot] = &[
    slot(0x11C, Fclk),
    slot(0x12C, Uclk),
    slot(0x13C, Mclk),
    slot(0x14C, Vsoc),
    slot(0x434, Vddp),
    slot(0x40C, VddgIod),
    slot(0x414, VddgCcd),
    slot(0xE8, VddMisc),
    slot(0x43C, Vcore),
];

/// 16-core parts, older BIOS.
pub const VERMEER_380804: FamilyLayout = FamilyLayout {
    name: "Vermeer 0x380804",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(137, Vddp),
        slot(138, VddgIod),
        slot(139, VddgCcd),
        slot(40, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 185,
    core_temp_start: 201,
    max_cores: 16,
};

/// 16-core parts, newer BIOS.
pub const VERMEER_380805: FamilyLayout = FamilyLayout {
    name: "Vermeer 0x380805",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(137, Vddp),
        slot(138, VddgIod),
        slot(139, VddgCcd),
        slot(39, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 188,
    core_temp_start: 204,
    max_cores: 16,
};

/// 8-core parts, older BIOS.
pub const VERMEER_380904: FamilyLayout = FamilyLayout {
    name: "Vermeer 0x380904",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(137, Vddp),
        slot(138, VddgIod),
        slot(139, VddgCcd),
        slot(40, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 177,
    core_temp_start: 185,
    max_cores: 8,
};

/// 8-core parts, newer BIOS.
pub const VERMEER_380905: FamilyLayout = FamilyLayout {
    name: "Vermeer 0x380905",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(137, Vddp),
        slot(138, VddgIod),
        slot(139, VddgCcd),
        slot(39, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 180,
    core_temp_start: 188,
    max_cores: 8,
};

pub const CEZANNE_400005: FamilyLayout = FamilyLayout {
    name: "Cezanne 0x400005",
    named: &[
        slot(29, IodHotspot),
        slot(409, Fclk),
        slot(410, Uclk),
        slot(411, Mclk),
        slot(102, Vsoc),
        slot(565, Vddp),
        slot(98, Vcore),
    ],
    vid_index: 28,
    ppt_index: 5,
    socket_power_index: 38,
    core_voltage_start: 208,
    core_temp_start: 216,
    max_cores: 8,
};

pub const MATISSE_240903: FamilyLayout = FamilyLayout {
    name: "Matisse 0x240903",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(125, Vddp),
        slot(126, VddgIod),
        slot(39, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 155,
    core_temp_start: 163,
    max_cores: 8,
};

pub const MATISSE_240803: FamilyLayout = FamilyLayout {
    name: "Matisse 0x240803",
    named: &[
        slot(11, IodHotspot),
        slot(48, Fclk),
        slot(50, Uclk),
        slot(51, Mclk),
        slot(44, Vsoc),
        slot(125, Vddp),
        slot(126, VddgIod),
        slot(40, Vcore),
    ],
    vid_index: 10,
    ppt_index: 1,
    socket_power_index: 29,
    core_voltage_start: 163,
    core_temp_start: 179,
    max_cores: 16,
};

pub const RENOIR_370003: FamilyLayout = FamilyLayout {
    name: "Renoir 0x370003",
    named: &[
        slot(29, IodHotspot),
        slot(371, Fclk),
        slot(372, Uclk),
        slot(373, Mclk),
        slot(101, Vsoc),
        slot(527, Vddp),
        slot(97, Vcore),
    ],
    vid_index: 28,
    ppt_index: 5,
    socket_power_index: 38,
    core_voltage_start: 200,
    core_temp_start: 208,
    max_cores: 8,
};

pub const RENOIR_370005: FamilyLayout = FamilyLayout {
    name: "Renoir 0x370005",
    named: &[
        slot(29, IodHotspot),
        slot(378, Fclk),
        slot(379, Uclk),
        slot(380, Mclk),
        slot(101, Vsoc),
        slot(534, Vddp),
        slot(97, Vcore),
    ],
    vid_index: 28,
    ppt_index: 5,
    socket_power_index: 38,
    core_voltage_start: 207,
    core_temp_start: 215,
    max_cores: 8,
};

pub const RAVEN_1E0004: FamilyLayout = FamilyLayout {
    name: "Raven Ridge 0x1E0004",
    named: &[
        slot(61, IodHotspot),
        slot(166, Fclk),
        slot(167, Uclk),
        slot(168, Mclk),
        slot(65, Vsoc),
        slot(60, Vddp),
        slot(61, Vcore),
    ],
    vid_index: 57,
    ppt_index: 5,
    socket_power_index: 38,
    core_voltage_start: 104,
    core_temp_start: 108,
    max_cores: 4,
};

// ===============================================================================================
// Registry
// ===============================================================================================

/// Closed set of catalogued PM table families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PmFamily {
    GraniteRidge,
    Vermeer380804,
    Vermeer380805,
    Vermeer380904,
    Vermeer380905,
    Cezanne400005,
    Matisse240903,
    Matisse240803,
    Renoir370003,
    Renoir370005,
    Raven1E0004,
}

impl PmFamily {
    /// Resolves a PM table version tag. Uncatalogued versions get the newest layout.
    #[must_use]
    pub fn from_version(version: u32) -> Self {
        match version {
            0x0038_0804 => Self::Vermeer380804,
            0x0038_0805 => Self::Vermeer380805,
            0x0038_0904 => Self::Vermeer380904,
            0x0038_0905 => Self::Vermeer380905,
            0x0040_0005 => Self::Cezanne400005,
            0x0024_0903 => Self::Matisse240903,
            0x0024_0803 => Self::Matisse240803,
            0x0037_0003 => Self::Renoir370003,
            0x0037_0005 => Self::Renoir370005,
            0x001E_0004 => Self::Raven1E0004,
            _ => {
                debug!("PM table version 0x{version:08X} not catalogued, using Granite Ridge layout");
                Self::GraniteRidge
            }
        }
    }

    #[must_use]
    pub const fn layout(self) -> &'static FamilyLayout {
        match self {
            Self::GraniteRidge => &GRANITE_RIDGE,
            Self::Vermeer380804 => &VERMEER_380804,
            Self::Vermeer380805 => &VERMEER_380805,
            Self::Vermeer380904 => &VERMEER_380904,
            Self::Vermeer380905 => &VERMEER_380905,
            Self::Cezanne400005 => &CEZANNE_400005,
            Self::Matisse240903 => &MATISSE_240903,
            Self::Matisse240803 => &MATISSE_240803,
            Self::Renoir370003 => &RENOIR_370003,
            Self::Renoir370005 => &RENOIR_370005,
            Self::Raven1E0004 => &RAVEN_1E0004,
        }
    }
}

/// Total lookup from version tag to layout.
#[must_use]
pub fn lookup(version: u32) -> &'static FamilyLayout {
    PmFamily::from_version(version).layout()
}
