pub mod acpi;
pub mod agesa;
pub mod aml;
pub mod aod;
pub mod bclk;
pub mod dram;
pub mod family;
pub mod plausibility;
pub mod pm_table;
pub mod usage;
