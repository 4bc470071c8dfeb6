pub mod codename;
pub mod driver;
pub mod msr;
pub mod physmem;
