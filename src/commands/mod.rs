pub mod finance;
pub mod fleet;
