pub mod csv;
pub mod print;
