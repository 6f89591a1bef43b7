pub mod aggregate;
pub mod installments;
pub mod trip;
pub mod validation;
