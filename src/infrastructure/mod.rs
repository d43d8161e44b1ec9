pub mod engines;
pub mod observability;
pub mod runtime;
