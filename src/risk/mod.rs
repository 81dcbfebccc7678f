pub mod percentile;
pub mod var;
