pub mod curve;
pub mod dataset;
pub mod lookup_table;
