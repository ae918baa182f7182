pub mod dataset;
pub mod maps;
