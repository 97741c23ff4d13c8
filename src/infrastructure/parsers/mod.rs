pub mod unit_file;

pub use unit_file::UnitFileParser;
