//! Report renderers.

pub mod csv_export;

pub use csv_export::report_to_csv;
