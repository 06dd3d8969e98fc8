pub mod benchmark_file;
pub mod demand;
pub mod reporting;
pub mod settings;
