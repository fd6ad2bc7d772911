// Output formatting module

pub mod netdata;

// Re-export commonly used items for cleaner imports
pub use netdata::NetdataWriter;
