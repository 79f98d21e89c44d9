//! Index record model and index-table data access.

pub mod index_data;
pub mod record;

pub use index_data::IndexData;
pub use record::IndexRecord;
