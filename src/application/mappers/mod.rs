pub mod records;
pub mod timestamps;

pub use records::{from_record, from_records, to_fields, to_record};
pub use timestamps::{normalize_fields, normalize_record, normalize_records, normalize_value};
