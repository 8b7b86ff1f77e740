//! Record model: semi-structured records, typed views over them, file types
//! and the field names the join relies on.

pub mod donor;
pub mod fields;
pub mod file_type;
pub mod marking;
pub mod record;
pub mod views;

pub use donor::DonorSample;
pub use file_type::FileType;
pub use marking::Marking;
pub use record::{canonical_value, Record};
pub use views::{ConsequenceRecord, MetaRecord, MutationRecord, SampleRecord};
