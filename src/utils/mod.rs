pub mod segment_validator;

pub use segment_validator::{SegmentValidationError, validate_segment};
