//! PDF upload and submission.

mod form;
mod validate;

pub use form::{FileSource, UploadForm};
pub use validate::{
    effective_query, UploadLimits, MAX_QUERY_CHARS, MIN_QUERY_CHARS, ONLY_PDF, QUERY_LENGTH,
    SELECT_PDF,
};
