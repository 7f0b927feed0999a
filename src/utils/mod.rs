pub mod time_parser;
pub mod url_validator;

pub use time_parser::TimeParser;
pub use url_validator::{UrlValidationError, normalize_url, validate_url};
