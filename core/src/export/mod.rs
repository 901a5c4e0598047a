//! Export and rendering of recorded traffic

pub mod curl;
pub mod har;
pub mod preview;

pub use curl::to_curl;
pub use har::{export_har_to_path, records_to_har};
pub use preview::{body_as_text, details_text, preview_body, BodyPreview};
