//! Utility modules.

pub mod file;
pub mod retry;
pub mod runtime;
pub mod text;

pub use file::{MAX_INPUT_SIZE, calculate_checksum, read_document_text, read_image};
pub use retry::{RetryConfig, Retryable, with_retry};
pub use runtime::{ORT_DYLIB_ENV, locate_onnx_runtime};
pub use text::{is_blank, preview};
