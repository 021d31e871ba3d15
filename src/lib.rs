pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{RetrieverError, SessionError};
pub use models::{Config, OutputFormat};
pub use services::Retriever;
pub use session::Session;
