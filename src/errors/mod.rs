//! Error types for network construction and evaluation.

mod network_error;

pub use network_error::NetworkError;
