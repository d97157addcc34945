//! Credential handling for model providers.

pub mod credentials;

pub use credentials::ApiKey;
