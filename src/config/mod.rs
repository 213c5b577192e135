pub mod env;
pub mod provider;

pub use env::EnvConfig;
pub use provider::{ProviderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL_ID};
