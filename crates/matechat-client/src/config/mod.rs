//! Client config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use matechat_core::error::{MateChatError, Result};

pub use schema::{ClientConfig, ConnectionSection, LivenessSection, SessionSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| MateChatError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| MateChatError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
