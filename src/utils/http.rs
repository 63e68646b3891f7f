// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::GroupMeConfig;

/// Create a configured asynchronous HTTP client for the GroupMe API.
pub fn create_async_client(config: &GroupMeConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(create_async_client(&GroupMeConfig::default()).is_ok());
    }
}
