//! Configuration module
//!
//! Handles CLI configuration: where the server lives and how to authenticate.

use mars_client::MarsClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the MARS server
    pub server_url: String,
    /// Token sent as `Authorization: Bearer ...`
    pub token: Option<String>,
}

impl Config {
    /// Client for the configured server
    pub fn client(&self) -> MarsClient {
        let client = MarsClient::new(&self.server_url);
        match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }
}
