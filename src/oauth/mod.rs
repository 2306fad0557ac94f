//! OAuth credentials and the usage endpoint client.

mod client;
mod credentials;

pub use client::OAuthUsageClient;
pub use credentials::load_oauth_token;
