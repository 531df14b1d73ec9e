//! # inbox-sanitizer-oauth
//!
//! `OAuth2` authorization for the Gmail REST API, as used by an installed
//! (desktop/CLI) application.
//!
//! ## Features
//!
//! - **Authorization Code Flow** with PKCE (RFC 7636)
//! - **Loopback redirect**: a one-shot local listener that captures the
//!   authorization code (RFC 8252 §7.3)
//! - **Token management**: refresh, expiration checking, JSON persistence
//!
//! ## Quick Start
//!
//! ```ignore
//! use inbox_sanitizer_oauth::{AuthorizationCodeFlow, LoopbackReceiver, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let receiver = LoopbackReceiver::bind(0).await?;
//!     let client = OAuthClient::new("client_id", Provider::google()?)
//!         .with_client_secret("secret")
//!         .with_redirect_uri(receiver.redirect_uri());
//!
//!     let flow = AuthorizationCodeFlow::new(client);
//!     println!("Visit: {}", flow.authorization_url());
//!
//!     let code = receiver.receive_code(flow.state()).await?;
//!     let token = flow.exchange_code(&code).await?;
//!     println!("Has refresh token: {}", token.refresh_token.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ### Token Refresh
//!
//! ```ignore
//! if token.is_expired() {
//!     let token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, LoopbackReceiver, OAuthClient, PkceChallenge};
pub use provider::Provider;
pub use token::Token;
