//! SAML 2.0 service provider engine.
//!
//! This crate builds login requests for an identity provider and decides
//! whether the responses it sends back can be trusted:
//!
//! - **Login requests** - `AuthnRequest`s, optionally signed, for the
//!   HTTP-Redirect and HTTP-POST bindings
//! - **Login responses** - schema validation, decryption, signature
//!   verification against an allow-list, then status, issuer, audience and
//!   validity checks
//! - **Metadata** - identity provider trust from metadata, and the service
//!   provider's own metadata document
//! - **Single Logout** - verified `LogoutRequest`s from the identity provider
//!
//! # Architecture
//!
//! - [`types`] - Configuration and result types
//! - [`xml`] - Owned XML tree and canonicalization
//! - [`signature`] - Enveloped XML signatures
//! - [`encryption`] - `EncryptedAssertion` decryption
//! - [`schema`] - Structural schema validation
//! - [`bindings`] - HTTP-Redirect and HTTP-POST bindings
//! - [`metadata`] - Metadata extraction and rendering
//! - [`request`] / [`response`] / [`logout`] - Message pipelines
//! - [`provider`] - The [`ServiceProvider`] facade
//! - [`config`] - TOML configuration files
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_sp::{ServiceProvider, config::ProviderConfig};
//!
//! let options = ProviderConfig::from_file("saml.toml")?.into_options()?;
//! let provider = ServiceProvider::from_options(options)?;
//!
//! let login_url = provider.build_login_request_redirect_url(Some("/home"), None).await?;
//! // ... later, at the assertion consumer service:
//! let result = provider.parse_login_response(&form_fields)?;
//! println!("{:?}", result.response.subject());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod encryption;
pub mod error;
pub mod id;
pub mod logout;
pub mod metadata;
pub mod provider;
pub mod request;
pub mod response;
pub mod schema;
pub mod signature;
pub mod types;
pub mod xml;

pub use bindings::{InboundMessage, LoginRequestPostForm};
pub use config::{ProviderConfig, ProviderOptions};
pub use error::{SamlError, SamlResult};
pub use id::{IdGenerator, UuidGenerator};
pub use logout::LogoutRequest;
pub use provider::{ServiceProvider, ServiceProviderBuilder};
pub use saml_sp_crypto::SignatureAlgorithm;
pub use types::*;
