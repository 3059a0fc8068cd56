//! SAML bindings.
//!
//! - **HTTP-Redirect** - messages are deflated (raw, no zlib header),
//!   base64-encoded and URL-encoded into the query string
//! - **HTTP-POST** - messages are base64-encoded into form fields; rendering
//!   the auto-submitting form is left to the HTTP layer
//!
//! ```rust,ignore
//! use saml_sp::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let url = HttpRedirectBinding::encode_request(&request_xml, "https://idp.example.com/sso", Some("state"))?;
//! let fields = HttpPostBinding::encode_request_fields(&request_xml, Some("state"));
//! ```

mod post;
mod redirect;

use std::collections::BTreeMap;

use serde::Serialize;

pub use post::*;
pub use redirect::*;

/// Form field carrying a SAML request.
pub const SAML_REQUEST: &str = "SAMLRequest";
/// Form field carrying a SAML response.
pub const SAML_RESPONSE: &str = "SAMLResponse";
/// Form field carrying the relay state.
pub const RELAY_STATE: &str = "RelayState";

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// A request (`AuthnRequest`, `LogoutRequest`).
    Request,
    /// A response.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => SAML_REQUEST,
            Self::Response => SAML_RESPONSE,
        }
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The detached signature (redirect binding only).
    pub signature: Option<String>,
    /// The detached signature algorithm (redirect binding only).
    pub sig_alg: Option<String>,
}

/// Data for a hidden, auto-submitted form using the HTTP-POST binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequestPostForm {
    /// The identity provider's POST login endpoint.
    pub action: String,
    /// `SAMLRequest` and, when given, `RelayState`.
    pub fields: BTreeMap<String, String>,
}

/// A message received by the service provider, as delivered by the HTTP layer.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// HTTP-Redirect: the raw, still URL-encoded query string.
    Redirect {
        /// Query string without the leading `?`.
        raw_query: String,
    },
    /// HTTP-POST: the decoded form fields.
    Post {
        /// Form fields by name.
        fields: BTreeMap<String, String>,
    },
}
