//! HTTP-POST binding.

use std::collections::BTreeMap;

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType, RELAY_STATE, SAML_REQUEST, SAML_RESPONSE};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Form fields carrying a SAML request.
    #[must_use]
    pub fn encode_request_fields(xml: &str, relay_state: Option<&str>) -> BTreeMap<String, String> {
        Self::encode_fields(xml, relay_state, SamlMessageType::Request)
    }

    /// Form fields carrying a SAML response.
    #[must_use]
    pub fn encode_response_fields(xml: &str, relay_state: Option<&str>) -> BTreeMap<String, String> {
        Self::encode_fields(xml, relay_state, SamlMessageType::Response)
    }

    fn encode_fields(
        xml: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(
            message_type.form_param().to_string(),
            base64::engine::general_purpose::STANDARD.encode(xml),
        );
        if let Some(rs) = relay_state {
            fields.insert(RELAY_STATE.to_string(), rs.to_string());
        }
        fields
    }

    /// Decodes a SAML message from HTTP-POST form data.
    ///
    /// Line breaks and other whitespace inside the base64 payload are
    /// ignored. A missing or empty message is [`SamlError::EmptyResponse`].
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = match (saml_request, saml_response) {
            (Some(req), _) if !req.trim().is_empty() => (req, SamlMessageType::Request),
            (_, Some(resp)) if !resp.trim().is_empty() => (resp, SamlMessageType::Response),
            _ => return Err(SamlError::EmptyResponse),
        };

        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;
        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))?;
        if xml.trim().is_empty() {
            return Err(SamlError::EmptyResponse);
        }

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
        })
    }

    /// Decodes a form field map.
    pub fn decode_fields(fields: &BTreeMap<String, String>) -> SamlResult<DecodedMessage> {
        Self::decode(
            fields.get(SAML_REQUEST).map(String::as_str),
            fields.get(SAML_RESPONSE).map(String::as_str),
            fields.get(RELAY_STATE).map(String::as_str),
        )
    }
}
