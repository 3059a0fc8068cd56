//! HTTP-Redirect binding.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType, RELAY_STATE, SAML_REQUEST, SAML_RESPONSE};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a SAML request into a redirect URL.
    ///
    /// When `destination` already carries a query string the parameters are
    /// appended with `&`.
    pub fn encode_request(xml: &str, destination: &str, relay_state: Option<&str>) -> SamlResult<String> {
        Self::encode(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response into a redirect URL.
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> SamlResult<String> {
        Self::encode(xml, destination, relay_state, SamlMessageType::Response)
    }

    /// Builds the query string `SAMLRequest=...[&RelayState=...]`.
    pub fn encode_query(
        xml: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml)?;
        let mut query = format!("{}={}", message_type.form_param(), urlencoding::encode(&encoded));
        if let Some(rs) = relay_state {
            query.push_str(&format!("&{RELAY_STATE}={}", urlencoding::encode(rs)));
        }
        Ok(query)
    }

    /// Deflates and base64-encodes a message, without URL encoding.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }

    fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let query = Self::encode_query(xml, relay_state, message_type)?;
        Ok(format!("{destination}{}{query}", separator(destination)))
    }

    /// Decodes already URL-decoded redirect parameters.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::InvalidRequest(
                "No SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let b64_decoded = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let xml_bytes = deflate_decompress(&b64_decoded)?;
        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes a raw (URL-encoded) query string.
    pub fn decode_query(raw_query: &str) -> SamlResult<DecodedMessage> {
        RedirectQuery::parse(raw_query)?.decode()
    }

    /// Decodes a message from a full URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid URL: {e}")))?;
        Self::decode_query(parsed.query().unwrap_or_default())
    }

    /// Returns the raw query string of a URL, as needed for detached
    /// signature verification.
    pub fn raw_query(url: &str) -> SamlResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid URL: {e}")))?;
        parsed
            .query()
            .map(String::from)
            .ok_or_else(|| SamlError::InvalidRequest("URL has no query string".to_string()))
    }
}

/// One `key=value` pair of a redirect query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    /// The pair exactly as received, still URL-encoded.
    pub raw: String,
    /// The URL-decoded value.
    pub value: String,
}

/// The SAML parameters of an HTTP-Redirect query string.
///
/// The query is split once; message decoding and detached signature
/// verification both read from the same selection. Keys are compared after
/// URL decoding and each SAML parameter may appear at most once, so an
/// encoded duplicate such as `SAML%52equest` cannot shadow the signed one.
#[derive(Debug, Clone, Default)]
pub struct RedirectQuery {
    /// `SAMLRequest` or `SAMLResponse`.
    pub message: Option<(SamlMessageType, QueryParameter)>,
    /// `RelayState`.
    pub relay_state: Option<QueryParameter>,
    /// `SigAlg`.
    pub sig_alg: Option<QueryParameter>,
    /// `Signature`.
    pub signature: Option<QueryParameter>,
}

impl RedirectQuery {
    /// Splits a raw query string, with or without the leading `?`.
    pub fn parse(raw_query: &str) -> SamlResult<Self> {
        let raw_query = raw_query.strip_prefix('?').unwrap_or(raw_query);
        let mut query = Self::default();

        for raw in raw_query.split('&').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = url::form_urlencoded::parse(raw.as_bytes()).next() else {
                continue;
            };
            let parameter = QueryParameter {
                raw: raw.to_string(),
                value: value.into_owned(),
            };
            match key.as_ref() {
                SAML_REQUEST => set_once(&mut query.message, (SamlMessageType::Request, parameter), "SAML message")?,
                SAML_RESPONSE => set_once(&mut query.message, (SamlMessageType::Response, parameter), "SAML message")?,
                RELAY_STATE => set_once(&mut query.relay_state, parameter, RELAY_STATE)?,
                "SigAlg" => set_once(&mut query.sig_alg, parameter, "SigAlg")?,
                "Signature" => set_once(&mut query.signature, parameter, "Signature")?,
                _ => {}
            }
        }
        Ok(query)
    }

    /// Inflates the selected message.
    pub fn decode(&self) -> SamlResult<DecodedMessage> {
        let (saml_request, saml_response) = match &self.message {
            Some((SamlMessageType::Request, message)) => (Some(message.value.as_str()), None),
            Some((SamlMessageType::Response, message)) => (None, Some(message.value.as_str())),
            None => (None, None),
        };
        HttpRedirectBinding::decode(
            saml_request,
            saml_response,
            self.relay_state.as_ref().map(|p| p.value.as_str()),
            self.signature.as_ref().map(|p| p.value.as_str()),
            self.sig_alg.as_ref().map(|p| p.value.as_str()),
        )
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> SamlResult<()> {
    if slot.is_some() {
        return Err(SamlError::InvalidRequest(format!("duplicate {name} parameter")));
    }
    *slot = Some(value);
    Ok(())
}

fn separator(destination: &str) -> &'static str {
    match destination.split_once('?') {
        None => "?",
        Some((_, "")) => "",
        Some((_, query)) if query.ends_with('&') => "",
        Some(_) => "&",
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
pub(crate) fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("Compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("Compression finish error: {e}")))
}

/// Largest inflated message accepted from a redirect query.
pub const MAX_INFLATED_SIZE: u64 = 1024 * 1024;

/// Decompresses raw DEFLATE data, refusing output above
/// [`MAX_INFLATED_SIZE`].
pub(crate) fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_SIZE + 1);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("Decompression error: {e}")))?;
    if decompressed.len() as u64 > MAX_INFLATED_SIZE {
        return Err(SamlError::Deflate(format!(
            "inflated message exceeds {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(decompressed)
}
