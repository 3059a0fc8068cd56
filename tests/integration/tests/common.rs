//! Common test utilities and fixtures.
//!
//! [`TestIdp`] plays the identity provider: it issues responses and logout
//! requests signed with its own key, so the service provider under test can
//! be exercised end to end.

use std::collections::BTreeMap;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{Oaep, RsaPublicKey};
use saml_sp::bindings::{HttpPostBinding, HttpRedirectBinding};
use saml_sp::signature::XmlSigner;
use saml_sp::{
    Certificate, IdentityProviderTrust, Preferences, ServiceProvider, ServiceProviderConfig, SignatureAlgorithm,
    SignatureTrust,
};
use saml_sp_crypto::CertificateInfo;

pub const SP_CERT: &str = include_str!("../../../crates/saml-sp/tests/fixtures/sp-cert.pem");
pub const SP_KEY: &str = include_str!("../../../crates/saml-sp/tests/fixtures/sp-key.pem");
pub const IDP_CERT: &str = include_str!("../../../crates/saml-sp/tests/fixtures/idp-cert.pem");
pub const IDP_KEY: &str = include_str!("../../../crates/saml-sp/tests/fixtures/idp-key.pem");
pub const ROGUE_CERT: &str = include_str!("../../../crates/saml-sp/tests/fixtures/rogue-cert.pem");
pub const ROGUE_KEY: &str = include_str!("../../../crates/saml-sp/tests/fixtures/rogue-key.pem");
pub const AZURE_METADATA: &str = include_str!("../../../crates/saml-sp/tests/fixtures/azure-ad-metadata.xml");

pub const SP_ID: &str = "https://sp.example.com/saml";
pub const SP_ACS: &str = "https://sp.example.com/saml/acs";
pub const SP_SLO: &str = "https://sp.example.com/saml/slo";
pub const IDP_ID: &str = "https://idp.example.com";
pub const IDP_SSO: &str = "https://idp.example.com/sso";

pub const EMAIL_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("saml_sp=debug")
        .with_test_writer()
        .try_init();
}

pub fn certificate(pem: &str, key: &str) -> Certificate {
    Certificate::new(pem, key, SignatureAlgorithm::RsaSha256, Utc::now() + Duration::days(30))
}

pub fn sp_config() -> ServiceProviderConfig {
    ServiceProviderConfig::new(SP_ID, SP_ACS, SP_SLO, vec![certificate(SP_CERT, SP_KEY)])
}

pub fn idp_trust() -> IdentityProviderTrust {
    IdentityProviderTrust::new(IDP_ID, IDP_SSO, SignatureTrust::new(SignatureAlgorithm::RsaSha256, [IDP_CERT]))
}

pub fn provider(preferences: Preferences) -> anyhow::Result<ServiceProvider> {
    init_tracing();
    let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let provider = ServiceProvider::builder(sp_config(), idp_trust())
        .preferences(preferences)
        .id_generator(Arc::new(move || {
            format!("req-{}", counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
        }))
        .build()?;
    Ok(provider)
}

fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Shape of the assertion issued by [`TestIdp`].
#[derive(Debug, Clone)]
pub struct AssertionSpec {
    pub id: String,
    pub issuer: String,
    pub audience: String,
    pub subject: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub attributes: Vec<(String, String)>,
}

impl AssertionSpec {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: "_assertion-1".to_string(),
            issuer: IDP_ID.to_string(),
            audience: SP_ID.to_string(),
            subject: "user@example.com".to_string(),
            not_before: Some(now - Duration::minutes(1)),
            not_on_or_after: Some(now + Duration::minutes(5)),
            attributes: vec![
                (EMAIL_CLAIM.to_string(), "user@example.com".to_string()),
                ("department".to_string(), "Engineering".to_string()),
            ],
        }
    }

    /// The assertion as a standalone document declaring its own namespace.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut conditions = String::from("<saml:Conditions");
        if let Some(nb) = self.not_before {
            conditions.push_str(&format!(r#" NotBefore="{}""#, instant(nb)));
        }
        if let Some(noa) = self.not_on_or_after {
            conditions.push_str(&format!(r#" NotOnOrAfter="{}""#, instant(noa)));
        }
        conditions.push_str(&format!(
            "><saml:AudienceRestriction><saml:Audience>{}</saml:Audience></saml:AudienceRestriction></saml:Conditions>",
            self.audience
        ));

        let attributes: String = self
            .attributes
            .iter()
            .map(|(name, value)| {
                format!(r#"<saml:Attribute Name="{name}"><saml:AttributeValue>{value}</saml:AttributeValue></saml:Attribute>"#)
            })
            .collect();

        format!(
            concat!(
                r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{now}">"#,
                r#"<saml:Issuer>{issuer}</saml:Issuer>"#,
                r#"<saml:Subject><saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{subject}</saml:NameID>"#,
                r#"<saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer"><saml:SubjectConfirmationData InResponseTo="_req-0" Recipient="{acs}"/></saml:SubjectConfirmation></saml:Subject>"#,
                "{conditions}",
                r#"<saml:AuthnStatement AuthnInstant="{now}" SessionIndex="_session-1"><saml:AuthnContext><saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:Password</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>"#,
                r#"<saml:AttributeStatement>{attributes}</saml:AttributeStatement>"#,
                r#"</saml:Assertion>"#
            ),
            id = self.id,
            now = instant(now),
            issuer = self.issuer,
            subject = self.subject,
            acs = SP_ACS,
            conditions = conditions,
            attributes = attributes,
        )
    }
}

/// The identity provider side of the tests.
pub struct TestIdp {
    signer: XmlSigner,
    pub issuer: String,
    pub status: String,
}

impl TestIdp {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_key(IDP_CERT, IDP_KEY)
    }

    /// An identity provider signing with a certificate the SP does not trust.
    pub fn rogue() -> anyhow::Result<Self> {
        Self::with_key(ROGUE_CERT, ROGUE_KEY)
    }

    fn with_key(cert: &str, key: &str) -> anyhow::Result<Self> {
        Ok(Self {
            signer: XmlSigner::new(&certificate(cert, key))?,
            issuer: IDP_ID.to_string(),
            status: "urn:oasis:names:tc:SAML:2.0:status:Success".to_string(),
        })
    }

    /// Wraps assertion markup in a `samlp:Response`.
    pub fn response(&self, assertions: &str, now: DateTime<Utc>) -> String {
        format!(
            concat!(
                r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
                r#"ID="_response-1" InResponseTo="_req-0" Version="2.0" IssueInstant="{now}" Destination="{acs}">"#,
                r#"<saml:Issuer>{issuer}</saml:Issuer>"#,
                r#"<samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status>"#,
                "{assertions}",
                r#"</samlp:Response>"#
            ),
            now = instant(now),
            acs = SP_ACS,
            issuer = self.issuer,
            status = self.status,
            assertions = assertions,
        )
    }

    /// A response carrying `spec` with the assertion signed.
    pub fn signed_response(&self, spec: &AssertionSpec, now: DateTime<Utc>) -> anyhow::Result<String> {
        let xml = self.response(&spec.render(now), now);
        Ok(self.signer.sign_element(&xml, &spec.id)?)
    }

    /// A response whose assertion is signed, then encrypted for the SP.
    pub fn encrypted_response(&self, spec: &AssertionSpec, now: DateTime<Utc>) -> anyhow::Result<String> {
        self.encrypted_markup_response(&spec.render(now), &spec.id, now)
    }

    /// Signs and encrypts arbitrary assertion markup carrying `ID="{id}"`.
    pub fn encrypted_markup_response(&self, assertion: &str, id: &str, now: DateTime<Utc>) -> anyhow::Result<String> {
        let signed = self.signer.sign_element(assertion, id)?;
        let encrypted = encrypt_for_sp(&signed)?;
        Ok(self.response(&encrypted, now))
    }

    /// Signs a whole document at its root.
    pub fn sign(&self, xml: &str) -> anyhow::Result<String> {
        Ok(self.signer.sign(xml)?)
    }

    /// A redirect query carrying `xml` with a detached signature.
    pub fn signed_redirect_query(&self, xml: &str, relay_state: Option<&str>) -> anyhow::Result<String> {
        let encoded = HttpRedirectBinding::encode_message(xml)?;
        Ok(self.signer.sign_redirect_query("SAMLRequest", &encoded, relay_state)?)
    }

    pub fn logout_request(&self, now: DateTime<Utc>) -> String {
        format!(
            concat!(
                r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
                r#"ID="_logout-1" Version="2.0" IssueInstant="{now}" Destination="{slo}">"#,
                r#"<saml:Issuer>{issuer}</saml:Issuer>"#,
                r#"<saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">user@example.com</saml:NameID>"#,
                r#"<samlp:SessionIndex>_session-1</samlp:SessionIndex>"#,
                r#"</samlp:LogoutRequest>"#
            ),
            now = instant(now),
            slo = SP_SLO,
            issuer = self.issuer,
        )
    }
}

/// HTTP-POST form fields for a response.
pub fn post_form(xml: &str, relay_state: Option<&str>) -> BTreeMap<String, String> {
    HttpPostBinding::encode_response_fields(xml, relay_state)
}

/// AES-256-GCM content encryption with an RSA-OAEP wrapped key.
fn encrypt_for_sp(assertion: &str) -> anyhow::Result<String> {
    let mut rng = rand::thread_rng();
    let mut key = [0u8; 32];
    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut nonce);

    let sealed = aes_gcm::Aes256Gcm::new(&key.into())
        .encrypt(aes_gcm::Nonce::from_slice(&nonce), assertion.as_bytes())
        .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;
    let mut value = nonce.to_vec();
    value.extend(sealed);

    let info = CertificateInfo::from_pem(SP_CERT)?;
    let public_key = RsaPublicKey::from_pkcs1_der(info.public_key())?;
    let wrapped = public_key.encrypt(&mut rng, Oaep::new::<sha1::Sha1>(), &key)?;

    let b64 = |data: &[u8]| base64::engine::general_purpose::STANDARD.encode(data);
    Ok(format!(
        concat!(
            r#"<saml:EncryptedAssertion><xenc:EncryptedData xmlns:xenc="http://www.w3.org/2001/04/xmlenc#" Type="http://www.w3.org/2001/04/xmlenc#Element">"#,
            r#"<xenc:EncryptionMethod Algorithm="http://www.w3.org/2009/xmlenc11#aes256-gcm"/>"#,
            r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p"/>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{wrapped}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey></ds:KeyInfo>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData>"#,
            r#"</xenc:EncryptedData></saml:EncryptedAssertion>"#
        ),
        wrapped = b64(&wrapped),
        value = b64(&value),
    ))
}
