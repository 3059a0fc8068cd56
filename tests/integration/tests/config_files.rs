//! Configuration file tests.

use std::fs;

use saml_sp::bindings::HttpRedirectBinding;
use saml_sp::{ProviderConfig, ServiceProvider};

use crate::common::{AZURE_METADATA, IDP_CERT, IDP_KEY, SP_CERT, SP_KEY};

const CONFIG: &str = r#"
[sp]
id = "https://sp.example.com/saml"
assertion_url = "https://sp.example.com/saml/acs"
single_logout_url = "https://sp.example.com/saml/slo"

[[sp.signature]]
certificate = "certs/sp-cert.pem"
private_key = "certs/sp-key.pem"
algorithm = "sha256"

[[sp.encryption]]
certificate = "certs/idp-cert.pem"
private_key = "certs/idp-key.pem"

[idp]
metadata = "metadata/azure.xml"

[preferences]
force_authentication_by_default = true
add_name_id_policy = true
"#;

/// A configuration directory drives a working provider.
#[tokio::test]
async fn test_provider_from_config_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("certs"))?;
    fs::create_dir_all(dir.path().join("metadata"))?;
    fs::write(dir.path().join("certs/sp-cert.pem"), SP_CERT)?;
    fs::write(dir.path().join("certs/sp-key.pem"), SP_KEY)?;
    fs::write(dir.path().join("certs/idp-cert.pem"), IDP_CERT)?;
    fs::write(dir.path().join("certs/idp-key.pem"), IDP_KEY)?;
    fs::write(dir.path().join("metadata/azure.xml"), AZURE_METADATA)?;
    fs::write(dir.path().join("saml.toml"), CONFIG)?;

    let options = ProviderConfig::from_file(dir.path().join("saml.toml"))?.into_options()?;
    assert_eq!(options.service_provider.encryption.len(), 1);
    assert_ne!(options.service_provider.encryption, options.service_provider.signature);

    let sp = ServiceProvider::from_options(options)?;
    assert_eq!(sp.identity_provider().id, "https://sts.windows.net/id/");
    assert!(sp.preferences().add_name_id_policy);

    let url = sp.build_login_request_redirect_url(None, None).await?;
    assert!(url.starts_with("https://login.microsoftonline.com/id/saml2?SAMLRequest="));
    let decoded = HttpRedirectBinding::decode_url(&url)?;
    assert!(decoded.xml.contains(r#"ForceAuthn="true""#));
    assert!(decoded.xml.contains("NameIDPolicy"));

    let metadata = sp.metadata();
    assert_eq!(metadata.matches(r#"use="encryption""#).count(), 1);
    Ok(())
}
