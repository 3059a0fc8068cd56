//! The service provider facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::bindings::{HttpPostBinding, HttpRedirectBinding, InboundMessage, LoginRequestPostForm};
use crate::config::ProviderOptions;
use crate::error::{SamlError, SamlResult};
use crate::id::{IdGenerator, UuidGenerator};
use crate::logout::{self, LogoutRequest};
use crate::metadata::{self, service_provider_metadata};
use crate::request::build_login_request;
use crate::response::ResponseProcessor;
use crate::schema::{SamlSchema, SchemaSet};
use crate::types::{IdentityProviderSource, IdentityProviderTrust, LoginResult, Preferences, ServiceProviderConfig};

/// A configured service provider.
///
/// Configuration is resolved once by [`ServiceProviderBuilder::build`] and
/// never changes afterwards, so a provider can be shared across tasks.
pub struct ServiceProvider {
    sp: ServiceProviderConfig,
    idp: IdentityProviderTrust,
    preferences: Preferences,
    id_generator: Arc<dyn IdGenerator>,
    schemas: SchemaSet,
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("sp", &self.sp)
            .field("idp", &self.idp)
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

impl ServiceProvider {
    /// Creates a builder.
    #[must_use]
    pub fn builder(sp: ServiceProviderConfig, idp: impl Into<IdentityProviderSource>) -> ServiceProviderBuilder {
        ServiceProviderBuilder::new(sp, idp.into())
    }

    /// Builds a provider from loaded configuration with the default id
    /// generator and schemas.
    pub fn from_options(options: ProviderOptions) -> SamlResult<Self> {
        Self::builder(options.service_provider, options.identity_provider)
            .preferences(options.preferences)
            .build()
    }

    /// The local service provider.
    #[must_use]
    pub fn service_provider(&self) -> &ServiceProviderConfig {
        &self.sp
    }

    /// The resolved identity provider trust.
    #[must_use]
    pub fn identity_provider(&self) -> &IdentityProviderTrust {
        &self.idp
    }

    /// The provider preferences.
    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// The service provider metadata document.
    #[must_use]
    pub fn metadata(&self) -> String {
        service_provider_metadata(&self.sp, &self.preferences.name_id_format)
    }

    /// Builds a login URL for the HTTP-Redirect binding.
    ///
    /// `force_authn` falls back to
    /// [`Preferences::force_authentication_by_default`].
    pub async fn build_login_request_redirect_url(
        &self,
        relay_state: Option<&str>,
        force_authn: Option<bool>,
    ) -> SamlResult<String> {
        let destination = &self.idp.redirect_login_url;
        let xml = self.login_request(destination, force_authn).await?;
        HttpRedirectBinding::encode_request(&xml, destination, relay_state)
    }

    /// Builds the form for the HTTP-POST binding.
    pub async fn build_login_request_post_form(
        &self,
        relay_state: Option<&str>,
        force_authn: Option<bool>,
    ) -> SamlResult<LoginRequestPostForm> {
        let action = self.idp.post_login_url.as_deref().ok_or_else(|| {
            SamlError::InvalidConfiguration("identity provider has no HTTP-POST login url".to_string())
        })?;
        let xml = self.login_request(action, force_authn).await?;
        Ok(LoginRequestPostForm {
            action: action.to_string(),
            fields: HttpPostBinding::encode_request_fields(&xml, relay_state),
        })
    }

    async fn login_request(&self, destination: &str, force_authn: Option<bool>) -> SamlResult<String> {
        let force_authn = force_authn.unwrap_or(self.preferences.force_authentication_by_default);
        build_login_request(
            &self.sp,
            &self.preferences,
            self.id_generator.as_ref(),
            destination,
            force_authn,
            Utc::now(),
        )
        .await
    }

    /// Validates a login response posted to the assertion consumer service.
    pub fn parse_login_response(&self, form: &BTreeMap<String, String>) -> SamlResult<LoginResult> {
        self.parse_login_response_at(form, Utc::now())
    }

    /// [`parse_login_response`](Self::parse_login_response) at a given instant.
    pub fn parse_login_response_at(
        &self,
        form: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> SamlResult<LoginResult> {
        ResponseProcessor::new(&self.sp, &self.idp, &self.preferences, &self.schemas).process_form(form, now)
    }

    /// Validates a logout request sent by the identity provider.
    pub fn parse_logout_request(&self, message: &InboundMessage) -> SamlResult<LogoutRequest> {
        logout::parse_logout_request(message, &self.idp, &self.schemas)
    }
}

/// Builder for [`ServiceProvider`].
pub struct ServiceProviderBuilder {
    sp: ServiceProviderConfig,
    idp: IdentityProviderSource,
    preferences: Preferences,
    id_generator: Arc<dyn IdGenerator>,
    schemas: SchemaSet,
}

impl ServiceProviderBuilder {
    fn new(sp: ServiceProviderConfig, idp: IdentityProviderSource) -> Self {
        Self {
            sp,
            idp,
            preferences: Preferences::default(),
            id_generator: Arc::new(UuidGenerator),
            schemas: SchemaSet::builtin(),
        }
    }

    /// Sets the preferences.
    #[must_use]
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Sets the message id generator.
    #[must_use]
    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Sets the schema validators.
    #[must_use]
    pub fn schemas(mut self, schemas: SchemaSet) -> Self {
        self.schemas = schemas;
        self
    }

    /// Resolves identity provider trust and builds the provider.
    ///
    /// Metadata must pass the metadata schema before trust is extracted.
    pub fn build(self) -> SamlResult<ServiceProvider> {
        if self.sp.signature.is_empty() {
            return Err(SamlError::InvalidConfiguration("no signing certificates configured".to_string()));
        }

        let idp = match self.idp {
            IdentityProviderSource::Inline(trust) => {
                trust.validate()?;
                trust
            }
            IdentityProviderSource::Metadata { xml, algorithm } => {
                self.schemas.validate(SamlSchema::Metadata, &xml)?;
                metadata::extract_with_algorithm(&xml, algorithm)?
            }
        };
        debug!(
            idp = %idp.id,
            certificates = idp.signature.allowed_certificates.len(),
            post_binding = idp.post_login_url.is_some(),
            "resolved identity provider trust"
        );
        info!(sp = %self.sp.id, idp = %idp.id, "service provider ready");

        Ok(ServiceProvider {
            sp: self.sp,
            idp,
            preferences: self.preferences,
            id_generator: self.id_generator,
            schemas: self.schemas,
        })
    }
}

impl std::fmt::Debug for ServiceProviderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProviderBuilder")
            .field("sp", &self.sp)
            .field("idp", &self.idp)
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}
