//! Message identifiers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{SamlError, SamlResult};
use crate::schema::is_ncname;

/// Source of unique identifiers for outgoing messages.
///
/// The value is prefixed with `_` and used as an XML `ID`, so it must be an
/// NCName once prefixed. Generation may be asynchronous (e.g. allocated by a
/// remote service).
#[async_trait]
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier.
    async fn generate(&self) -> SamlResult<String>;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

#[async_trait]
impl IdGenerator for UuidGenerator {
    async fn generate(&self) -> SamlResult<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    async fn generate(&self) -> SamlResult<String> {
        Ok(self())
    }
}

/// Generates an identifier and turns it into an XML `ID`.
pub(crate) async fn message_id(generator: &dyn IdGenerator) -> SamlResult<String> {
    let raw = generator.generate().await?;
    let id = format!("_{raw}");
    if raw.is_empty() || !is_ncname(&id) {
        return Err(SamlError::InvalidIdentifier(raw));
    }
    Ok(id)
}
