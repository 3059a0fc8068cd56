//! SAML service provider types.

mod certificate;
pub mod constants;
mod identity_provider;
mod login_response;
mod preferences;
mod service_provider;

pub use certificate::*;
pub use constants::*;
pub use identity_provider::*;
pub use login_response::*;
pub use preferences::*;
pub use service_provider::*;
