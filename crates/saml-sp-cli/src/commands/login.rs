//! Login request commands.

use saml_sp::ServiceProvider;

use crate::cli::LoginArgs;
use crate::output::json;

/// Builds a redirect login URL.
pub async fn redirect_url(provider: &ServiceProvider, args: &LoginArgs) -> crate::CliResult<String> {
    Ok(provider
        .build_login_request_redirect_url(args.relay_state.as_deref(), args.force_authn)
        .await?)
}

/// Builds the POST login form.
pub async fn post_form(provider: &ServiceProvider, args: &LoginArgs) -> crate::CliResult<String> {
    let form = provider
        .build_login_request_post_form(args.relay_state.as_deref(), args.force_authn)
        .await?;
    json(&form)
}
