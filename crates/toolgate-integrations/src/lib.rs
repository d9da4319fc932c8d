pub mod auth;
pub mod calendar;
pub mod github;
pub mod gmail;
pub mod http;
pub mod sheets;
pub mod slack;

use std::sync::Arc;

use toolgate_core::{Error, GatewayConfig, IntegrationKind, Tool};

use crate::auth::OutboundTokens;

/// Build the tool list for every enabled integration.
///
/// Tools are registered whether or not their credentials are present; a
/// missing token is reported when the tool is called.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the outbound HTTP client cannot be built.
pub fn build_tools(config: &GatewayConfig) -> Result<Vec<Tool>, Error> {
    let http = http::build_client(config)?;
    let outbound = config
        .outbound
        .clone()
        .map(|outbound| Arc::new(OutboundTokens::new(http.clone(), outbound)));

    let mut tools = Vec::new();
    for kind in &config.enabled {
        let added = match kind {
            IntegrationKind::Slack => slack::tools(&Arc::new(slack::SlackClient::new(
                http.clone(),
                &config.slack,
                outbound.clone(),
            ))),
            IntegrationKind::Github => github::tools(&Arc::new(github::GithubClient::new(
                http.clone(),
                &config.github,
                outbound.clone(),
            ))),
            IntegrationKind::Calendar => calendar::tools(&Arc::new(calendar::CalendarClient::new(
                http.clone(),
                &config.google,
                outbound.clone(),
            ))),
            IntegrationKind::Gmail => gmail::tools(&Arc::new(gmail::GmailClient::new(
                http.clone(),
                &config.google,
                outbound.clone(),
            ))),
            IntegrationKind::Sheets => sheets::tools(&Arc::new(sheets::SheetsClient::new(
                http.clone(),
                &config.google,
                outbound.clone(),
            ))),
        };
        tracing::info!(integration = %kind, tools = added.len(), "integration enabled");
        tools.extend(added);
    }
    Ok(tools)
}
