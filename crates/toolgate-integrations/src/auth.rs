use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};

use toolgate_core::config::OutboundConfig;
use toolgate_core::{CallContext, Error, IntegrationKind};

use crate::http::send_json;

/// Exchanges a Descope session for a provider access token.
pub struct OutboundTokens {
    http: Client,
    config: OutboundConfig,
}

impl OutboundTokens {
    #[must_use]
    pub fn new(http: Client, config: OutboundConfig) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub fn app_id(&self, kind: IntegrationKind) -> Option<&str> {
        self.config.app_id(kind)
    }

    /// Request an access token for `app_id` on behalf of `session_id`.
    ///
    /// # Errors
    ///
    /// [`Error::Upstream`] when the exchange fails or returns no token.
    pub async fn exchange(&self, app_id: &str, session_id: &str) -> Result<String, Error> {
        let url = format!(
            "{}/v1/outbound/{}/token",
            self.config.api_base.trim_end_matches('/'),
            crate::http::segment(app_id)
        );
        let body = send_json(
            "Descope",
            self.http
                .post(url)
                .header("x-project-id", &self.config.project_id)
                .bearer_auth(&self.config.management_key)
                .json(&json!({ "sessionId": session_id })),
        )
        .await?;

        body.get("accessToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::upstream("Descope", "no access token from Descope"))
    }
}

/// Where an integration gets its bearer token for one call.
#[derive(Clone)]
pub struct Credentials {
    kind: IntegrationKind,
    env_var: &'static str,
    static_token: Option<String>,
    outbound: Option<Arc<OutboundTokens>>,
}

impl Credentials {
    pub fn new(
        kind: IntegrationKind,
        env_var: &'static str,
        static_token: Option<String>,
        outbound: Option<Arc<OutboundTokens>>,
    ) -> Self {
        Self {
            kind,
            env_var,
            static_token,
            outbound,
        }
    }

    /// Resolve the token: session exchange first, then the static token.
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`] when neither source is available.
    pub async fn token(&self, ctx: &CallContext) -> Result<String, Error> {
        if let (Some(session_id), Some(outbound)) = (&ctx.session_id, &self.outbound) {
            if let Some(app_id) = outbound.app_id(self.kind) {
                tracing::debug!(integration = %self.kind, "exchanging session for outbound token");
                return outbound.exchange(app_id, session_id).await;
            }
        }
        self.static_token
            .clone()
            .ok_or_else(|| Error::NotConfigured(self.env_var.to_string()))
    }
}
