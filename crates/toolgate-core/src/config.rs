use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// One wrapped SaaS API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationKind {
    Slack,
    Github,
    Calendar,
    Gmail,
    Sheets,
}

impl IntegrationKind {
    pub const ALL: [Self; 5] = [
        Self::Slack,
        Self::Github,
        Self::Calendar,
        Self::Gmail,
        Self::Sheets,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Github => "github",
            Self::Calendar => "calendar",
            Self::Gmail => "gmail",
            Self::Sheets => "sheets",
        }
    }
}

impl std::fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown integration '{s}'")))
    }
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub team_id: String,
    /// When non-empty, channel listing is restricted to these ids.
    pub channel_ids: Vec<String>,
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            team_id: String::new(),
            channel_ids: Vec::new(),
            api_base: DEFAULT_SLACK_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
        }
    }
}

/// Shared by the calendar, gmail and sheets integrations.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub access_token: Option<String>,
    pub calendar_api_base: String,
    pub gmail_api_base: String,
    pub drive_api_base: String,
    pub sheets_api_base: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            calendar_api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            gmail_api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
        }
    }
}

/// Descope outbound-app token exchange.
#[derive(Debug, Clone, Default)]
pub struct OutboundConfig {
    pub api_base: String,
    pub project_id: String,
    pub management_key: String,
    pub slack_app_id: Option<String>,
    pub github_app_id: Option<String>,
    pub google_app_id: Option<String>,
}

impl OutboundConfig {
    /// Outbound app configured for the given integration, if any.
    #[must_use]
    pub fn app_id(&self, kind: IntegrationKind) -> Option<&str> {
        match kind {
            IntegrationKind::Slack => self.slack_app_id.as_deref(),
            IntegrationKind::Github => self.github_app_id.as_deref(),
            IntegrationKind::Calendar | IntegrationKind::Gmail | IntegrationKind::Sheets => {
                self.google_app_id.as_deref()
            }
        }
    }
}

/// Everything the integrations need, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub enabled: Vec<IntegrationKind>,
    pub http_timeout: Duration,
    pub slack: SlackConfig,
    pub github: GithubConfig,
    pub google: GoogleConfig,
    pub outbound: Option<OutboundConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: IntegrationKind::ALL.to_vec(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            slack: SlackConfig::default(),
            github: GithubConfig::default(),
            google: GoogleConfig::default(),
            outbound: None,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable holds an unparsable value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable holds an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let enabled = match get("TOOLGATE_INTEGRATIONS") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<IntegrationKind>)
                .collect::<Result<Vec<_>, _>>()?,
            None => IntegrationKind::ALL.to_vec(),
        };

        let http_timeout = match get("TOOLGATE_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                Error::Config(format!("TOOLGATE_HTTP_TIMEOUT_SECS: {e}"))
            })?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let slack = SlackConfig {
            bot_token: get("SLACK_BOT_TOKEN"),
            team_id: get("SLACK_TEAM_ID").unwrap_or_default(),
            channel_ids: get("SLACK_CHANNEL_IDS")
                .map(|ids| {
                    ids.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            api_base: or_default("SLACK_API_BASE", DEFAULT_SLACK_API_BASE),
        };

        let github = GithubConfig {
            token: get("GITHUB_PERSONAL_ACCESS_TOKEN"),
            api_base: or_default("GITHUB_API_BASE", DEFAULT_GITHUB_API_BASE),
        };

        let google = GoogleConfig {
            access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN"),
            calendar_api_base: or_default("GOOGLE_CALENDAR_API_BASE", DEFAULT_CALENDAR_API_BASE),
            gmail_api_base: or_default("GMAIL_API_BASE", DEFAULT_GMAIL_API_BASE),
            drive_api_base: or_default("GOOGLE_DRIVE_API_BASE", DEFAULT_DRIVE_API_BASE),
            sheets_api_base: or_default("GOOGLE_SHEETS_API_BASE", DEFAULT_SHEETS_API_BASE),
        };

        let outbound = match (
            get("DESCOPE_API_BASE"),
            get("DESCOPE_PROJECT_ID"),
            get("DESCOPE_MANAGEMENT_KEY"),
        ) {
            (Some(api_base), Some(project_id), Some(management_key)) => Some(OutboundConfig {
                api_base,
                project_id,
                management_key,
                slack_app_id: get("DESCOPE_OUTBOUND_APP_ID_SLACK"),
                github_app_id: get("DESCOPE_OUTBOUND_APP_ID_GITHUB"),
                google_app_id: get("DESCOPE_OUTBOUND_APP_ID_GOOGLE"),
            }),
            (None, None, None) => None,
            _ => {
                tracing::warn!(
                    "Descope outbound exchange disabled: DESCOPE_API_BASE, DESCOPE_PROJECT_ID and DESCOPE_MANAGEMENT_KEY must all be set"
                );
                None
            }
        };

        Ok(Self {
            enabled,
            http_timeout,
            slack,
            github,
            google,
            outbound,
        })
    }

    #[must_use]
    pub fn is_enabled(&self, kind: IntegrationKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// Whether calls to `kind` have a credential source: a static token or an
    /// outbound app to exchange sessions against.
    #[must_use]
    pub fn is_configured(&self, kind: IntegrationKind) -> bool {
        let static_token = match kind {
            IntegrationKind::Slack => self.slack.bot_token.is_some(),
            IntegrationKind::Github => self.github.token.is_some(),
            IntegrationKind::Calendar | IntegrationKind::Gmail | IntegrationKind::Sheets => {
                self.google.access_token.is_some()
            }
        };
        static_token
            || self
                .outbound
                .as_ref()
                .is_some_and(|outbound| outbound.app_id(kind).is_some())
    }
}
