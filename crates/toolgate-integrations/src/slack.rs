//! Slack Web API tools, authenticated with a bot token.

use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use toolgate_core::config::SlackConfig;
use toolgate_core::{CallContext, Error, IntegrationKind, Tool, ToolDescriptor};

use crate::auth::{Credentials, OutboundTokens};
use crate::http::send_json;

const SERVICE: &str = "Slack";
const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_HISTORY_LIMIT: u32 = 10;

pub struct SlackClient {
    http: Client,
    api_base: String,
    team_id: String,
    channel_ids: Vec<String>,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
pub struct ListChannelsArgs {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageArgs {
    pub channel_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyToThreadArgs {
    pub channel_id: String,
    pub thread_ts: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AddReactionArgs {
    pub channel_id: String,
    pub timestamp: String,
    pub reaction: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelHistoryArgs {
    pub channel_id: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadRepliesArgs {
    pub channel_id: String,
    pub thread_ts: String,
}

#[derive(Debug, Deserialize)]
pub struct GetUsersArgs {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfileArgs {
    pub user_id: String,
}

impl SlackClient {
    pub fn new(http: Client, config: &SlackConfig, outbound: Option<Arc<OutboundTokens>>) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            team_id: config.team_id.clone(),
            channel_ids: config.channel_ids.clone(),
            credentials: Credentials::new(
                IntegrationKind::Slack,
                "SLACK_BOT_TOKEN",
                config.bot_token.clone(),
                outbound,
            ),
        }
    }

    async fn get(&self, token: &str, method: &str, query: &[(&str, String)]) -> Result<Value, Error> {
        let request = self
            .http
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(token)
            .query(query);
        check_ok(send_json(SERVICE, request).await?)
    }

    async fn post(&self, token: &str, method: &str, body: &Value) -> Result<Value, Error> {
        let request = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(token)
            .json(body);
        check_ok(send_json(SERVICE, request).await?)
    }

    pub async fn list_channels(
        self: Arc<Self>,
        ctx: CallContext,
        args: ListChannelsArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;

        if self.channel_ids.is_empty() {
            let mut query = vec![
                ("types", "public_channel".to_string()),
                ("exclude_archived", "true".to_string()),
                ("limit", page_size(args.limit).to_string()),
                ("team_id", self.team_id.clone()),
            ];
            if let Some(cursor) = args.cursor {
                query.push(("cursor", cursor));
            }
            return self.get(&token, "conversations.list", &query).await;
        }

        let mut channels = Vec::with_capacity(self.channel_ids.len());
        for id in &self.channel_ids {
            match self
                .get(&token, "conversations.info", &[("channel", id.clone())])
                .await
            {
                Ok(info) => {
                    let channel = &info["channel"];
                    let archived = channel
                        .get("is_archived")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if channel.is_object() && !archived {
                        channels.push(channel.clone());
                    }
                }
                Err(err) => tracing::warn!(channel = %id, error = %err, "skipping channel"),
            }
        }

        Ok(json!({
            "ok": true,
            "channels": channels,
            "response_metadata": { "next_cursor": "" }
        }))
    }

    pub async fn post_message(
        self: Arc<Self>,
        ctx: CallContext,
        args: PostMessageArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        self.post(
            &token,
            "chat.postMessage",
            &json!({ "channel": args.channel_id, "text": args.text }),
        )
        .await
    }

    pub async fn reply_to_thread(
        self: Arc<Self>,
        ctx: CallContext,
        args: ReplyToThreadArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        self.post(
            &token,
            "chat.postMessage",
            &json!({
                "channel": args.channel_id,
                "thread_ts": args.thread_ts,
                "text": args.text
            }),
        )
        .await
    }

    pub async fn add_reaction(
        self: Arc<Self>,
        ctx: CallContext,
        args: AddReactionArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        self.post(
            &token,
            "reactions.add",
            &json!({
                "channel": args.channel_id,
                "timestamp": args.timestamp,
                "name": args.reaction
            }),
        )
        .await
    }

    pub async fn channel_history(
        self: Arc<Self>,
        ctx: CallContext,
        args: ChannelHistoryArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let limit = args.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.get(
            &token,
            "conversations.history",
            &[("channel", args.channel_id), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn thread_replies(
        self: Arc<Self>,
        ctx: CallContext,
        args: ThreadRepliesArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        self.get(
            &token,
            "conversations.replies",
            &[("channel", args.channel_id), ("ts", args.thread_ts)],
        )
        .await
    }

    pub async fn users(self: Arc<Self>, ctx: CallContext, args: GetUsersArgs) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let mut query = vec![
            ("limit", page_size(args.limit).to_string()),
            ("team_id", self.team_id.clone()),
        ];
        if let Some(cursor) = args.cursor {
            query.push(("cursor", cursor));
        }
        self.get(&token, "users.list", &query).await
    }

    pub async fn user_profile(
        self: Arc<Self>,
        ctx: CallContext,
        args: UserProfileArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        self.get(
            &token,
            "users.profile.get",
            &[("user", args.user_id), ("include_labels", "true".to_string())],
        )
        .await
    }
}

fn page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
}

/// Slack reports failures as HTTP 200 with `"ok": false`.
fn check_ok(body: Value) -> Result<Value, Error> {
    if body.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(Error::upstream(SERVICE, message));
    }
    Ok(body)
}

/// Every Slack tool, bound to `client`.
pub fn tools(client: &Arc<SlackClient>) -> Vec<Tool> {
    vec![
        Tool::typed(
            ToolDescriptor::new(
                "slack_list_channels",
                "List public or pre-defined channels in the workspace with pagination",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": { "type": "number", "default": 100 },
                        "cursor": { "type": "string" }
                    }
                }),
            ),
            client,
            SlackClient::list_channels,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_post_message",
                "Post a new message to a Slack channel",
                json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "string" },
                        "text": { "type": "string" }
                    },
                    "required": ["channel_id", "text"]
                }),
            ),
            client,
            SlackClient::post_message,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_reply_to_thread",
                "Reply to a specific message thread in Slack",
                json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "string" },
                        "thread_ts": { "type": "string" },
                        "text": { "type": "string" }
                    },
                    "required": ["channel_id", "thread_ts", "text"]
                }),
            ),
            client,
            SlackClient::reply_to_thread,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_add_reaction",
                "Add a reaction emoji to a message",
                json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "string" },
                        "timestamp": { "type": "string" },
                        "reaction": { "type": "string" }
                    },
                    "required": ["channel_id", "timestamp", "reaction"]
                }),
            ),
            client,
            SlackClient::add_reaction,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_get_channel_history",
                "Get recent messages from a channel",
                json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "string" },
                        "limit": { "type": "number", "default": 10 }
                    },
                    "required": ["channel_id"]
                }),
            ),
            client,
            SlackClient::channel_history,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_get_thread_replies",
                "Get all replies in a message thread",
                json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "string" },
                        "thread_ts": { "type": "string" }
                    },
                    "required": ["channel_id", "thread_ts"]
                }),
            ),
            client,
            SlackClient::thread_replies,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_get_users",
                "Get a list of all users in the workspace with basic profile information",
                json!({
                    "type": "object",
                    "properties": {
                        "cursor": { "type": "string" },
                        "limit": { "type": "number", "default": 100 }
                    }
                }),
            ),
            client,
            SlackClient::users,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "slack_get_user_profile",
                "Get detailed profile information for a specific user",
                json!({
                    "type": "object",
                    "properties": {
                        "user_id": { "type": "string" }
                    },
                    "required": ["user_id"]
                }),
            ),
            client,
            SlackClient::user_profile,
        ),
    ]
}
