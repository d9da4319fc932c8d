//! Gmail v1 tools for the authenticated user (`me`).

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use toolgate_core::config::GoogleConfig;
use toolgate_core::{CallContext, Error, IntegrationKind, Tool, ToolDescriptor};

use crate::auth::{Credentials, OutboundTokens};
use crate::http::{pick, segment, send_json};

const SERVICE: &str = "Gmail";
const DEFAULT_MAX_RESULTS: u32 = 10;

const MESSAGE_FIELDS: &[&str] = &["id", "threadId", "snippet", "internalDate"];
const LABEL_FIELDS: &[&str] = &[
    "id",
    "name",
    "type",
    "messagesTotal",
    "messagesUnread",
    "threadsTotal",
    "threadsUnread",
];

pub struct GmailClient {
    http: Client,
    api_base: String,
    credentials: Credentials,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Full,
    Metadata,
    Minimal,
    Raw,
}

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub user_google_email: String,
    pub query: String,
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetMessageArgs {
    pub user_google_email: String,
    pub message_id: String,
    #[serde(default)]
    pub format: MessageFormat,
}

/// Fields shared by sent messages and drafts.
#[derive(Debug, Default, Deserialize)]
pub struct ComposeArgs {
    pub user_google_email: String,
    pub to: Option<String>,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadArgs {
    pub user_google_email: String,
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListLabelsArgs {
    pub user_google_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ManageLabelArgs {
    pub user_google_email: String,
    pub action: String,
    pub name: Option<String>,
    pub label_id: Option<String>,
    pub label_list_visibility: Option<String>,
    pub message_list_visibility: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LabelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_list_visibility: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_list_visibility: Option<&'a str>,
}

impl GmailClient {
    pub fn new(http: Client, config: &GoogleConfig, outbound: Option<Arc<OutboundTokens>>) -> Self {
        Self {
            http,
            api_base: config.gmail_api_base.trim_end_matches('/').to_string(),
            credentials: Credentials::new(
                IntegrationKind::Gmail,
                "GOOGLE_OAUTH_ACCESS_TOKEN",
                config.access_token.clone(),
                outbound,
            ),
        }
    }

    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/users/me{path}", self.api_base))
            .bearer_auth(token)
    }

    pub async fn search(self: Arc<Self>, ctx: CallContext, args: SearchArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "searching messages");
        let token = self.credentials.token(&ctx).await?;
        let max_results = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS).to_string();
        let list = send_json(
            SERVICE,
            self.request(Method::GET, &token, "/messages")
                .query(&[("q", args.query.as_str()), ("maxResults", max_results.as_str())]),
        )
        .await?;
        Ok(trim_list(&list, "messages", MESSAGE_FIELDS))
    }

    pub async fn message(
        self: Arc<Self>,
        ctx: CallContext,
        args: GetMessageArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        send_json(
            SERVICE,
            self.request(
                Method::GET,
                &token,
                &format!("/messages/{}", segment(&args.message_id)),
            )
            .query(&[("format", args.format)]),
        )
        .await
    }

    pub async fn send(self: Arc<Self>, ctx: CallContext, args: ComposeArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "sending message");
        let message = encoded_message(&args)?;
        let token = self.credentials.token(&ctx).await?;
        send_json(
            SERVICE,
            self.request(Method::POST, &token, "/messages/send").json(&message),
        )
        .await
    }

    pub async fn create_draft(
        self: Arc<Self>,
        ctx: CallContext,
        args: ComposeArgs,
    ) -> Result<Value, Error> {
        let message = encoded_message(&args)?;
        let token = self.credentials.token(&ctx).await?;
        send_json(
            SERVICE,
            self.request(Method::POST, &token, "/drafts")
                .json(&json!({ "message": message })),
        )
        .await
    }

    pub async fn thread(self: Arc<Self>, ctx: CallContext, args: ThreadArgs) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        send_json(
            SERVICE,
            self.request(
                Method::GET,
                &token,
                &format!("/threads/{}", segment(&args.thread_id)),
            )
            .query(&[("format", "full")]),
        )
        .await
    }

    pub async fn labels(
        self: Arc<Self>,
        ctx: CallContext,
        args: ListLabelsArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "listing labels");
        let token = self.credentials.token(&ctx).await?;
        let list = send_json(SERVICE, self.request(Method::GET, &token, "/labels")).await?;
        Ok(trim_list(&list, "labels", LABEL_FIELDS))
    }

    pub async fn manage_label(
        self: Arc<Self>,
        ctx: CallContext,
        args: ManageLabelArgs,
    ) -> Result<Value, Error> {
        let body = LabelBody {
            name: args.name.as_deref(),
            label_list_visibility: args.label_list_visibility.as_deref(),
            message_list_visibility: args.message_list_visibility.as_deref(),
        };

        match args.action.as_str() {
            "create" => {
                if non_empty(body.name).is_none() {
                    return Err(Error::MissingArgument("name".to_string()));
                }
                let token = self.credentials.token(&ctx).await?;
                send_json(
                    SERVICE,
                    self.request(Method::POST, &token, "/labels").json(&body),
                )
                .await
            }
            "update" => {
                let label_id = required_label(args.label_id.as_deref())?;
                let token = self.credentials.token(&ctx).await?;
                send_json(
                    SERVICE,
                    self.request(Method::PATCH, &token, &format!("/labels/{}", segment(label_id)))
                        .json(&body),
                )
                .await
            }
            "delete" => {
                let label_id = required_label(args.label_id.as_deref())?;
                let token = self.credentials.token(&ctx).await?;
                send_json(
                    SERVICE,
                    self.request(Method::DELETE, &token, &format!("/labels/{}", segment(label_id))),
                )
                .await?;
                Ok(json!({ "success": true }))
            }
            other => Err(Error::InvalidArguments(format!("Invalid action: {other}"))),
        }
    }
}

fn required_label(label_id: Option<&str>) -> Result<&str, Error> {
    label_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MissingArgument("label_id".to_string()))
}

fn trim_list(list: &Value, key: &str, fields: &[&str]) -> Value {
    list.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|item| pick(item, fields)).collect())
        .unwrap_or_else(|| json!([]))
}

/// Render a plain-text RFC 822 message with CRLF line endings.
///
/// Header values may not contain line breaks.
pub(crate) fn mime_message(args: &ComposeArgs) -> Result<String, Error> {
    let headers = [
        ("to", args.to.as_deref()),
        ("subject", Some(args.subject.as_str())),
        ("cc", args.cc.as_deref()),
        ("bcc", args.bcc.as_deref()),
        ("in_reply_to", args.in_reply_to.as_deref()),
        ("references", args.references.as_deref()),
    ];
    for (field, value) in headers {
        if value.is_some_and(|v| v.contains(['\r', '\n'])) {
            return Err(Error::InvalidArguments(format!(
                "{field} must not contain line breaks"
            )));
        }
    }

    let mut lines = Vec::new();
    if let Some(to) = non_empty(args.to.as_deref()) {
        lines.push(format!("To: {to}"));
    }
    lines.push(format!("Subject: {}", args.subject));
    if let Some(cc) = non_empty(args.cc.as_deref()) {
        lines.push(format!("Cc: {cc}"));
    }
    if let Some(bcc) = non_empty(args.bcc.as_deref()) {
        lines.push(format!("Bcc: {bcc}"));
    }
    if let Some(in_reply_to) = non_empty(args.in_reply_to.as_deref()) {
        lines.push(format!("In-Reply-To: {in_reply_to}"));
    }
    if let Some(references) = non_empty(args.references.as_deref()) {
        lines.push(format!("References: {references}"));
    }
    lines.push("MIME-Version: 1.0".to_string());
    lines.push("Content-Type: text/plain; charset=utf-8".to_string());
    lines.push(String::new());
    lines.push(args.body.clone());
    Ok(lines.join("\r\n"))
}

fn encoded_message(args: &ComposeArgs) -> Result<Value, Error> {
    let mut message = json!({ "raw": URL_SAFE_NO_PAD.encode(mime_message(args)?) });
    if let Some(thread_id) = non_empty(args.thread_id.as_deref()) {
        message["threadId"] = json!(thread_id);
    }
    Ok(message)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn schema(properties: Value, required: &[&str]) -> Value {
    let mut properties = properties;
    properties["user_google_email"] = json!({ "type": "string" });
    let mut all_required = vec!["user_google_email"];
    all_required.extend_from_slice(required);
    json!({ "type": "object", "properties": properties, "required": all_required })
}

fn compose_properties() -> Value {
    json!({
        "to": { "type": "string" },
        "subject": { "type": "string" },
        "body": { "type": "string" },
        "cc": { "type": "string" },
        "bcc": { "type": "string" },
        "thread_id": { "type": "string" },
        "in_reply_to": { "type": "string" },
        "references": { "type": "string" }
    })
}

/// Every Gmail tool, bound to `client`.
pub fn tools(client: &Arc<GmailClient>) -> Vec<Tool> {
    vec![
        Tool::typed(
            ToolDescriptor::new(
                "gmail_search_messages",
                "Search for messages in Gmail",
                schema(
                    json!({
                        "query": { "type": "string" },
                        "max_results": { "type": "number", "default": DEFAULT_MAX_RESULTS }
                    }),
                    &["query"],
                ),
            ),
            client,
            GmailClient::search,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_get_message",
                "Get the content of a specific message",
                schema(
                    json!({
                        "message_id": { "type": "string" },
                        "format": {
                            "type": "string",
                            "enum": ["full", "metadata", "minimal", "raw"],
                            "default": "full"
                        }
                    }),
                    &["message_id"],
                ),
            ),
            client,
            GmailClient::message,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_send_message",
                "Send an email message",
                schema(compose_properties(), &["to", "subject", "body"]),
            ),
            client,
            GmailClient::send,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_create_draft",
                "Create a draft email message",
                schema(compose_properties(), &["subject", "body"]),
            ),
            client,
            GmailClient::create_draft,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_get_thread",
                "Get a thread of messages",
                schema(json!({ "thread_id": { "type": "string" } }), &["thread_id"]),
            ),
            client,
            GmailClient::thread,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_list_labels",
                "List all Gmail labels",
                schema(json!({}), &[]),
            ),
            client,
            GmailClient::labels,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "gmail_manage_label",
                "Create, update, or delete a Gmail label",
                schema(
                    json!({
                        "action": { "type": "string", "enum": ["create", "update", "delete"] },
                        "name": { "type": "string" },
                        "label_id": { "type": "string" },
                        "label_list_visibility": { "type": "string", "enum": ["labelShow", "labelHide"] },
                        "message_list_visibility": { "type": "string", "enum": ["show", "hide"] }
                    }),
                    &["action"],
                ),
            ),
            client,
            GmailClient::manage_label,
        ),
    ]
}
