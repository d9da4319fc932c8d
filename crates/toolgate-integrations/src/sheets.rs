//! Google Sheets v4 tools, with Drive v3 for listing spreadsheets.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use toolgate_core::config::GoogleConfig;
use toolgate_core::{CallContext, Error, IntegrationKind, Tool, ToolDescriptor};

use crate::auth::{Credentials, OutboundTokens};
use crate::http::{pick, segment, send_json};

const SERVICE: &str = "Google Sheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const DEFAULT_PAGE_SIZE: u32 = 25;
const DEFAULT_RANGE: &str = "A1:Z1000";

pub struct SheetsClient {
    http: Client,
    sheets_api_base: String,
    drive_api_base: String,
    credentials: Credentials,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    Raw,
    #[default]
    UserEntered,
}

#[derive(Debug, Deserialize)]
pub struct ListArgs {
    pub user_google_email: String,
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SpreadsheetArgs {
    pub user_google_email: String,
    pub spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadArgs {
    pub user_google_email: String,
    pub spreadsheet_id: String,
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModifyArgs {
    pub user_google_email: String,
    pub spreadsheet_id: String,
    pub range: String,
    pub values: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub value_input_option: ValueInputOption,
    #[serde(default)]
    pub clear_values: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateArgs {
    pub user_google_email: String,
    pub title: String,
    #[serde(default)]
    pub sheet_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddSheetArgs {
    pub user_google_email: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetsClient {
    pub fn new(http: Client, config: &GoogleConfig, outbound: Option<Arc<OutboundTokens>>) -> Self {
        Self {
            http,
            sheets_api_base: config.sheets_api_base.trim_end_matches('/').to_string(),
            drive_api_base: config.drive_api_base.trim_end_matches('/').to_string(),
            credentials: Credentials::new(
                IntegrationKind::Sheets,
                "GOOGLE_OAUTH_ACCESS_TOKEN",
                config.access_token.clone(),
                outbound,
            ),
        }
    }

    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.sheets_api_base))
            .bearer_auth(token)
    }

    fn values_path(spreadsheet_id: &str, range: &str) -> String {
        format!(
            "/spreadsheets/{}/values/{}",
            segment(spreadsheet_id),
            segment(range)
        )
    }

    pub async fn list(self: Arc<Self>, ctx: CallContext, args: ListArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "listing spreadsheets");
        let token = self.credentials.token(&ctx).await?;
        let page_size = args.max_results.unwrap_or(DEFAULT_PAGE_SIZE).to_string();
        let query = format!("mimeType='{SPREADSHEET_MIME}'");
        let files = send_json(
            SERVICE,
            self.http
                .get(format!("{}/files", self.drive_api_base))
                .bearer_auth(&token)
                .query(&[
                    ("q", query.as_str()),
                    ("pageSize", page_size.as_str()),
                    ("fields", "files(id, name, modifiedTime, webViewLink)"),
                    ("orderBy", "modifiedTime desc"),
                ]),
        )
        .await?;

        let items = files
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .map(|file| pick(file, &["id", "name", "modifiedTime", "webViewLink"]))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Value::Array(items))
    }

    pub async fn info(
        self: Arc<Self>,
        ctx: CallContext,
        args: SpreadsheetArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "reading spreadsheet info");
        let token = self.credentials.token(&ctx).await?;
        let spreadsheet = send_json(
            SERVICE,
            self.request(
                Method::GET,
                &token,
                &format!("/spreadsheets/{}", segment(&args.spreadsheet_id)),
            ),
        )
        .await?;

        let sheets: Vec<Value> = sheet_properties(&spreadsheet)
            .map(|props| {
                fields(&[
                    ("id", props.get("sheetId")),
                    ("title", props.get("title")),
                    ("rowCount", props.pointer("/gridProperties/rowCount")),
                    ("columnCount", props.pointer("/gridProperties/columnCount")),
                    ("sheetType", props.get("sheetType")),
                ])
            })
            .collect();

        let mut info = fields(&[
            ("spreadsheetId", spreadsheet.get("spreadsheetId")),
            ("title", spreadsheet.pointer("/properties/title")),
            ("locale", spreadsheet.pointer("/properties/locale")),
            ("timeZone", spreadsheet.pointer("/properties/timeZone")),
        ]);
        info["sheets"] = Value::Array(sheets);
        if let Some(url) = spreadsheet.get("spreadsheetUrl") {
            info["spreadsheetUrl"] = url.clone();
        }
        Ok(info)
    }

    pub async fn read(self: Arc<Self>, ctx: CallContext, args: ReadArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "reading values");
        let token = self.credentials.token(&ctx).await?;
        let range = args.range.as_deref().unwrap_or(DEFAULT_RANGE);
        let result = send_json(
            SERVICE,
            self.request(
                Method::GET,
                &token,
                &Self::values_path(&args.spreadsheet_id, range),
            ),
        )
        .await?;

        let mut out = fields(&[("range", result.get("range"))]);
        out["values"] = result.get("values").cloned().unwrap_or_else(|| json!([]));
        out["majorDimension"] = result
            .get("majorDimension")
            .cloned()
            .unwrap_or_else(|| json!("ROWS"));
        Ok(out)
    }

    pub async fn modify(self: Arc<Self>, ctx: CallContext, args: ModifyArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, clear = args.clear_values, "modifying values");
        if !args.clear_values && args.values.is_none() {
            return Err(Error::MissingArgument("values".to_string()));
        }
        let token = self.credentials.token(&ctx).await?;
        let path = Self::values_path(&args.spreadsheet_id, &args.range);

        if args.clear_values {
            let result = send_json(
                SERVICE,
                self.request(Method::POST, &token, &format!("{path}:clear"))
                    .json(&json!({})),
            )
            .await?;
            let mut out = json!({ "operation": "clear" });
            if let Some(range) = result.get("clearedRange") {
                out["clearedRange"] = range.clone();
            }
            out["spreadsheetId"] = json!(args.spreadsheet_id);
            return Ok(out);
        }

        let result = send_json(
            SERVICE,
            self.request(Method::PUT, &token, &path)
                .query(&[("valueInputOption", args.value_input_option)])
                .json(&json!({ "values": args.values })),
        )
        .await?;
        let mut out = json!({ "operation": "update" });
        if let (Value::Object(out), Value::Object(counts)) = (
            &mut out,
            pick(
                &result,
                &["updatedRange", "updatedRows", "updatedColumns", "updatedCells"],
            ),
        ) {
            out.extend(counts);
        }
        out["spreadsheetId"] = json!(args.spreadsheet_id);
        Ok(out)
    }

    pub async fn create(self: Arc<Self>, ctx: CallContext, args: CreateArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, title = %args.title, "creating spreadsheet");
        let token = self.credentials.token(&ctx).await?;
        let sheets: Vec<Value> = args
            .sheet_names
            .iter()
            .map(|name| json!({ "properties": { "title": name } }))
            .collect();
        let spreadsheet = send_json(
            SERVICE,
            self.request(Method::POST, &token, "/spreadsheets")
                .json(&json!({ "properties": { "title": args.title }, "sheets": sheets })),
        )
        .await?;

        let sheets: Vec<Value> = sheet_properties(&spreadsheet)
            .map(|props| fields(&[("id", props.get("sheetId")), ("title", props.get("title"))]))
            .collect();
        let mut out = fields(&[
            ("spreadsheetId", spreadsheet.get("spreadsheetId")),
            ("title", spreadsheet.pointer("/properties/title")),
            ("spreadsheetUrl", spreadsheet.get("spreadsheetUrl")),
        ]);
        out["sheets"] = Value::Array(sheets);
        Ok(out)
    }

    pub async fn add_sheet(
        self: Arc<Self>,
        ctx: CallContext,
        args: AddSheetArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, sheet = %args.sheet_name, "adding sheet");
        let token = self.credentials.token(&ctx).await?;
        let response = send_json(
            SERVICE,
            self.request(
                Method::POST,
                &token,
                &format!("/spreadsheets/{}:batchUpdate", segment(&args.spreadsheet_id)),
            )
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": args.sheet_name } } }]
            })),
        )
        .await?;

        let Some(sheet) = response.pointer("/replies/0/addSheet/properties") else {
            return Err(Error::upstream(SERVICE, "Failed to add sheet"));
        };
        let mut out = json!({ "spreadsheetId": args.spreadsheet_id });
        if let (Value::Object(out), Value::Object(props)) = (
            &mut out,
            fields(&[
                ("sheetId", sheet.get("sheetId")),
                ("title", sheet.get("title")),
                ("rowCount", sheet.pointer("/gridProperties/rowCount")),
                ("columnCount", sheet.pointer("/gridProperties/columnCount")),
            ]),
        ) {
            out.extend(props);
        }
        Ok(out)
    }
}

/// `properties` of every sheet in a spreadsheet resource.
fn sheet_properties(spreadsheet: &Value) -> impl Iterator<Item = &Value> {
    spreadsheet
        .get("sheets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|sheet| sheet.get("properties"))
}

/// Object of the given fields, skipping absent ones.
fn fields(entries: &[(&str, Option<&Value>)]) -> Value {
    let mut out = Map::new();
    for (key, value) in entries {
        if let Some(value) = value {
            out.insert((*key).to_string(), (*value).clone());
        }
    }
    Value::Object(out)
}

fn schema(properties: Value, required: &[&str]) -> Value {
    let mut properties = properties;
    properties["user_google_email"] = json!({ "type": "string" });
    let mut all_required = vec!["user_google_email"];
    all_required.extend_from_slice(required);
    json!({ "type": "object", "properties": properties, "required": all_required })
}

/// Every Sheets tool, bound to `client`.
pub fn tools(client: &Arc<SheetsClient>) -> Vec<Tool> {
    vec![
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_list",
                "Lists spreadsheets from Google Drive that the user has access to",
                schema(
                    json!({ "max_results": { "type": "number", "default": DEFAULT_PAGE_SIZE } }),
                    &[],
                ),
            ),
            client,
            SheetsClient::list,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_get_info",
                "Gets information about a specific spreadsheet including its sheets",
                schema(
                    json!({ "spreadsheet_id": { "type": "string" } }),
                    &["spreadsheet_id"],
                ),
            ),
            client,
            SheetsClient::info,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_read",
                "Reads values from a specific range in a Google Sheet",
                schema(
                    json!({
                        "spreadsheet_id": { "type": "string" },
                        "range": { "type": "string", "default": DEFAULT_RANGE }
                    }),
                    &["spreadsheet_id"],
                ),
            ),
            client,
            SheetsClient::read,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_modify",
                "Modifies values in a specific range of a Google Sheet",
                schema(
                    json!({
                        "spreadsheet_id": { "type": "string" },
                        "range": { "type": "string" },
                        "values": { "type": "array", "items": { "type": "array" } },
                        "value_input_option": {
                            "type": "string",
                            "enum": ["RAW", "USER_ENTERED"],
                            "default": "USER_ENTERED"
                        },
                        "clear_values": { "type": "boolean", "default": false }
                    }),
                    &["spreadsheet_id", "range"],
                ),
            ),
            client,
            SheetsClient::modify,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_create",
                "Creates a new Google Spreadsheet",
                schema(
                    json!({
                        "title": { "type": "string" },
                        "sheet_names": { "type": "array", "items": { "type": "string" }, "default": [] }
                    }),
                    &["title"],
                ),
            ),
            client,
            SheetsClient::create,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_sheets_add_sheet",
                "Creates a new sheet within an existing spreadsheet",
                schema(
                    json!({
                        "spreadsheet_id": { "type": "string" },
                        "sheet_name": { "type": "string" }
                    }),
                    &["spreadsheet_id", "sheet_name"],
                ),
            ),
            client,
            SheetsClient::add_sheet,
        ),
    ]
}
