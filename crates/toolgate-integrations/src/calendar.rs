//! Google Calendar v3 tools.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use toolgate_core::config::GoogleConfig;
use toolgate_core::{CallContext, Error, IntegrationKind, Tool, ToolDescriptor};

use crate::auth::{Credentials, OutboundTokens};
use crate::http::{pick, segment, send_json};

const SERVICE: &str = "Google Calendar";
const DEFAULT_CALENDAR: &str = "primary";
const DEFAULT_MAX_RESULTS: u32 = 25;

const SUMMARY_FIELDS: &[&str] = &["id", "summary", "start", "end", "htmlLink"];
const LIST_FIELDS: &[&str] = &["id", "summary", "start", "end", "location", "htmlLink"];
const DETAIL_FIELDS: &[&str] = &["description", "attendees", "creator", "organizer", "status"];
const WRITE_FIELDS: &[&str] = &["id", "summary", "start", "end", "htmlLink", "hangoutLink"];

pub struct CalendarClient {
    http: Client,
    api_base: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
pub struct ListCalendarsArgs {
    pub user_google_email: String,
}

#[derive(Debug, Deserialize)]
pub struct GetEventsArgs {
    pub user_google_email: String,
    pub calendar_id: Option<String>,
    pub event_id: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
    pub query: Option<String>,
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventArgs {
    pub user_google_email: String,
    pub calendar_id: Option<String>,
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub add_google_meet: bool,
    pub reminders: Option<Value>,
    #[serde(default = "default_true")]
    pub use_default_reminders: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModifyEventArgs {
    pub user_google_email: String,
    pub calendar_id: Option<String>,
    pub event_id: String,
    pub summary: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
    pub timezone: Option<String>,
    pub add_google_meet: Option<bool>,
    pub reminders: Option<Value>,
    pub use_default_reminders: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEventArgs {
    pub user_google_email: String,
    pub calendar_id: Option<String>,
    pub event_id: String,
}

fn default_true() -> bool {
    true
}

impl CalendarClient {
    pub fn new(http: Client, config: &GoogleConfig, outbound: Option<Arc<OutboundTokens>>) -> Self {
        Self {
            http,
            api_base: config.calendar_api_base.trim_end_matches('/').to_string(),
            credentials: Credentials::new(
                IntegrationKind::Calendar,
                "GOOGLE_OAUTH_ACCESS_TOKEN",
                config.access_token.clone(),
                outbound,
            ),
        }
    }

    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(token)
    }

    fn events_path(calendar_id: Option<&str>) -> String {
        format!(
            "/calendars/{}/events",
            segment(calendar_id.unwrap_or(DEFAULT_CALENDAR))
        )
    }

    pub async fn list_calendars(
        self: Arc<Self>,
        ctx: CallContext,
        args: ListCalendarsArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "listing calendars");
        let token = self.credentials.token(&ctx).await?;
        let list = send_json(
            SERVICE,
            self.request(Method::GET, &token, "/users/me/calendarList"),
        )
        .await?;
        Ok(trim_items(&list, &["id", "summary", "primary", "timeZone"], &[]))
    }

    pub async fn events(self: Arc<Self>, ctx: CallContext, args: GetEventsArgs) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "reading events");
        let token = self.credentials.token(&ctx).await?;
        let base = Self::events_path(args.calendar_id.as_deref());

        if let Some(event_id) = &args.event_id {
            let event = send_json(
                SERVICE,
                self.request(Method::GET, &token, &format!("{base}/{}", segment(event_id))),
            )
            .await?;
            return Ok(if args.detailed {
                event
            } else {
                pick(&event, SUMMARY_FIELDS)
            });
        }

        let mut query = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            (
                "maxResults",
                args.max_results.unwrap_or(DEFAULT_MAX_RESULTS).to_string(),
            ),
        ];
        if let Some(time_min) = args.time_min {
            query.push(("timeMin", time_min));
        }
        if let Some(time_max) = args.time_max {
            query.push(("timeMax", time_max));
        }
        if let Some(q) = args.query {
            query.push(("q", q));
        }

        let list = send_json(
            SERVICE,
            self.request(Method::GET, &token, &base).query(&query),
        )
        .await?;
        let extra = if args.detailed { DETAIL_FIELDS } else { &[] };
        Ok(trim_items(&list, LIST_FIELDS, extra))
    }

    pub async fn create_event(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreateEventArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, "creating event");
        let token = self.credentials.token(&ctx).await?;
        let event = new_event(&args, &meet_request_id());
        let created = send_json(
            SERVICE,
            self.request(Method::POST, &token, &Self::events_path(args.calendar_id.as_deref()))
                .query(&[("conferenceDataVersion", conference_version(&event))])
                .json(&event),
        )
        .await?;
        Ok(pick(&created, WRITE_FIELDS))
    }

    pub async fn modify_event(
        self: Arc<Self>,
        ctx: CallContext,
        args: ModifyEventArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, event = %args.event_id, "modifying event");
        let token = self.credentials.token(&ctx).await?;
        let patch = event_patch(&args, &meet_request_id());
        let path = format!(
            "{}/{}",
            Self::events_path(args.calendar_id.as_deref()),
            segment(&args.event_id)
        );
        let updated = send_json(
            SERVICE,
            self.request(Method::PATCH, &token, &path)
                .query(&[("conferenceDataVersion", conference_version(&patch))])
                .json(&patch),
        )
        .await?;
        Ok(pick(&updated, WRITE_FIELDS))
    }

    pub async fn delete_event(
        self: Arc<Self>,
        ctx: CallContext,
        args: DeleteEventArgs,
    ) -> Result<Value, Error> {
        tracing::debug!(user = %args.user_google_email, event = %args.event_id, "deleting event");
        let token = self.credentials.token(&ctx).await?;
        let path = format!(
            "{}/{}",
            Self::events_path(args.calendar_id.as_deref()),
            segment(&args.event_id)
        );
        send_json(SERVICE, self.request(Method::DELETE, &token, &path)).await?;
        Ok(json!({ "success": true, "message": "Event deleted successfully" }))
    }
}

fn meet_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn conference_version(event: &Value) -> &'static str {
    match event.get("conferenceData") {
        Some(Value::Object(_)) => "1",
        _ => "0",
    }
}

fn meet_conference(request_id: &str) -> Value {
    json!({
        "createRequest": {
            "requestId": request_id,
            "conferenceSolutionKey": { "type": "hangoutsMeet" }
        }
    })
}

fn event_time(date_time: &str, timezone: Option<&str>) -> Value {
    let mut time = json!({ "dateTime": date_time });
    if let Some(tz) = timezone {
        time["timeZone"] = json!(tz);
    }
    time
}

fn attendee_list(emails: &[String]) -> Value {
    emails.iter().map(|email| json!({ "email": email })).collect()
}

fn reminder_block(use_default: bool, overrides: Option<&Value>) -> Value {
    let mut block = json!({ "useDefault": use_default });
    if let Some(overrides) = overrides {
        block["overrides"] = overrides.clone();
    }
    block
}

/// Request body for a new event.
pub(crate) fn new_event(args: &CreateEventArgs, request_id: &str) -> Value {
    let timezone = args.timezone.as_deref();
    let mut event = Map::new();
    event.insert("summary".into(), json!(args.summary));
    event.insert("start".into(), event_time(&args.start_time, timezone));
    event.insert("end".into(), event_time(&args.end_time, timezone));

    if let Some(description) = args.description.as_deref().filter(|s| !s.is_empty()) {
        event.insert("description".into(), json!(description));
    }
    if let Some(location) = args.location.as_deref().filter(|s| !s.is_empty()) {
        event.insert("location".into(), json!(location));
    }
    if let Some(attendees) = args.attendees.as_deref().filter(|a| !a.is_empty()) {
        event.insert("attendees".into(), attendee_list(attendees));
    }
    if args.add_google_meet {
        event.insert("conferenceData".into(), meet_conference(request_id));
    }
    if args.reminders.is_some() || !args.use_default_reminders {
        event.insert(
            "reminders".into(),
            reminder_block(args.use_default_reminders, args.reminders.as_ref()),
        );
    }
    Value::Object(event)
}

/// Partial body carrying only the fields the caller supplied.
pub(crate) fn event_patch(args: &ModifyEventArgs, request_id: &str) -> Value {
    let timezone = args.timezone.as_deref();
    let mut patch = Map::new();

    if let Some(summary) = &args.summary {
        patch.insert("summary".into(), json!(summary));
    }
    if let Some(start) = args.start_time.as_deref().filter(|s| !s.is_empty()) {
        patch.insert("start".into(), event_time(start, timezone));
    }
    if let Some(end) = args.end_time.as_deref().filter(|s| !s.is_empty()) {
        patch.insert("end".into(), event_time(end, timezone));
    }
    if let Some(description) = &args.description {
        patch.insert("description".into(), json!(description));
    }
    if let Some(location) = &args.location {
        patch.insert("location".into(), json!(location));
    }
    if let Some(attendees) = &args.attendees {
        patch.insert("attendees".into(), attendee_list(attendees));
    }
    match args.add_google_meet {
        Some(true) => {
            patch.insert("conferenceData".into(), meet_conference(request_id));
        }
        Some(false) => {
            patch.insert("conferenceData".into(), Value::Null);
        }
        None => {}
    }
    if args.reminders.is_some() || args.use_default_reminders.is_some() {
        patch.insert(
            "reminders".into(),
            reminder_block(
                args.use_default_reminders.unwrap_or(true),
                args.reminders.as_ref(),
            ),
        );
    }
    Value::Object(patch)
}

/// Trim each entry of a list response's `items`.
fn trim_items(list: &Value, fields: &[&str], extra: &[&str]) -> Value {
    let items = list
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    items
        .iter()
        .map(|item| {
            let mut trimmed = pick(item, fields);
            if let (Value::Object(out), Value::Object(more)) = (&mut trimmed, pick(item, extra)) {
                out.extend(more);
            }
            trimmed
        })
        .collect()
}

fn with_common(mut properties: Value, required: &[&str]) -> Value {
    properties["user_google_email"] = json!({
        "type": "string",
        "description": "The user's Google email address"
    });
    properties["calendar_id"] = json!({ "type": "string", "default": DEFAULT_CALENDAR });
    let mut all_required = vec!["user_google_email"];
    all_required.extend_from_slice(required);
    json!({ "type": "object", "properties": properties, "required": all_required })
}

/// Every calendar tool, bound to `client`.
pub fn tools(client: &Arc<CalendarClient>) -> Vec<Tool> {
    let event_fields = json!({
        "summary": { "type": "string" },
        "start_time": { "type": "string", "description": "RFC 3339 timestamp" },
        "end_time": { "type": "string", "description": "RFC 3339 timestamp" },
        "description": { "type": "string" },
        "location": { "type": "string" },
        "attendees": { "type": "array", "items": { "type": "string" } },
        "timezone": { "type": "string" },
        "reminders": { "type": "array" }
    });

    let mut create_fields = event_fields.clone();
    create_fields["add_google_meet"] = json!({ "type": "boolean", "default": false });
    create_fields["use_default_reminders"] = json!({ "type": "boolean", "default": true });

    let mut modify_fields = event_fields;
    modify_fields["event_id"] = json!({ "type": "string" });
    modify_fields["add_google_meet"] = json!({ "type": "boolean" });
    modify_fields["use_default_reminders"] = json!({ "type": "boolean" });

    vec![
        Tool::typed(
            ToolDescriptor::new(
                "google_calendar_list_calendars",
                "List all calendars accessible to the authenticated user",
                with_common(json!({}), &[]),
            ),
            client,
            CalendarClient::list_calendars,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_calendar_get_events",
                "Get events from a specified calendar",
                with_common(
                    json!({
                        "event_id": { "type": "string" },
                        "time_min": { "type": "string" },
                        "time_max": { "type": "string" },
                        "max_results": { "type": "number", "default": DEFAULT_MAX_RESULTS },
                        "query": { "type": "string" },
                        "detailed": { "type": "boolean", "default": false }
                    }),
                    &[],
                ),
            ),
            client,
            CalendarClient::events,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_calendar_create_event",
                "Create a new calendar event",
                with_common(create_fields, &["summary", "start_time", "end_time"]),
            ),
            client,
            CalendarClient::create_event,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_calendar_modify_event",
                "Modify an existing calendar event",
                with_common(modify_fields, &["event_id"]),
            ),
            client,
            CalendarClient::modify_event,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "google_calendar_delete_event",
                "Delete a calendar event",
                with_common(json!({ "event_id": { "type": "string" } }), &["event_id"]),
            ),
            client,
            CalendarClient::delete_event,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use toolgate_mcp::ToolRegistry;

    use super::*;

    fn registry(server: &MockServer) -> ToolRegistry {
        let config = GoogleConfig {
            access_token: Some("ya29.test".to_string()),
            calendar_api_base: server.base_url(),
            ..GoogleConfig::default()
        };
        let client = Arc::new(CalendarClient::new(Client::new(), &config, None));
        ToolRegistry::new(tools(&client)).unwrap()
    }

    fn create_args(value: Value) -> CreateEventArgs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn minimal_event_has_no_optional_blocks() {
        let args = create_args(json!({
            "user_google_email": "a@example.com",
            "summary": "Standup",
            "start_time": "2026-01-05T09:00:00Z",
            "end_time": "2026-01-05T09:15:00Z"
        }));
        assert_eq!(
            new_event(&args, "req"),
            json!({
                "summary": "Standup",
                "start": {"dateTime": "2026-01-05T09:00:00Z"},
                "end": {"dateTime": "2026-01-05T09:15:00Z"}
            })
        );
    }

    #[test]
    fn full_event_carries_meet_attendees_and_reminders() {
        let args = create_args(json!({
            "user_google_email": "a@example.com",
            "summary": "Review",
            "start_time": "2026-01-05T09:00:00",
            "end_time": "2026-01-05T10:00:00",
            "timezone": "Europe/Paris",
            "attendees": ["b@example.com"],
            "add_google_meet": true,
            "use_default_reminders": false,
            "reminders": [{"method": "popup", "minutes": 10}]
        }));
        let event = new_event(&args, "req-1");
        assert_eq!(event["start"]["timeZone"], "Europe/Paris");
        assert_eq!(event["end"]["timeZone"], "Europe/Paris");
        assert_eq!(event["attendees"], json!([{"email": "b@example.com"}]));
        assert_eq!(event["conferenceData"]["createRequest"]["requestId"], "req-1");
        assert_eq!(
            event["reminders"],
            json!({"useDefault": false, "overrides": [{"method": "popup", "minutes": 10}]})
        );
        assert_eq!(conference_version(&event), "1");
    }

    #[test]
    fn patch_only_contains_supplied_fields() {
        let args: ModifyEventArgs = serde_json::from_value(json!({
            "user_google_email": "a@example.com",
            "event_id": "e1",
            "location": "Room 4",
            "add_google_meet": false
        }))
        .unwrap();
        let patch = event_patch(&args, "unused");
        assert_eq!(patch, json!({"location": "Room 4", "conferenceData": null}));
        assert_eq!(conference_version(&patch), "0");
    }

    #[tokio::test]
    async fn event_list_is_trimmed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/calendars/primary/events")
                    .query_param("singleEvents", "true")
                    .query_param("orderBy", "startTime")
                    .query_param("maxResults", "25")
                    .query_param("timeMin", "2026-01-01T00:00:00Z")
                    .header("authorization", "Bearer ya29.test");
                then.status(200).json_body(json!({
                    "items": [{
                        "id": "e1",
                        "summary": "Standup",
                        "start": {"dateTime": "x"},
                        "end": {"dateTime": "y"},
                        "htmlLink": "https://calendar/e1",
                        "description": "daily",
                        "etag": "\"123\""
                    }]
                }));
            })
            .await;

        let out = registry(&server)
            .call(
                "google_calendar_get_events",
                json!({"user_google_email": "a@example.com", "time_min": "2026-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(
            out,
            json!([{
                "id": "e1",
                "summary": "Standup",
                "start": {"dateTime": "x"},
                "end": {"dateTime": "y"},
                "htmlLink": "https://calendar/e1"
            }])
        );
    }

    #[tokio::test]
    async fn detailed_single_event_is_verbatim() {
        let server = MockServer::start_async().await;
        let event = json!({"id": "e1", "summary": "x", "etag": "\"9\"", "status": "confirmed"});
        server
            .mock_async(|when, then| {
                when.method(GET).path("/calendars/team/events/e1");
                then.status(200).json_body(event.clone());
            })
            .await;

        let out = registry(&server)
            .call(
                "google_calendar_get_events",
                json!({
                    "user_google_email": "a@example.com",
                    "calendar_id": "team",
                    "event_id": "e1",
                    "detailed": true
                }),
            )
            .await
            .unwrap();
        assert_eq!(out, event);
    }

    #[tokio::test]
    async fn list_calendars_keeps_documented_fields() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/users/me/calendarList");
                then.status(200).json_body(json!({
                    "items": [{"id": "primary", "summary": "Me", "primary": true, "timeZone": "UTC", "accessRole": "owner"}]
                }));
            })
            .await;

        let out = registry(&server)
            .call(
                "google_calendar_list_calendars",
                json!({"user_google_email": "a@example.com"}),
            )
            .await
            .unwrap();
        assert_eq!(
            out,
            json!([{"id": "primary", "summary": "Me", "primary": true, "timeZone": "UTC"}])
        );
    }

    #[tokio::test]
    async fn modify_uses_patch_and_trims_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/calendars/primary/events/e1")
                    .query_param("conferenceDataVersion", "0")
                    .json_body(json!({"summary": "Renamed"}));
                then.status(200).json_body(json!({
                    "id": "e1", "summary": "Renamed", "htmlLink": "l", "etag": "e"
                }));
            })
            .await;

        let out = registry(&server)
            .call(
                "google_calendar_modify_event",
                json!({"user_google_email": "a@example.com", "event_id": "e1", "summary": "Renamed"}),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out, json!({"id": "e1", "summary": "Renamed", "htmlLink": "l"}));
    }

    #[tokio::test]
    async fn delete_reports_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/calendars/primary/events/e1");
                then.status(204);
            })
            .await;

        let out = registry(&server)
            .call(
                "google_calendar_delete_event",
                json!({"user_google_email": "a@example.com", "event_id": "e1"}),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out, json!({"success": true, "message": "Event deleted successfully"}));
    }

    #[tokio::test]
    async fn google_errors_are_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/calendars/primary/events/gone");
                then.status(410)
                    .json_body(json!({"error": {"code": 410, "message": "Resource has been deleted"}}));
            })
            .await;

        let err = registry(&server)
            .call(
                "google_calendar_delete_event",
                json!({"user_google_email": "a@example.com", "event_id": "gone"}),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Google Calendar API error: 410 Gone: Resource has been deleted"
        );
    }
}
