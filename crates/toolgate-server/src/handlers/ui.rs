use axum::response::Html;

const CHAT_PAGE: &str = include_str!("../../static/index.html");

/// Serve the chat page.
pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}
