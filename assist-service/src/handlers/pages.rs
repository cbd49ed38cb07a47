use askama::Template;
use axum::response::IntoResponse;

#[derive(Template)]
#[template(path = "search_assistant.html")]
pub struct SearchAssistantTemplate {
    pub current_page: &'static str,
    pub upload_endpoint: &'static str,
}

#[derive(Template)]
#[template(path = "walking_assistant.html")]
pub struct WalkingAssistantTemplate {
    pub current_page: &'static str,
    pub upload_endpoint: &'static str,
}

pub async fn search_assistant() -> impl IntoResponse {
    SearchAssistantTemplate {
        current_page: "search",
        upload_endpoint: "/upload-image",
    }
}

pub async fn walking_assistant() -> impl IntoResponse {
    WalkingAssistantTemplate {
        current_page: "walking",
        upload_endpoint: "/upload-walking-image",
    }
}
