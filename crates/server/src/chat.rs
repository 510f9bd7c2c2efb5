//! Customer-facing chat routes.
//!
//! - `GET  /`        chat widget page (HTML)
//! - `POST /chat`    one chat exchange, JSON in and out
//! - `GET  /order`   redirect to a WhatsApp link carrying the order summary
//!
//! The page only talks to the backend through the `/chat` JSON contract.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shopchat_agent::ChatRuntime;
use shopchat_core::{whatsapp_order_link, ApplicationError, ChatTurn, InterfaceError};
use tera::{Context, Tera};
use tracing::{info, warn};
use uuid::Uuid;

const CHAT_TEMPLATE: &str = "chat.html";

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<ChatRuntime>,
    templates: Arc<Tera>,
    whatsapp_number: Option<String>,
    request_timeout: Duration,
}

impl ChatState {
    pub fn new(
        runtime: Arc<ChatRuntime>,
        whatsapp_number: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self { runtime, templates: init_templates(), whatsapp_number, request_timeout }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub is_order: bool,
    pub order_summary: String,
}

impl From<ChatTurn> for ChatResponse {
    fn from(turn: ChatTurn) -> Self {
        Self { reply: turn.reply, is_order: turn.is_order, order_summary: turn.order_summary }
    }
}

impl From<&InterfaceError> for ChatResponse {
    fn from(error: &InterfaceError) -> Self {
        Self { reply: error.user_message().to_string(), is_order: false, order_summary: String::new() }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub text: Option<String>,
}

fn init_templates() -> Arc<Tera> {
    let mut tera = Tera::default();
    if let Err(error) = tera.add_raw_template(CHAT_TEMPLATE, include_str!("../templates/chat.html")) {
        warn!(
            event_name = "system.templates.invalid",
            error = %error,
            "chat page template failed to compile; GET / will return an error page"
        );
    }
    Arc::new(tera)
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/chat", post(chat))
        .route("/order", get(order_redirect))
        .with_state(state)
}

async fn chat_page(
    State(state): State<ChatState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = Context::new();
    context.insert("shop_name", state.runtime.prompt().shop_name());

    let html = state.templates.render(CHAT_TEMPLATE, &context).map_err(|error| {
        warn!(event_name = "chat.page.render_failed", error = %error, "chat page failed to render");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Chat is temporarily unavailable</h1>".to_string()),
        )
    })?;

    Ok(Html(html))
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let correlation_id = Uuid::new_v4().to_string();

    let message = match payload {
        Ok(Json(request)) => request.message,
        Err(rejection) => {
            let detail = rejection.body_text();
            return failure(ApplicationError::InvalidRequest(detail).into_interface(correlation_id));
        }
    };

    let outcome = tokio::time::timeout(
        state.request_timeout,
        state.runtime.handle_message(&message, &correlation_id),
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(_elapsed) => {
            Err(ApplicationError::Timeout { after_secs: state.request_timeout.as_secs() })
        }
    };

    match result {
        Ok(turn) => {
            info!(
                event_name = "chat.request.completed",
                correlation_id = %correlation_id,
                is_order = turn.is_order,
                "chat request completed"
            );
            (StatusCode::OK, Json(ChatResponse::from(turn)))
        }
        Err(error) => failure(error.into_interface(correlation_id)),
    }
}

fn failure(error: InterfaceError) -> (StatusCode, Json<ChatResponse>) {
    warn!(
        event_name = "chat.request.failed",
        correlation_id = %error.correlation_id(),
        status = error.status_code(),
        error = %error,
        "chat request failed"
    );
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ChatResponse::from(&error)))
}

async fn order_redirect(
    State(state): State<ChatState>,
    Query(query): Query<OrderQuery>,
) -> Redirect {
    let summary = query.text.unwrap_or_default();
    Redirect::to(&whatsapp_order_link(state.whatsapp_number.as_deref(), summary.trim()))
}
