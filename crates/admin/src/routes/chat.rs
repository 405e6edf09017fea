//! Message board route handlers.
//!
//! Pick a volunteer on the left, read and extend their thread on the right.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use carelink_core::{Message, Volunteer, VolunteerId};

use super::{Layout, error_flash};
use crate::db::MessageRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAdminAuth, push_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Chat page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    /// Picker search over name and email.
    pub q: Option<String>,
    /// Selected volunteer.
    pub volunteer: Option<String>,
}

/// Send form data.
#[derive(Debug, Deserialize)]
pub struct SendForm {
    pub body: String,
}

/// Chat page template.
#[derive(Template, WebTemplate)]
#[template(path = "chat/index.html")]
pub struct ChatTemplate {
    pub layout: Layout,
    pub search: String,
    pub volunteers: Vec<Volunteer>,
    pub selected: Option<Volunteer>,
    pub thread: Vec<Message>,
}

/// Volunteer picker and the selected thread.
///
/// GET /chat
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ChatQuery>,
) -> Result<ChatTemplate, AppError> {
    let search = query.q.unwrap_or_default().trim().to_string();
    let volunteers: Vec<Volunteer> = state
        .volunteers()
        .all()
        .into_iter()
        .filter(|v| v.matches_search(&search))
        .collect();

    let selected = query
        .volunteer
        .filter(|id| !id.is_empty())
        .map(VolunteerId::new)
        .and_then(|id| state.volunteers().get(&id));

    let thread = match &selected {
        Some(volunteer) => {
            MessageRepository::new(state.store())
                .thread(&volunteer.id)
                .await?
        }
        None => Vec::new(),
    };

    Ok(ChatTemplate {
        layout: Layout::new(admin, "/chat", &session, &state).await,
        search,
        volunteers,
        selected,
        thread,
    })
}

/// Post a message to a volunteer's thread, signed with the admin's name.
///
/// POST /chat/{volunteer_id}/messages
#[instrument(skip(admin, state, session, form))]
pub async fn send(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(volunteer_id): Path<String>,
    Form(form): Form<SendForm>,
) -> Response {
    let volunteer_id = VolunteerId::new(volunteer_id);
    let body = form.body.trim();

    let flash = if body.is_empty() {
        Some(Flash::error("Message cannot be empty"))
    } else if state.volunteers().get(&volunteer_id).is_none() {
        Some(Flash::error("That volunteer no longer exists"))
    } else {
        match MessageRepository::new(state.store())
            .send(&volunteer_id, &admin.name, body, Utc::now())
            .await
        {
            Ok(message_id) => {
                tracing::info!(%message_id, "Message sent");
                None
            }
            Err(e) => Some(error_flash(e)),
        }
    };

    if let Some(flash) = flash {
        push_flash(&session, flash).await;
    }
    Redirect::to(&thread_path(&volunteer_id)).into_response()
}

/// Chat page with `volunteer_id` selected, query-encoded.
fn thread_path(volunteer_id: &VolunteerId) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("volunteer", volunteer_id.as_str())
        .finish();
    format!("/chat?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_path_encodes_the_id() {
        assert_eq!(thread_path(&VolunteerId::new("v-1")), "/chat?volunteer=v-1");
        assert_eq!(
            thread_path(&VolunteerId::new("x\ny&z")),
            "/chat?volunteer=x%0Ay%26z"
        );
    }
}
