//! Handlers for the `/render` resource.
//!
//! Every endpoint acts for the [`UserIdentity`] forwarded by the session
//! proxy. A user has at most one render in flight.

use std::fmt::Write as _;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::{Form, Json};
use serde::Serialize;
use trackreel_core::activity::ActivitySummary;
use trackreel_core::options::escape_html;
use trackreel_core::registry::OptionRegistry;
use trackreel_core::types::group_form_pairs;
use trackreel_worker::{JobStatus, Submission};

use crate::error::{AppError, AppResult};
use crate::extract::UserIdentity;
use crate::response::DataResponse;
use crate::state::AppState;

/// Form field carrying the id of the activity to render.
pub const ACTIVITY_FIELD: &str = "truck";

/// Path the render form posts to.
pub const SUBMIT_PATH: &str = "/api/v1/render";

#[derive(Debug, Serialize)]
pub struct Started {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: JobStatus,
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// GET /api/v1/render/form
///
/// The option form, or a notice while a render is still running.
pub async fn render_form(
    user: UserIdentity,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    let coordinator = &state.coordinator;
    if coordinator.status(user.user_id).await? == JobStatus::Running {
        return Ok(Html(
            "<p>A video is already being generated. Come back later.</p>".to_string(),
        ));
    }

    let activities = coordinator.source().list_activities(user.user_id).await?;
    Ok(Html(form_page(coordinator.registry(), &activities)))
}

/// Build the HTML form for `activities` and every registered option.
pub fn form_page(registry: &OptionRegistry, activities: &[ActivitySummary]) -> String {
    let mut page = String::from("<p>Fields marked with * are required.</p>\n");
    let _ = writeln!(page, r#"<form action="{SUBMIT_PATH}" method="post">"#);
    page.push_str("Track to render<br>\n");
    let _ = writeln!(page, r#"<select name="{ACTIVITY_FIELD}">"#);
    for activity in activities {
        let _ = writeln!(
            page,
            r#"<option value="{}">{} {}</option>"#,
            activity.id,
            escape_html(&activity.name),
            activity.start_date_local.format("%Y-%m-%d %H:%M"),
        );
    }
    page.push_str("</select><br><br>\n");

    for (key, option) in registry.iter() {
        if option.is_required() {
            page.push('*');
        }
        // Labels and descriptions are trusted markup.
        let _ = writeln!(page, "{}<br>", option.short_label());
        let _ = writeln!(page, "{}<br>", option.long_description());
        let _ = writeln!(page, "{}<br><br>", option.render_input(key));
    }

    page.push_str(
        r#"<input type="submit" value="Submit"> <input type="reset" value="Reset"></form>"#,
    );
    page
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/render
///
/// Validate the submitted options, prepare the job artifacts and start the
/// renderer in the background. Returns 202 once the renderer is launched;
/// the outcome is reported through [`render_status`].
pub async fn submit_render(
    user: UserIdentity,
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<impl IntoResponse> {
    let mut values = group_form_pairs(pairs);

    let activity_id = values
        .remove(ACTIVITY_FIELD)
        .and_then(|v| v.into_iter().next())
        .ok_or_else(|| AppError::BadRequest("No track selected".into()))?;
    let activity_id: i64 = activity_id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid track id: {activity_id}")))?;

    // The job reports through the filesystem and the event channel.
    let _handle = state
        .coordinator
        .submit(Submission {
            user_id: user.user_id,
            activity_id,
            values,
        })
        .await?;

    tracing::info!(user_id = user.user_id, activity_id, "Render started");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: Started { status: "started" },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/render/status
pub async fn render_status(
    user: UserIdentity,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<StatusBody>>> {
    let status = state.coordinator.status(user.user_id).await?;
    Ok(Json(DataResponse {
        data: StatusBody { status },
    }))
}
