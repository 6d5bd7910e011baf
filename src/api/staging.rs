//! Staging endpoints
//!
//! Form targets for the upload tab. All routes require a signed-in user
//! and redirect back to the page when done.

use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    middleware,
    response::Redirect,
    routing::post,
};
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;
use ulid::Ulid;

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};
use crate::error::AppError;
use crate::staging::is_accepted_file_name;

/// Create staging router
///
/// Routes:
/// - POST /files - Stage selected files (multipart)
/// - POST /files/:id/remove - Unstage a file
/// - POST /links - Stage a link
/// - POST /links/:id/remove - Unstage a link
pub fn staging_router(state: AppState) -> Router<AppState> {
    let max_upload_bytes = state.config.staging.max_upload_bytes;

    let uploads = Router::new()
        .route("/files", post(add_files))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .merge(uploads)
        .route("/files/:id/remove", post(remove_file))
        .route("/links", post(add_link))
        .route("/links/:id/remove", post(remove_link))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// POST /files
///
/// Records the name and size of every file part; the bytes are discarded.
/// The whole selection is rejected if any file has an unaccepted extension.
async fn add_files(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut selected = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        // Browsers send an empty, nameless part when nothing was picked
        if name.is_empty() {
            continue;
        }
        if !is_accepted_file_name(&name) {
            return Err(AppError::Validation(format!(
                "Unsupported file type: {name}"
            )));
        }

        let mut size_bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size_bytes += chunk.len() as u64;
        }
        selected.push((name, size_bytes));
    }

    if !selected.is_empty() {
        let added = state.staging.add_files(selected).await;
        tracing::info!(user_id = %user.id, count = added.len(), "Files staged");
    }

    Ok(Redirect::to("/"))
}

/// POST /files/:id/remove
async fn remove_file(
    State(state): State<AppState>,
    Path(id): Path<Ulid>,
) -> Redirect {
    if state.staging.remove_file(id).await.is_some() {
        tracing::debug!(%id, "File unstaged");
    }
    Redirect::to("/")
}

/// Link form body
#[derive(Debug, Deserialize)]
struct LinkForm {
    url: String,
}

/// POST /links
async fn add_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<LinkForm>,
) -> Result<Redirect, AppError> {
    let link = state.staging.add_link(&form.url).await?;
    tracing::info!(user_id = %user.id, url = %link.url, "Link staged");
    Ok(Redirect::to("/"))
}

/// POST /links/:id/remove
async fn remove_link(
    State(state): State<AppState>,
    Path(id): Path<Ulid>,
) -> Redirect {
    if state.staging.remove_link(id).await.is_some() {
        tracing::debug!(%id, "Link unstaged");
    }
    Redirect::to("/")
}
