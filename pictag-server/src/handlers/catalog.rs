use axum::{
    Form, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pictag_core::{
    CatalogEntry, EntryId, EntrySummary, UploadRequest, UploadedFile,
};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Entries per presentation row.
pub const ROW_WIDTH: usize = 3;

pub const ADDED_MESSAGE: &str = "Image successfully added to collection";
pub const DELETED_MESSAGE: &str = "Image successfully deleted from collection";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub rows: Vec<Vec<EntrySummary>>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub duplicate: bool,
    pub labels: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Split `items` into rows of at most `width`, preserving order.
pub fn group_rows<T: Clone>(items: &[T], width: usize) -> Vec<Vec<T>> {
    items.chunks(width.max(1)).map(<[T]>::to_vec).collect()
}

async fn catalog_page(state: &AppState, search: Option<String>) -> AppResult<CatalogPage> {
    let term = search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let entries = state.catalog.list(term.as_deref()).await?;

    Ok(CatalogPage {
        message: term.map(|t| format!("Search result(s) for {t}")),
        rows: group_rows(&entries, ROW_WIDTH),
        total: entries.len(),
    })
}

/// GET /api/v1/images?search=term
pub async fn list_images_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<CatalogPage>> {
    Ok(Json(catalog_page(&state, params.search).await?))
}

/// POST /api/v1/images/search (form field `search`)
pub async fn search_images_handler(
    State(state): State<AppState>,
    Form(params): Form<SearchParams>,
) -> AppResult<Json<CatalogPage>> {
    Ok(Json(catalog_page(&state, params.search).await?))
}

/// POST /api/v1/images (multipart: `name`, `image_url`, `image_upload`)
pub async fn upload_image_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let request = read_upload_form(multipart).await?;
    let receipt = state.catalog.upload(request).await?;

    let id = receipt.outcome.inserted_id();
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: ADDED_MESSAGE,
            image_path: receipt.location,
            id,
            duplicate: id.is_none(),
            labels: receipt.labels,
        }),
    ))
}

/// GET /api/v1/images/{id}
pub async fn get_image_handler(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<Json<CatalogEntry>> {
    Ok(Json(state.catalog.detail(id).await?))
}

/// DELETE /api/v1/images/{id}
pub async fn delete_image_handler(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<Json<MessageResponse>> {
    state.catalog.delete(id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE,
    }))
}

/// POST /api/v1/images/delete (form field `id`)
pub async fn delete_image_form_handler(
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> AppResult<Json<MessageResponse>> {
    let id: EntryId = form
        .id
        .parse()
        .map_err(|_| AppError::bad_request("Invalid image id"))?;
    state.catalog.delete(id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE,
    }))
}

/// Collect the upload form. Unknown fields are ignored; a file part with
/// neither a filename nor content counts as "no file chosen".
async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadRequest> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => request.name = field.text().await?,
            "image_url" => request.image_url = Some(field.text().await?),
            "image_upload" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                request.upload = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            other => debug!(field = other, "ignoring unknown upload field"),
        }
    }

    Ok(request)
}
