use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::auth::{RequireRead, RequireWrite};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    DeleteAllResponse, DeleteFileQuery, FileListResponse, FileQuery, FileResponse,
    RenameFileRequest, WriteFileRequest,
};
use crate::server::response::ApiError;
use crate::store::ListOptions;
use crate::sync::events::Outbound;
use crate::validation::{validate_content, validate_path};

/// Single-file read or paginated listing, depending on the query shape.
pub async fn get_files(
    auth: RequireRead,
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let tenant_id = &auth.0.tenant_id;

    let single_read =
        query.path.is_some() && query.limit.is_none() && query.offset.is_none();
    if single_read {
        let path = query.path.as_deref().unwrap_or_default();
        let record = state
            .store
            .get_file(tenant_id, path)?
            .ok_or(Error::NotFound)?;
        return Ok(Json(FileResponse::with_content(&record)).into_response());
    }

    let options = list_options(&query)?;

    // Lazy tombstone cleanup; its completion is not awaited.
    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(e) = store.cleanup_expired() {
            tracing::warn!("tombstone cleanup failed: {e}");
        }
    });

    let page = state.store.list_files(tenant_id, &options)?;
    Ok(Json(FileListResponse {
        files: page.files,
        total: page.total,
        limit: options.limit,
        offset: options.offset,
    })
    .into_response())
}

fn list_options(query: &FileQuery) -> Result<ListOptions, ApiError> {
    let limit = query.limit.unwrap_or(ListOptions::DEFAULT_LIMIT);
    if !(1..=ListOptions::MAX_LIMIT).contains(&limit) {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {}",
            ListOptions::MAX_LIMIT
        ))
        .into());
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(Error::Validation("offset cannot be negative".to_string()).into());
    }

    let extensions = query.extension.as_deref().map(|raw| {
        raw.split(',')
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(ListOptions {
        path_prefix: query.path.clone(),
        path_contains: query.path_contains.clone(),
        extensions,
        content_contains: query.content_contains.clone(),
        is_binary: query.is_binary,
        include_deleted: query.include_deleted.unwrap_or(false),
        limit,
        offset,
    })
}

/// Strict create: 409 against an active record, resurrects a tombstone.
pub async fn create_file(
    auth: RequireWrite,
    State(state): State<Arc<AppState>>,
    Json(req): Json<WriteFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_path(&req.path)?;
    validate_content(&req.content)?;

    let record = state
        .store
        .create_strict(&auth.0.tenant_id, &req.path, &req.content)?;
    state.broadcast_all(&auth.0.tenant_id, &Outbound::created(&record));

    Ok((StatusCode::CREATED, Json(FileResponse::without_content(&record))))
}

pub async fn upsert_file(
    auth: RequireWrite,
    State(state): State<Arc<AppState>>,
    Json(req): Json<WriteFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_path(&req.path)?;
    validate_content(&req.content)?;

    let (record, created) = state
        .store
        .upsert_file(&auth.0.tenant_id, &req.path, &req.content)?;

    let event = if created {
        Outbound::created(&record)
    } else {
        Outbound::modified(&record)
    };
    state.broadcast_all(&auth.0.tenant_id, &event);

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(FileResponse::without_content(&record))))
}

pub async fn rename_file(
    auth: RequireWrite,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_path(&req.path)?;
    validate_path(&req.new_path)?;
    if req.path == req.new_path {
        return Err(Error::Validation("path and newPath must differ".to_string()).into());
    }

    let (record, created) = state
        .store
        .rename_file(&auth.0.tenant_id, &req.path, &req.new_path)?;

    let event = if created {
        Outbound::created(&record)
    } else {
        Outbound::renamed(&req.path, &record)
    };
    state.broadcast_all(&auth.0.tenant_id, &event);

    Ok(Json(FileResponse::without_content(&record)))
}

pub async fn delete_file(
    auth: RequireWrite,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteFileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query
        .path
        .ok_or_else(|| Error::Validation("path query parameter is required".to_string()))?;
    validate_path(&path)?;

    let deleted = state.store.soft_delete(&auth.0.tenant_id, &path)?;
    if deleted {
        state.broadcast_all(&auth.0.tenant_id, &Outbound::deleted(&path, Utc::now()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk soft-delete. No per-file broadcast; peers resync after the fact.
pub async fn delete_all(
    auth: RequireWrite,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.store.soft_delete_all(&auth.0.tenant_id)?;
    Ok(Json(DeleteAllResponse { deleted }))
}
