//! Request handlers for the `/api` routes

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pentkit_core::{
    Catalog, CatalogError, CatalogResult, CategoryUpdate, CommandUpdate, GenerateRequest,
    GeneratedCommand, NewCategory, NewCommand, OrderUpdate, Phase, ResolvedCategory,
    ResolvedCommand, SearchHit,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Runs a catalog call on the blocking pool
async fn run<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Catalog) -> CatalogResult<T> + Send + 'static,
    T: Send + 'static,
{
    let catalog = state.catalog.clone();
    tokio::task::spawn_blocking(move || f(&catalog))
        .await
        .map_err(|e| CatalogError::Internal(anyhow::anyhow!("catalog task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError(CatalogError::validation(format!("Invalid id '{}'", raw))))
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.catalog.backend().backend_type().to_string(),
    }))
}

// =========================================================================
// Categories
// =========================================================================

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<ResolvedCategory>>> {
    run(&state, |catalog| catalog.categories()).await.map(Json)
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResolvedCategory>> {
    let id = parse_id(&id)?;
    run(&state, move |catalog| catalog.category(&id)).await.map(Json)
}

pub async fn categories_by_type(
    State(state): State<AppState>,
    Path(category_type): Path<String>,
) -> ApiResult<Json<Vec<ResolvedCategory>>> {
    run(&state, move |catalog| catalog.categories_by_type(&category_type))
        .await
        .map(Json)
}

pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ResolvedCategory>)> {
    let Json(request) = payload?;
    let created = run(&state, move |catalog| catalog.create_category(request)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Json<ResolvedCategory>> {
    let id = parse_id(&id)?;
    let Json(update) = payload?;
    run(&state, move |catalog| catalog.update_category(&id, update))
        .await
        .map(Json)
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    run(&state, move |catalog| catalog.delete_category(&id)).await?;
    Ok(message("Category deleted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct CategoryOrderBody {
    #[serde(default)]
    categories: Vec<OrderUpdate>,
}

pub async fn reorder_categories(
    State(state): State<AppState>,
    payload: Result<Json<CategoryOrderBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    run(&state, move |catalog| catalog.reorder_categories(&body.categories)).await?;
    Ok(message("Categories reordered successfully"))
}

// =========================================================================
// Commands
// =========================================================================

pub async fn list_commands(State(state): State<AppState>) -> ApiResult<Json<Vec<ResolvedCommand>>> {
    run(&state, |catalog| catalog.commands()).await.map(Json)
}

pub async fn get_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResolvedCommand>> {
    let id = parse_id(&id)?;
    run(&state, move |catalog| catalog.command(&id)).await.map(Json)
}

pub async fn commands_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> ApiResult<Json<Vec<ResolvedCommand>>> {
    let category_id = parse_id(&category_id)?;
    run(&state, move |catalog| catalog.commands_by_category(&category_id))
        .await
        .map(Json)
}

pub async fn commands_by_phase(
    State(state): State<AppState>,
    Path(phase): Path<String>,
) -> ApiResult<Json<Vec<ResolvedCommand>>> {
    let phase: Phase = phase
        .parse()
        .map_err(|e: String| ApiError(CatalogError::validation(e)))?;
    run(&state, move |catalog| catalog.commands_by_phase(phase))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search_commands(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let Query(params) = params?;
    run(&state, move |catalog| catalog.search(&params.q)).await.map(Json)
}

pub async fn generate_commands(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<GeneratedCommand>>> {
    let Json(request) = payload?;
    run(&state, move |catalog| catalog.generate(&request)).await.map(Json)
}

pub async fn create_command(
    State(state): State<AppState>,
    payload: Result<Json<NewCommand>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ResolvedCommand>)> {
    let Json(request) = payload?;
    let created = run(&state, move |catalog| catalog.create_command(request)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CommandUpdate>, JsonRejection>,
) -> ApiResult<Json<ResolvedCommand>> {
    let id = parse_id(&id)?;
    let Json(update) = payload?;
    run(&state, move |catalog| catalog.update_command(&id, update))
        .await
        .map(Json)
}

pub async fn delete_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    run(&state, move |catalog| catalog.delete_command(&id)).await?;
    Ok(message("Command deleted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct CommandOrderBody {
    #[serde(default)]
    commands: Vec<OrderUpdate>,
}

pub async fn reorder_commands(
    State(state): State<AppState>,
    payload: Result<Json<CommandOrderBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    run(&state, move |catalog| catalog.reorder_commands(&body.commands)).await?;
    Ok(message("Commands reordered successfully"))
}
