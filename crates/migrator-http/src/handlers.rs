//! HTTP handlers for the v1 (legacy) and v2 (current) APIs.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use migrator_core::{Action, AppliedMigration, MigrationResults, MigratorError, Version};
use migrator_db::HealthStatus;

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Apply mode of the legacy v1 API, folding dry-run into the mode value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationsModeType {
    Apply,
    Sync,
    DryRun,
}

impl MigrationsModeType {
    pub fn to_action(self) -> (Action, bool) {
        match self {
            MigrationsModeType::Apply => (Action::Apply, false),
            MigrationsModeType::Sync => (Action::Sync, false),
            MigrationsModeType::DryRun => (Action::Apply, true),
        }
    }
}

/// Verbosity of the legacy v1 apply response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationsResponseType {
    Summary,
    List,
    Full,
}

#[derive(Debug, Deserialize)]
pub struct MigrationsPostRequest {
    pub response: MigrationsResponseType,
    pub mode: MigrationsModeType,
}

#[derive(Debug, Deserialize)]
pub struct TenantsPostRequest {
    pub name: String,
    pub response: MigrationsResponseType,
    pub mode: MigrationsModeType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationsSuccessResponse {
    pub results: MigrationResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_migrations: Option<Vec<AppliedMigration>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    pub version_name: String,
    pub action: Action,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    pub name: String,
    pub version_name: String,
    pub action: Action,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub results: MigrationResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

#[derive(Debug, Deserialize)]
pub struct VersionsQuery {
    pub file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

pub async fn build_info() -> Json<serde_json::Value> {
    Json(json!({
        "release": env!("CARGO_PKG_VERSION"),
        "sha": option_env!("GIT_SHA").unwrap_or("unknown"),
    }))
}

pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let status = coordinator.health_check().await;
    let code = match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    Ok((code, Json(HealthResponse { status })).into_response())
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

/// YAML echo of the loaded configuration, credentials redacted.
pub async fn config(State(state): State<AppState>) -> Result<Response, ApiError> {
    let yaml = serde_yaml::to_string(&state.config.redacted())
        .map_err(|e| MigratorError::config(format!("could not render config: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "application/x-yaml")], yaml).into_response())
}

pub async fn tenants_get(State(state): State<AppState>) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let tenants = coordinator.get_tenants().await?;
    tracing::info!(count = tenants.len(), "returning tenants");
    Ok(Json(tenants).into_response())
}

pub async fn migrations_source(State(state): State<AppState>) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let migrations = coordinator.get_source_migrations()?;
    tracing::info!(count = migrations.len(), "returning source migrations");
    Ok(Json(migrations).into_response())
}

pub async fn migrations_applied(State(state): State<AppState>) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let migrations = coordinator.get_applied_migrations().await?;
    tracing::info!(count = migrations.len(), "returning applied migrations");
    Ok(Json(migrations).into_response())
}

/// Legacy apply endpoint; the version is named after the request id.
pub async fn migrations_post(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<MigrationsPostRequest>,
) -> Result<Response, ApiError> {
    let (action, dry_run) = request.mode.to_action();
    let version_name = version_name_from(request_id);

    let coordinator = state.coordinator()?;
    let (results, version) = coordinator
        .create_version(&version_name, action, dry_run)
        .await?;

    Ok(Json(success_response(request.response, results, version)).into_response())
}

pub async fn tenants_post(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<TenantsPostRequest>,
) -> Result<Response, ApiError> {
    let (action, dry_run) = request.mode.to_action();
    let version_name = version_name_from(request_id);

    let coordinator = state.coordinator()?;
    let (results, version) = coordinator
        .add_tenant_and_apply_migrations(&request.name, &version_name, action, dry_run)
        .await?;

    tracing::info!(tenant = %request.name, "tenant added");
    Ok(Json(success_response(request.response, results, version)).into_response())
}

pub async fn versions_get(
    State(state): State<AppState>,
    Query(query): Query<VersionsQuery>,
) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let versions = match query.file {
        Some(file) => coordinator.get_versions_by_file(&file).await?,
        None => coordinator.get_versions().await?,
    };
    Ok(Json(versions).into_response())
}

pub async fn version_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let version = coordinator.get_version_by_id(id).await?;
    Ok(Json(version).into_response())
}

pub async fn migration_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let migration = coordinator.get_db_migration_by_id(id).await?;
    Ok(Json(migration).into_response())
}

pub async fn versions_post(
    State(state): State<AppState>,
    Json(request): Json<CreateVersionRequest>,
) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let (results, version) = coordinator
        .create_version(&request.version_name, request.action, request.dry_run)
        .await?;
    Ok(Json(CreateResponse { results, version }).into_response())
}

pub async fn tenants_post_v2(
    State(state): State<AppState>,
    Json(request): Json<CreateTenantRequest>,
) -> Result<Response, ApiError> {
    let coordinator = state.coordinator()?;
    let (results, version) = coordinator
        .add_tenant_and_apply_migrations(
            &request.name,
            &request.version_name,
            request.action,
            request.dry_run,
        )
        .await?;
    Ok(Json(CreateResponse { results, version }).into_response())
}

fn version_name_from(request_id: Option<Extension<RequestId>>) -> String {
    request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string())
}

fn success_response(
    response: MigrationsResponseType,
    results: MigrationResults,
    version: Option<Version>,
) -> MigrationsSuccessResponse {
    let applied_migrations = match response {
        MigrationsResponseType::Summary => None,
        MigrationsResponseType::List | MigrationsResponseType::Full => {
            Some(version.map(|v| v.applied_migrations).unwrap_or_default())
        }
    };

    MigrationsSuccessResponse {
        results,
        applied_migrations,
    }
}
