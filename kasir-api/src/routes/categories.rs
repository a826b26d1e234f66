/// Category endpoints
///
/// All endpoints require an identity token and a provisioned account. Reads
/// need `categories:read`; mutations need the matching create, update or
/// delete grant. Records are scoped to the caller's organization.
///
/// # Endpoints
///
/// - `GET /api/categories` - List categories, ordered by name
/// - `POST /api/categories` - Create category
/// - `GET /api/categories/:id` - Fetch category
/// - `PUT /api/categories/:id` - Partially update category
/// - `DELETE /api/categories/:id` - Delete category (rejected while in use)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{double_option, parse_id, ApiJson, ApiResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use kasir_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    models::{
        category::{Category, NewCategory, UpdateCategory},
        role::{Action, Resource},
    },
    store::StoreError,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Longest accepted color value, e.g. `#0EA5E9` or `rgb(14, 165, 233)`
const MAX_COLOR_LENGTH: usize = 32;

/// Create category request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: Option<String>,
}

/// Update category request
///
/// Absent fields are left unchanged; `description` and `color` may be set
/// to `null` to clear them.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

impl UpdateCategoryRequest {
    fn check_color(&self) -> ApiResult<()> {
        if let Some(Some(color)) = &self.color {
            if color.len() > MAX_COLOR_LENGTH {
                return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "color".to_string(),
                    message: "Color must be at most 32 characters".to_string(),
                }]));
            }
        }
        Ok(())
    }
}

/// List categories
///
/// # Response
///
/// ```json
/// { "success": true, "data": [{ "id": "uuid", "name": "Minuman", ... }] }
/// ```
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<Vec<Category>>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Categories, Action::Read).await?;

    let categories = state.store.list_categories(caller.organization_id()).await?;

    Ok(Json(ApiResponse::ok(categories)))
}

/// Fetch a category
///
/// # Errors
///
/// - `400 Bad Request`: Malformed id
/// - `404 Not Found`: No such category in the caller's organization
pub async fn get_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Categories, Action::Read).await?;
    let id = parse_id(&id, "category")?;

    let category = state
        .store
        .find_category(caller.organization_id(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(ApiResponse::ok(category)))
}

/// Create a category
///
/// # Endpoint
///
/// ```text
/// POST /api/categories
/// Authorization: Bearer <identity_token>
/// Content-Type: application/json
///
/// { "name": "Minuman", "description": "Hot and cold drinks", "color": "#0EA5E9" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Role lacks `categories:create`
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let caller =
        authorize(state.store.as_ref(), &auth, Resource::Categories, Action::Create).await?;
    req.validate()?;

    let category = state
        .store
        .create_category(NewCategory {
            organization_id: caller.organization_id(),
            name: req.name,
            description: req.description,
            color: req.color,
        })
        .await?;

    info!(
        category_id = %category.id,
        organization_id = %category.organization_id,
        "Category created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Category created", category)),
    ))
}

/// Update a category
///
/// # Errors
///
/// - `400 Bad Request`: Malformed id, validation failed, or no fields given
/// - `404 Not Found`: No such category in the caller's organization
pub async fn update_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    let caller =
        authorize(state.store.as_ref(), &auth, Resource::Categories, Action::Update).await?;
    let id = parse_id(&id, "category")?;
    req.validate()?;
    req.check_color()?;

    let changes = UpdateCategory {
        name: req.name,
        description: req.description,
        color: req.color,
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let category = state
        .store
        .update_category(caller.organization_id(), id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    info!(category_id = %category.id, "Category updated");

    Ok(Json(ApiResponse::with_message("Category updated", category)))
}

/// Delete a category
///
/// # Errors
///
/// - `400 Bad Request`: Malformed id, or products still reference the category
/// - `404 Not Found`: No such category in the caller's organization
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let caller =
        authorize(state.store.as_ref(), &auth, Resource::Categories, Action::Delete).await?;
    let id = parse_id(&id, "category")?;
    let organization_id = caller.organization_id();

    if state.store.find_category(organization_id, id).await?.is_none() {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    if state.store.category_in_use(id).await? {
        return Err(in_use());
    }

    // A product may have been attached since the check above.
    let deleted = match state.store.delete_category(organization_id, id).await {
        Ok(deleted) => deleted,
        Err(StoreError::ForeignKey(_)) => return Err(in_use()),
        Err(e) => return Err(e.into()),
    };
    if !deleted {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    info!(category_id = %id, %organization_id, "Category deleted");

    Ok(Json(ApiResponse::message("Category deleted")))
}

fn in_use() -> ApiError {
    ApiError::BadRequest("Cannot delete category that is in use by products".to_string())
}
