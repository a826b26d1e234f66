/// Product endpoints
///
/// Same access rules as categories, against the `products` resource.
/// Responses carry the product together with its category name.
///
/// # Endpoints
///
/// - `GET /api/products` - List products, ordered by name
/// - `POST /api/products` - Create product
/// - `GET /api/products/:id` - Fetch product
/// - `PUT /api/products/:id` - Partially update product
/// - `DELETE /api/products/:id` - Delete product

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
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
        category::Category,
        product::{price_problem, NewProduct, ProductWithCategory, UpdateProduct},
        role::{Action, Resource},
    },
    store::Store,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create product request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Required, must be greater than 0
    pub price: Option<Decimal>,

    pub category_id: Option<Uuid>,

    #[validate(length(max = 1024, message = "Image URL must be at most 1024 characters"))]
    pub image_url: Option<String>,

    /// Defaults to true
    pub is_active: Option<bool>,
}

/// Update product request
///
/// Absent fields are left unchanged. `description`, `category_id` and
/// `image_url` may be set to `null`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub price: Option<Decimal>,

    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,

    pub is_active: Option<bool>,
}

fn field_error(field: &str, message: &str) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Runs declarative validation plus the price rules
fn check_fields(
    validated: Result<(), validator::ValidationErrors>,
    price: Option<Decimal>,
    price_required: bool,
) -> ApiResult<()> {
    let mut errors = validated
        .err()
        .map(|e| validation_details(&e))
        .unwrap_or_default();

    match price {
        None if price_required => errors.push(field_error("price", "Price is required")),
        Some(price) => {
            if let Some(problem) = price_problem(price) {
                errors.push(field_error("price", problem));
            }
        }
        None => {}
    }

    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(ApiError::ValidationError(errors))
}

/// Looks up a category referenced by a product in the caller's organization
async fn resolve_category(
    store: &dyn Store,
    organization_id: Uuid,
    category_id: Uuid,
) -> ApiResult<Category> {
    store
        .find_category(organization_id, category_id)
        .await?
        .ok_or_else(|| {
            ApiError::ValidationError(vec![field_error("category_id", "Category not found")])
        })
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<Vec<ProductWithCategory>>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Products, Action::Read).await?;

    let products = state.store.list_products(caller.organization_id()).await?;

    Ok(Json(ApiResponse::ok(products)))
}

/// Fetch a product
pub async fn get_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ProductWithCategory>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Products, Action::Read).await?;
    let id = parse_id(&id, "product")?;

    let product = state
        .store
        .find_product(caller.organization_id(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(ApiResponse::ok(product)))
}

/// Create a product
///
/// # Endpoint
///
/// ```text
/// POST /api/products
/// Authorization: Bearer <identity_token>
/// Content-Type: application/json
///
/// {
///   "name": "Es Teh",
///   "price": "8000",
///   "category_id": "uuid",
///   "is_active": true
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, including an unknown `category_id`
/// - `403 Forbidden`: Role lacks `products:create`
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProductWithCategory>>)> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Products, Action::Create).await?;
    check_fields(req.validate(), req.price, true)?;
    let organization_id = caller.organization_id();

    let category_name = match req.category_id {
        Some(category_id) => {
            Some(resolve_category(state.store.as_ref(), organization_id, category_id).await?.name)
        }
        None => None,
    };

    let product = state
        .store
        .create_product(NewProduct {
            organization_id,
            category_id: req.category_id,
            name: req.name,
            description: req.description,
            price: req.price.unwrap_or_default(),
            image_url: req.image_url,
            is_active: req.is_active.unwrap_or(true),
        })
        .await?;

    info!(
        product_id = %product.id,
        %organization_id,
        price = %product.price,
        "Product created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Product created",
            ProductWithCategory {
                product,
                category_name,
            },
        )),
    ))
}

/// Update a product
///
/// # Errors
///
/// - `400 Bad Request`: Malformed id, validation failed, or no fields given
/// - `404 Not Found`: No such product in the caller's organization
pub async fn update_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> ApiResult<Json<ApiResponse<ProductWithCategory>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Products, Action::Update).await?;
    let id = parse_id(&id, "product")?;
    check_fields(req.validate(), req.price, false)?;
    let organization_id = caller.organization_id();

    if let Some(Some(category_id)) = req.category_id {
        resolve_category(state.store.as_ref(), organization_id, category_id).await?;
    }

    let changes = UpdateProduct {
        name: req.name,
        description: req.description,
        price: req.price,
        category_id: req.category_id,
        image_url: req.image_url,
        is_active: req.is_active,
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    state
        .store
        .update_product(organization_id, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let product = state
        .store
        .find_product(organization_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    info!(product_id = %id, "Product updated");

    Ok(Json(ApiResponse::with_message("Product updated", product)))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let caller = authorize(state.store.as_ref(), &auth, Resource::Products, Action::Delete).await?;
    let id = parse_id(&id, "product")?;

    if !state.store.delete_product(caller.organization_id(), id).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }

    info!(product_id = %id, "Product deleted");

    Ok(Json(ApiResponse::message("Product deleted")))
}
