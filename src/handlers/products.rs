use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::product;
use crate::errors::ApiError;
use crate::handlers::common::{
    created_response, success_response, validate_input, PaginatedResponse, PaginationParams,
};
use crate::services::products::{CreateProductInput, ProductListQuery, UpdateProductInput};
use crate::AppState;

const MAX_PAGE_SIZE: u64 = 100;

fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Creates the router for product endpoints.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product).put(update_product))
        .route("/sku/:sku", get(get_product_by_sku))
}

/// Create a new product
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let CreateProductRequest {
        sku,
        name,
        description,
        price,
        currency,
        stock,
        active,
    } = payload;

    let input = CreateProductInput {
        sku: normalize_string(sku),
        name: normalize_string(name),
        description: normalize_optional_string(description),
        price,
        currency: currency.trim().to_ascii_uppercase(),
        stock: stock.unwrap_or(0),
        active: active.unwrap_or(true),
    };

    let candidate = CreateProductRequest {
        sku: input.sku.clone(),
        name: input.name.clone(),
        description: input.description.clone(),
        price: input.price,
        currency: input.currency.clone(),
        stock: Some(input.stock),
        active: Some(input.active),
    };
    validate_input(&candidate)?;

    let created = state
        .services
        .product_catalog
        .create_product(input)
        .await?;

    Ok(created_response(ProductResponse::from(created)))
}

/// Get a product by ID
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state.services.product_catalog.get_product(id).await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Get a product by SKU
async fn get_product_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .get_product_by_sku(&sku)
        .await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// List products with pagination
async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<ProductListFilters>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = pagination.page;
    let per_page = pagination.per_page;

    if page == 0 {
        return Err(ApiError::validation(vec![crate::errors::FieldError::new(
            "page",
            "range",
            "page must be greater than zero",
        )]));
    }
    if per_page == 0 || per_page > MAX_PAGE_SIZE {
        return Err(ApiError::validation(vec![crate::errors::FieldError::new(
            "per_page",
            "range",
            format!("per_page must be between 1 and {}", MAX_PAGE_SIZE),
        )]));
    }

    let query = ProductListQuery {
        active: filters.active,
        search: filters.search,
        page,
        per_page,
    };

    let (products, total) = state.services.product_catalog.list_products(query).await?;
    let products: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        products, page, per_page, total,
    )))
}

/// Update a product (version-checked)
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let UpdateProductRequest {
        name,
        description,
        price,
        currency,
        stock,
        active,
        version,
    } = payload;

    let input = UpdateProductInput {
        name: name.map(normalize_string),
        description: normalize_optional_string(description),
        price,
        currency: currency.map(|c| c.trim().to_ascii_uppercase()),
        stock,
        active,
        expected_version: version,
    };

    let updated = state
        .services
        .product_catalog
        .update_product(id, input)
        .await?;

    Ok(success_response(ProductResponse::from(updated)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    /// Unique business key.
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: String,
    /// Product display name.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price; non-negative, at most two fractional digits.
    #[validate(custom = "product::validate_price")]
    pub price: Decimal,
    /// Currency code (ISO 4217, 3 characters).
    #[validate(custom = "product::validate_currency")]
    pub currency: String,
    /// Units on hand, defaults to 0.
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    /// Availability flag, defaults to true.
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(custom = "validate_optional_price")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_optional_currency")]
    pub currency: Option<String>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub active: Option<bool>,
    /// The version the caller last read; the update is rejected when it no
    /// longer matches the stored value.
    pub version: i64,
}

fn validate_optional_price(value: &Decimal) -> Result<(), validator::ValidationError> {
    product::validate_price(value)
}

fn validate_optional_currency(value: &str) -> Result<(), validator::ValidationError> {
    // Case is normalized after validation; shape must already be three
    // letters so the conditional update never persists digits or symbols.
    let trimmed = value.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = validator::ValidationError::new("currency");
        err.message = Some("Currency must be a 3-letter code".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: i64,
    pub sku: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            description: model.description,
            price: model.price,
            currency: model.currency,
            stock: model.stock,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListFilters {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}
