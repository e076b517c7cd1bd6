use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::db::DbPool;
use crate::entities::product::{self, Column as ProductColumn, Entity as Product};
use crate::errors::ApiError;

/// Stable code for attempts to reuse an existing SKU.
pub const CODE_SKU_EXISTS: &str = "SKU_ALREADY_EXISTS";
/// Stable code for updates carrying a stale version.
pub const CODE_VERSION_CONFLICT: &str = "PRODUCT_VERSION_CONFLICT";

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub stock: i32,
    pub active: bool,
}

/// Input for a version-checked product update. `expected_version` must be
/// the version the caller last read.
#[derive(Debug, Clone)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
    pub expected_version: i64,
}

/// Filters for listing products.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub active: Option<bool>,
    pub search: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing the product catalog.
pub struct ProductCatalogService {
    db_pool: Arc<DbPool>,
}

impl ProductCatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a new product with `version = 0` and fresh audit timestamps.
    #[instrument(skip(self))]
    pub async fn create_product(&self, input: CreateProductInput) -> Result<product::Model, ApiError> {
        let db = &*self.db_pool;

        let existing = Product::find()
            .filter(ProductColumn::Sku.eq(&input.sku))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ApiError::business_rule(
                CODE_SKU_EXISTS,
                format!("Product with SKU '{}' already exists", input.sku),
            ));
        }

        let mut price = input.price;
        price.rescale(2);

        let now = Utc::now();
        let model = product::ActiveModel {
            sku: Set(input.sku.clone()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(price),
            currency: Set(input.currency),
            stock: Set(input.stock),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(0),
            ..Default::default()
        };

        let created = model.insert(db).await?;
        info!(product_id = created.id, sku = %created.sku, "Product created");
        Ok(created)
    }

    /// Fetches a product by id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> Result<product::Model, ApiError> {
        let db = &*self.db_pool;
        Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Product {} not found", id)))
    }

    /// Fetches a product by its SKU.
    #[instrument(skip(self))]
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<product::Model, ApiError> {
        let db = &*self.db_pool;
        Product::find()
            .filter(ProductColumn::Sku.eq(sku))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Product with SKU '{}' not found", sku)))
    }

    /// Lists products with pagination and optional filters.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<(Vec<product::Model>, u64), ApiError> {
        let db = &*self.db_pool;

        let mut select = Product::find();
        if let Some(active) = query.active {
            select = select.filter(ProductColumn::Active.eq(active));
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                ProductColumn::Name
                    .contains(&search)
                    .or(ProductColumn::Sku.contains(&search)),
            );
        }
        select = select.order_by_desc(ProductColumn::CreatedAt);

        let paginator = select.paginate(db, query.per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((products, total))
    }

    /// Applies a version-checked update.
    ///
    /// The write is a compare-and-swap: `UPDATE ... WHERE id = ? AND
    /// version = ?`. Zero rows affected with an existing row means the
    /// caller's version is stale; the write is rejected, never merged.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: i64,
        input: UpdateProductInput,
    ) -> Result<product::Model, ApiError> {
        let db = &*self.db_pool;

        if let Some(sku_conflict) = self.validate_update(&input) {
            return Err(sku_conflict);
        }

        let mut update = Product::update_many()
            .filter(ProductColumn::Id.eq(id))
            .filter(ProductColumn::Version.eq(input.expected_version));

        if let Some(name) = input.name {
            update = update.col_expr(ProductColumn::Name, Expr::value(name));
        }
        if let Some(description) = input.description {
            update = update.col_expr(ProductColumn::Description, Expr::value(description));
        }
        if let Some(mut price) = input.price {
            price.rescale(2);
            update = update.col_expr(ProductColumn::Price, Expr::value(price));
        }
        if let Some(currency) = input.currency {
            update = update.col_expr(ProductColumn::Currency, Expr::value(currency));
        }
        if let Some(stock) = input.stock {
            update = update.col_expr(ProductColumn::Stock, Expr::value(stock));
        }
        if let Some(active) = input.active {
            update = update.col_expr(ProductColumn::Active, Expr::value(active));
        }

        let update = update
            .col_expr(
                ProductColumn::Version,
                Expr::value(input.expected_version + 1),
            )
            .col_expr(ProductColumn::UpdatedAt, Expr::value(Utc::now()));

        let result = update.exec(db).await?;

        if result.rows_affected == 0 {
            // Either the product is gone or the supplied version is stale.
            return match Product::find_by_id(id).one(db).await? {
                Some(current) => Err(ApiError::business_rule(
                    CODE_VERSION_CONFLICT,
                    format!(
                        "Product {} was modified concurrently (stored version {}, supplied {})",
                        id, current.version, input.expected_version
                    ),
                )),
                None => Err(ApiError::not_found(format!("Product {} not found", id))),
            };
        }

        let updated = Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Product {} not found", id)))?;

        info!(product_id = id, version = updated.version, "Product updated");
        Ok(updated)
    }

    fn validate_update(&self, input: &UpdateProductInput) -> Option<ApiError> {
        if input.name.as_deref().is_some_and(|n| n.is_empty()) {
            return Some(ApiError::validation(vec![crate::errors::FieldError::new(
                "name",
                "length",
                "Product name cannot be blank",
            )]));
        }
        None
    }
}
