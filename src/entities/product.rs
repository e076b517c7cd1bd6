use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Product catalog entry.
///
/// `version` implements optimistic concurrency: every update must carry the
/// version it last read and is rejected when the stored value has moved on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "product")]
pub struct Model {
    /// Auto-assigned identifier, immutable once set.
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Unique business key.
    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: String,

    /// Display name.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Optional free text.
    pub description: Option<String>,

    /// Unit price; non-negative, stored with two fractional digits.
    #[validate(custom = "validate_price")]
    pub price: Decimal,

    /// ISO-4217 currency code.
    #[validate(custom = "validate_currency")]
    pub currency: String,

    /// Units on hand.
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,

    /// Commercial availability flag.
    pub active: bool,

    /// Set once on insert.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency counter, starts at 0.
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

pub fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("decimal_min_zero");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if value.scale() > 2 {
        let mut err = ValidationError::new("decimal_scale");
        err.message = Some("Price cannot have more than 2 fractional digits".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency must be a 3-letter uppercase ISO-4217 code".into());
        return Err(err);
    }
    Ok(())
}

/// Materializes the active model for validation. Inserts have no id yet
/// (the database assigns it), so a placeholder stands in for the
/// conversion; the id itself carries no validation rules.
fn validation_model(active_model: &ActiveModel) -> Result<Model, DbErr> {
    let mut candidate = active_model.clone();
    if candidate.id.is_not_set() {
        candidate.id = Set(0);
    }
    candidate.try_into().map_err(|_| {
        DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
    })
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        let now = Utc::now();
        if insert {
            active_model.created_at = Set(now);
            active_model.version = Set(0);
        }
        active_model.updated_at = Set(now);

        let model = validation_model(&active_model)?;
        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_model() -> Model {
        Model {
            id: 1,
            sku: "SKU-001".to_string(),
            name: "Sample product".to_string(),
            description: None,
            price: dec!(19.99),
            currency: "USD".to_string(),
            stock: 5,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn valid_model_passes_validation() {
        assert!(sample_model().validate().is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut model = sample_model();
        model.price = dec!(-0.01);
        assert!(model.validate().is_err());
    }

    #[test]
    fn price_with_three_fractional_digits_is_rejected() {
        let mut model = sample_model();
        model.price = dec!(10.999);
        assert!(model.validate().is_err());
    }

    #[test]
    fn lowercase_currency_is_rejected() {
        let mut model = sample_model();
        model.currency = "usd".to_string();
        assert!(model.validate().is_err());
    }

    #[test]
    fn negative_stock_is_rejected() {
        let mut model = sample_model();
        model.stock = -1;
        assert!(model.validate().is_err());
    }

    fn insert_candidate() -> ActiveModel {
        // As built on the create path: every column set except the
        // database-assigned id.
        ActiveModel {
            sku: Set("SKU-NEW".to_string()),
            name: Set("New product".to_string()),
            description: Set(None),
            price: Set(dec!(9.99)),
            currency: Set("USD".to_string()),
            stock: Set(1),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            version: Set(0),
            ..Default::default()
        }
    }

    #[test]
    fn validation_model_accepts_an_unset_id() {
        let model = validation_model(&insert_candidate()).expect("insert candidate materializes");
        assert_eq!(model.sku, "SKU-NEW");
        assert!(model.validate().is_ok());
    }

    #[test]
    fn validation_model_still_surfaces_field_violations() {
        let mut candidate = insert_candidate();
        candidate.currency = Set("1A2".to_string());
        let model = validation_model(&candidate).expect("conversion succeeds");
        assert!(model.validate().is_err());
    }
}
