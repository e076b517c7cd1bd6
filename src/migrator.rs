use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_product_table::Migration)]
    }
}

mod m20240101_000001_create_product_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_product_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Product::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Product::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Product::Sku)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Product::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Product::Description).text().null())
                        .col(
                            ColumnDef::new(Product::Price)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Product::Currency).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Product::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Product::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Product::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Product::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Product::Version)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Product::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Product {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Price,
        Currency,
        Stock,
        Active,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}
