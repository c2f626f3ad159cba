//! Repository for the `products` table.

use drip_core::types::DbId;
use sqlx::PgPool;

use crate::models::product::{CreateProduct, Product};

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for products.
pub struct ProductRepo;

impl ProductRepo {
    pub async fn create(pool: &PgPool, input: &CreateProduct) -> Result<Product, sqlx::Error> {
        let query = format!("INSERT INTO products (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
