use super::ProductCatalog;
use crate::error::RepositoryResult;
use crate::models::Product;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for catalog reads
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new ProductRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, classic_address
            FROM products
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, classic_address
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_by_classic_address(&self, classic_address: &str) -> RepositoryResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, classic_address
            FROM products
            WHERE classic_address = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(classic_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }
}
