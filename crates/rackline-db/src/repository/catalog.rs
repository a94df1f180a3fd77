//! # Catalog Cache Repository
//!
//! Offline copy of the product catalog and stock levels.
//!
//! While the terminal is online, the cache is refreshed wholesale from the
//! remote catalog. While offline, it is the only source the POS has: cart
//! lines are priced from `cached_variants` and checked against
//! `stock_levels` (see `rackline_core::validation::check_stock`).
//!
//! Stock levels here are advisory; the remote store remains authoritative
//! and reconciles on sync. They exist so an offline terminal doesn't
//! cheerfully sell forty of something it has two of.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use rackline_core::{CachedVariant, StockLevel};

/// Repository for the offline catalog cache.
#[derive(Debug, Clone)]
pub struct CatalogCacheRepository {
    pool: SqlitePool,
}

impl CatalogCacheRepository {
    /// Creates a new CatalogCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogCacheRepository { pool }
    }

    /// Replaces the entire variant cache with a fresh catalog snapshot.
    ///
    /// Clear-then-insert in one transaction: a crash mid-refresh leaves
    /// the previous snapshot intact, never a half-written one.
    pub async fn replace_variants(&self, variants: &[CachedVariant]) -> DbResult<()> {
        debug!(count = variants.len(), "Replacing cached catalog");

        let mut txn = self.pool.begin().await?;

        sqlx::query("DELETE FROM cached_variants")
            .execute(&mut *txn)
            .await?;

        for variant in variants {
            sqlx::query(
                r#"
                INSERT INTO cached_variants (
                    variant_id, product_id, name, unit_price_cents, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&variant.variant_id)
            .bind(&variant.product_id)
            .bind(&variant.name)
            .bind(variant.unit_price_cents)
            .bind(variant.updated_at)
            .execute(&mut *txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Returns all cached variants, sorted by name.
    pub async fn list_variants(&self) -> DbResult<Vec<CachedVariant>> {
        let variants: Vec<CachedVariant> = sqlx::query_as(
            r#"
            SELECT variant_id, product_id, name, unit_price_cents, updated_at
            FROM cached_variants
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Looks up one cached variant.
    pub async fn get_variant(&self, variant_id: &str) -> DbResult<Option<CachedVariant>> {
        let variant: Option<CachedVariant> = sqlx::query_as(
            r#"
            SELECT variant_id, product_id, name, unit_price_cents, updated_at
            FROM cached_variants
            WHERE variant_id = ?1
            "#,
        )
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Sets the locally tracked stock level for a variant.
    pub async fn upsert_stock_level(&self, variant_id: &str, quantity: i64) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stock_levels (variant_id, quantity, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(variant_id) DO UPDATE SET
                quantity = excluded.quantity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(variant_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the tracked stock level for a variant (0 if untracked).
    pub async fn get_stock_level(&self, variant_id: &str) -> DbResult<i64> {
        let level: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM stock_levels WHERE variant_id = ?1")
                .bind(variant_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(level.unwrap_or(0))
    }

    /// Returns stock levels for all tracked variants, keyed by variant id.
    ///
    /// Feeds `rackline_core::validation::check_stock` at checkout.
    pub async fn stock_levels(&self) -> DbResult<HashMap<String, i64>> {
        let rows: Vec<StockLevel> = sqlx::query_as(
            r#"
            SELECT variant_id, quantity, updated_at
            FROM stock_levels
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.variant_id, r.quantity)).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn variant(id: &str, name: &str, price: i64) -> CachedVariant {
        CachedVariant {
            variant_id: id.to_string(),
            product_id: "PROD-1".to_string(),
            name: name.to_string(),
            unit_price_cents: price,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_replace_and_list_variants() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        catalog
            .replace_variants(&[
                variant("VAR-2", "Wrench 10in", 15_000),
                variant("VAR-1", "Hammer 16oz", 24_900),
            ])
            .await
            .unwrap();

        let listed = catalog.list_variants().await.unwrap();
        assert_eq!(listed.len(), 2);
        // Sorted by name.
        assert_eq!(listed[0].variant_id, "VAR-1");
        assert_eq!(listed[1].variant_id, "VAR-2");
    }

    #[tokio::test]
    async fn test_replace_clears_previous_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        catalog
            .replace_variants(&[variant("VAR-OLD", "Old item", 100)])
            .await
            .unwrap();
        catalog
            .replace_variants(&[variant("VAR-NEW", "New item", 200)])
            .await
            .unwrap();

        let listed = catalog.list_variants().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].variant_id, "VAR-NEW");
        assert!(catalog.get_variant("VAR-OLD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stock_levels_upsert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        catalog.upsert_stock_level("VAR-1", 10).await.unwrap();
        catalog.upsert_stock_level("VAR-1", 7).await.unwrap();
        catalog.upsert_stock_level("VAR-2", 3).await.unwrap();

        assert_eq!(catalog.get_stock_level("VAR-1").await.unwrap(), 7);
        // Untracked variants read as zero.
        assert_eq!(catalog.get_stock_level("VAR-9").await.unwrap(), 0);

        let levels = catalog.stock_levels().await.unwrap();
        assert_eq!(levels.get("VAR-1"), Some(&7));
        assert_eq!(levels.get("VAR-2"), Some(&3));
    }
}
