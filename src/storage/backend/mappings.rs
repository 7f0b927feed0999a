//! Mapping store operations for SeaOrmStorage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{mapping_to_active_model, model_to_mapping};
use super::retry;
use crate::errors::Result;
use crate::storage::{MappingStats, MappingStore, UrlMapping};

use migration::entities::url_mapping;

#[async_trait]
impl MappingStore for SeaOrmStorage {
    async fn insert_mapping(&self, mapping: &UrlMapping) -> Result<()> {
        // 不重试：key 已被 claim，重复插入只会产生主键冲突
        url_mapping::Entity::insert(mapping_to_active_model(mapping))
            .exec(&self.db)
            .await?;
        debug!("Mapping stored: {} -> {}", mapping.short_key, mapping.long_url);
        Ok(())
    }

    async fn get_mapping(&self, short_key: &str) -> Result<Option<UrlMapping>> {
        let db = &self.db;
        let key = short_key.to_string();
        let model = retry::with_retry("get_mapping", self.retry_config, || async {
            url_mapping::Entity::find_by_id(key.clone()).one(db).await
        })
        .await?;
        Ok(model.map(model_to_mapping))
    }

    async fn delete_if_expired(&self, short_key: &str, now: DateTime<Utc>) -> Result<bool> {
        let db = &self.db;
        let key = short_key.to_string();
        let result = retry::with_retry("delete_if_expired", self.retry_config, || async {
            url_mapping::Entity::delete_many()
                .filter(url_mapping::Column::ShortKey.eq(key.clone()))
                .filter(url_mapping::Column::ExpiresAt.lte(now))
                .exec(db)
                .await
        })
        .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<String>> {
        let db = &self.db;
        let keys = retry::with_retry("find_expired", self.retry_config, || async {
            url_mapping::Entity::find()
                .select_only()
                .column(url_mapping::Column::ShortKey)
                .filter(url_mapping::Column::ExpiresAt.lte(now))
                .order_by_asc(url_mapping::Column::ShortKey)
                .limit(limit)
                .into_tuple::<String>()
                .all(db)
                .await
        })
        .await?;
        Ok(keys)
    }

    async fn delete_expired(&self, short_keys: &[String], now: DateTime<Utc>) -> Result<u64> {
        if short_keys.is_empty() {
            return Ok(0);
        }

        let db = &self.db;
        let result = retry::with_retry("delete_expired", self.retry_config, || async {
            url_mapping::Entity::delete_many()
                .filter(url_mapping::Column::ShortKey.is_in(short_keys.iter().cloned()))
                .filter(url_mapping::Column::ExpiresAt.lte(now))
                .exec(db)
                .await
        })
        .await?;
        Ok(result.rows_affected)
    }

    async fn mapping_stats(&self, now: DateTime<Utc>) -> Result<MappingStats> {
        let db = &self.db;
        let total = retry::with_retry("count_mappings", self.retry_config, || async {
            url_mapping::Entity::find().count(db).await
        })
        .await?;
        let expired = retry::with_retry("count_expired", self.retry_config, || async {
            url_mapping::Entity::find()
                .filter(url_mapping::Column::ExpiresAt.lte(now))
                .count(db)
                .await
        })
        .await?;
        Ok(MappingStats { total, expired })
    }
}
