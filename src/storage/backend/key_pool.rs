//! Key pool operations for SeaOrmStorage
//!
//! Claim protocol: read a small window of Unused keys without locking, pick
//! one at random, then flip it with a single conditional UPDATE. The UPDATE
//! is the only mutual exclusion; the window read is a hint.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use tracing::{debug, trace};

use super::SeaOrmStorage;
use super::converters::model_to_key_record;
use super::retry;
use crate::errors::{Result, ShortpoolError};
use crate::storage::{ClaimOptions, KeyPool, KeyRecord, KeyStatus, PoolStats};

use migration::entities::key_pool;

impl SeaOrmStorage {
    /// 读取一批 Unused key 作为候选
    async fn unused_window(&self, limit: u64) -> Result<Vec<String>> {
        let db = &self.db;
        let keys = retry::with_retry("claim_window", self.retry_config, || async {
            key_pool::Entity::find()
                .select_only()
                .column(key_pool::Column::Key)
                .filter(key_pool::Column::Status.eq(KeyStatus::Unused.as_ref()))
                .limit(limit)
                .into_tuple::<String>()
                .all(db)
                .await
        })
        .await?;
        Ok(keys)
    }

    /// 条件更新 Unused -> Claimed，返回是否由本次调用完成迁移
    ///
    /// 不重试：超时或连接错误时无法判断本次是否已生效。
    async fn try_claim(&self, key: &str) -> Result<bool> {
        let result = key_pool::Entity::update_many()
            .col_expr(
                key_pool::Column::Status,
                Expr::value(KeyStatus::Claimed.as_ref()),
            )
            .col_expr(key_pool::Column::ClaimedAt, Expr::value(Some(Utc::now())))
            .filter(key_pool::Column::Key.eq(key))
            .filter(key_pool::Column::Status.eq(KeyStatus::Unused.as_ref()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

#[async_trait]
impl KeyPool for SeaOrmStorage {
    // 每次输掉竞争都意味着另一个调用方拿走了一个 key，循环必然收敛
    async fn claim(&self, options: ClaimOptions) -> Result<String> {
        let mut lost = 0u32;
        loop {
            let mut candidates = self.unused_window(options.window.max(1)).await?;
            if candidates.is_empty() {
                debug!("Key pool drained after {} lost claim races", lost);
                return Err(ShortpoolError::pool_exhausted("key 池中没有可用的 key"));
            }

            while !candidates.is_empty() {
                let idx = rand::random_range(0..candidates.len());
                let key = candidates.swap_remove(idx);

                if self.try_claim(&key).await? {
                    trace!("Claimed key {} after {} lost races", key, lost);
                    return Ok(key);
                }
                lost += 1;
            }
        }
    }

    async fn insert_claimed(&self, key: &str) -> Result<bool> {
        let now = Utc::now();
        let mut stmt = Query::insert();
        stmt.into_table(key_pool::Entity)
            .columns([
                key_pool::Column::Key,
                key_pool::Column::Status,
                key_pool::Column::CreatedAt,
                key_pool::Column::ClaimedAt,
            ])
            .values([
                key.into(),
                KeyStatus::Claimed.as_ref().into(),
                now.into(),
                Some(now).into(),
            ])
            .map_err(|e| ShortpoolError::store_unavailable(e.to_string()))?
            .on_conflict(
                OnConflict::column(key_pool::Column::Key)
                    .do_nothing()
                    .to_owned(),
            );

        let db = &self.db;
        let stmt_ref = &stmt;
        let result = retry::with_retry("insert_claimed", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_unused(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut stmt = Query::insert();
        stmt.into_table(key_pool::Entity).columns([
            key_pool::Column::Key,
            key_pool::Column::Status,
            key_pool::Column::CreatedAt,
        ]);
        for key in keys {
            stmt.values([
                key.as_str().into(),
                KeyStatus::Unused.as_ref().into(),
                now.into(),
            ])
            .map_err(|e| ShortpoolError::store_unavailable(e.to_string()))?;
        }
        stmt.on_conflict(
            OnConflict::column(key_pool::Column::Key)
                .do_nothing()
                .to_owned(),
        );

        let db = &self.db;
        let stmt_ref = &stmt;
        let result = retry::with_retry("insert_unused", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unused(&self) -> Result<u64> {
        let db = &self.db;
        let count = retry::with_retry("count_unused", self.retry_config, || async {
            key_pool::Entity::find()
                .filter(key_pool::Column::Status.eq(KeyStatus::Unused.as_ref()))
                .count(db)
                .await
        })
        .await?;
        Ok(count)
    }

    async fn pool_stats(&self) -> Result<PoolStats> {
        let db = &self.db;
        let total = retry::with_retry("count_keys", self.retry_config, || async {
            key_pool::Entity::find().count(db).await
        })
        .await?;
        let unused = self.count_unused().await?;

        Ok(PoolStats {
            unused,
            claimed: total.saturating_sub(unused),
            total,
        })
    }

    async fn get_key(&self, key: &str) -> Result<Option<KeyRecord>> {
        let db = &self.db;
        let key_owned = key.to_string();
        let model = retry::with_retry("get_key", self.retry_config, || async {
            key_pool::Entity::find_by_id(key_owned.clone()).one(db).await
        })
        .await?;
        Ok(model.map(model_to_key_record))
    }
}
