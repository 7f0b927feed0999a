//! HitSink implementation for SeaOrmStorage
//!
//! All buffered increments are applied with one parameterized
//! `UPDATE ... SET hit_count = CASE ... END WHERE short_key IN (...)`.

use async_trait::async_trait;
use sea_orm::sea_query::{CaseStatement, Expr, Query};
use sea_orm::{ConnectionTrait, ExprTrait};
use tracing::debug;

use super::SeaOrmStorage;
use super::retry;
use crate::engine::HitSink;
use crate::errors::Result;

use migration::entities::url_mapping;

#[async_trait]
impl HitSink for SeaOrmStorage {
    async fn add_hits(&self, updates: Vec<(String, u64)>) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let total = updates.len();
        let mut case_stmt = CaseStatement::new();
        let mut keys: Vec<String> = Vec::with_capacity(total);

        for (key, count) in &updates {
            case_stmt = case_stmt.case(
                Expr::col(url_mapping::Column::ShortKey).eq(Expr::val(key.as_str())),
                Expr::col(url_mapping::Column::HitCount).add(Expr::val(*count as i64)),
            );
            keys.push(key.clone());
        }
        // 不匹配的保持原值
        case_stmt = case_stmt.finally(Expr::col(url_mapping::Column::HitCount));

        let stmt = Query::update()
            .table(url_mapping::Entity)
            .value(url_mapping::Column::HitCount, case_stmt)
            .and_where(Expr::col(url_mapping::Column::ShortKey).is_in(keys))
            .to_owned();

        // 映射可能已被清理，更新 0 行不算错误
        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("add_hits", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await?;

        debug!(
            "Hit counts flushed to {} database ({} keys)",
            self.backend_name.to_uppercase(),
            total
        );
        Ok(())
    }
}
