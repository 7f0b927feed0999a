use std::str::FromStr;

use crate::storage::{KeyRecord, KeyStatus, UrlMapping};
use migration::entities::{key_pool, url_mapping};

/// 将 key_pool Model 转换为 KeyRecord
///
/// 未知状态按 Claimed 处理，避免被再次发放。
pub fn model_to_key_record(model: key_pool::Model) -> KeyRecord {
    KeyRecord {
        status: KeyStatus::from_str(&model.status).unwrap_or(KeyStatus::Claimed),
        key: model.key,
        created_at: model.created_at,
        claimed_at: model.claimed_at,
    }
}

/// 将 url_mappings Model 转换为 UrlMapping
pub fn model_to_mapping(model: url_mapping::Model) -> UrlMapping {
    UrlMapping {
        short_key: model.short_key,
        long_url: model.long_url,
        created_at: model.created_at,
        expires_at: model.expires_at,
        hit_count: model.hit_count.max(0),
    }
}

/// 将 UrlMapping 转换为 ActiveModel（仅用于插入）
pub fn mapping_to_active_model(mapping: &UrlMapping) -> url_mapping::ActiveModel {
    use sea_orm::ActiveValue::*;

    url_mapping::ActiveModel {
        short_key: Set(mapping.short_key.clone()),
        long_url: Set(mapping.long_url.clone()),
        created_at: Set(mapping.created_at),
        expires_at: Set(mapping.expires_at),
        hit_count: Set(mapping.hit_count),
    }
}
