use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 url_mappings 表
        manager
            .create_table(
                Table::create()
                    .table(UrlMapping::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UrlMapping::ShortKey)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UrlMapping::LongUrl).text().not_null())
                    .col(
                        ColumnDef::new(UrlMapping::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UrlMapping::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UrlMapping::HitCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 清理任务按过期时间扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_url_mappings_expires_at")
                    .table(UrlMapping::Table)
                    .col(UrlMapping::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_url_mappings_expires_at")
                    .table(UrlMapping::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UrlMapping::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UrlMapping {
    #[sea_orm(iden = "url_mappings")]
    Table,
    ShortKey,
    LongUrl,
    CreatedAt,
    ExpiresAt,
    HitCount,
}
