use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 key_pool 表
        manager
            .create_table(
                Table::create()
                    .table(KeyPool::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KeyPool::Key)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(KeyPool::Status)
                            .string_len(16)
                            .not_null()
                            .default("unused"),
                    )
                    .col(
                        ColumnDef::new(KeyPool::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(KeyPool::ClaimedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // claim 与补充时都按 status 过滤
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_key_pool_status")
                    .table(KeyPool::Table)
                    .col(KeyPool::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_key_pool_status")
                    .table(KeyPool::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(KeyPool::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum KeyPool {
    #[sea_orm(iden = "key_pool")]
    Table,
    Key,
    Status,
    CreatedAt,
    ClaimedAt,
}
