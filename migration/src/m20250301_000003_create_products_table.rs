use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_auto(Products::Id))
                    .col(integer(Products::FarmerId))
                    .col(string(Products::Name))
                    .col(string(Products::Image))
                    .col(decimal_len(Products::Cost, 10, 2))
                    .col(integer(Products::Quantity))
                    .col(timestamp(Products::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-products-farmer_id")
                            .from(Products::Table, Products::FarmerId)
                            .to(Farmers::Table, Farmers::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A farmer cannot list two products under the same name.
        manager
            .create_index(
                Index::create()
                    .name("uix-products-farmer_id-name")
                    .table(Products::Table)
                    .col(Products::FarmerId)
                    .col(Products::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    FarmerId,
    Name,
    Image,
    Cost,
    Quantity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Farmers {
    Table,
    Id,
}
