use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Farmers::Table)
                    .if_not_exists()
                    .col(pk_auto(Farmers::Id))
                    .col(string(Farmers::Name))
                    .col(string(Farmers::MobileNo))
                    .col(string(Farmers::District))
                    .col(string(Farmers::Village))
                    .col(string(Farmers::City))
                    .col(string(Farmers::State))
                    .col(decimal_len(Farmers::AcresOwned, 10, 2))
                    .col(decimal_len(Farmers::AnnualIncome, 10, 2))
                    .col(string_uniq(Farmers::Email))
                    .col(string(Farmers::PasswordHash))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Farmers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Farmers {
    Table,
    Id,
    Name,
    MobileNo,
    District,
    Village,
    City,
    State,
    AcresOwned,
    AnnualIncome,
    Email,
    PasswordHash,
}
