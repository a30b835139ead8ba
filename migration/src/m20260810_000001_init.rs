use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== USERS ==========
        // Account management lives in the auth service; this table carries the
        // columns the alerting path reads and writes.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).text().not_null())
                    .col(ColumnDef::new(Users::MailSent).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .extra("DEFAULT NOW()"),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== NODES ==========
        manager
            .create_table(
                Table::create()
                    .table(Nodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Nodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(Nodes::Uid).text().not_null().unique_key())
                    .col(ColumnDef::new(Nodes::Location).text().not_null())
                    .col(ColumnDef::new(Nodes::MachineName).text().not_null())
                    .col(ColumnDef::new(Nodes::Owner).text().not_null())
                    .col(ColumnDef::new(Nodes::IsTemperature).boolean())
                    .col(ColumnDef::new(Nodes::IsHumidity).boolean())
                    .col(ColumnDef::new(Nodes::IsCo2).boolean())
                    .col(ColumnDef::new(Nodes::TemperatureMin).double())
                    .col(ColumnDef::new(Nodes::TemperatureMax).double())
                    .col(ColumnDef::new(Nodes::HumidityMin).double())
                    .col(ColumnDef::new(Nodes::HumidityMax).double())
                    .col(ColumnDef::new(Nodes::Co2Min).double())
                    .col(ColumnDef::new(Nodes::Co2Max).double())
                    .col(
                        ColumnDef::new(Nodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .extra("DEFAULT NOW()"),
                    )
                    .to_owned(),
            )
            .await?;

        // Scoped listings filter on owner or location
        manager
            .create_index(
                Index::create()
                    .name("idx_nodes_owner")
                    .table(Nodes::Table)
                    .col(Nodes::Owner)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nodes_location")
                    .table(Nodes::Table)
                    .col(Nodes::Location)
                    .to_owned(),
            )
            .await?;

        // ========== READINGS ==========
        // No foreign key to nodes: ingest accepts readings for uids that were
        // never registered, and node deletion removes dependents itself.
        manager
            .create_table(
                Table::create()
                    .table(Readings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Readings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Readings::Uid).text().not_null())
                    .col(ColumnDef::new(Readings::Owner).text())
                    .col(
                        ColumnDef::new(Readings::Datetime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()"),
                    )
                    .col(ColumnDef::new(Readings::Pressure).double())
                    .col(ColumnDef::new(Readings::Humidity).double())
                    .col(ColumnDef::new(Readings::Co2).double())
                    .col(ColumnDef::new(Readings::Temperature).double())
                    .to_owned(),
            )
            .await?;

        // Index for per-uid lookups with newest-first ordering
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX idx_readings_uid_datetime ON readings (uid, datetime DESC)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Readings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Nodes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    MailSent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Nodes {
    Table,
    Id,
    Uid,
    Location,
    MachineName,
    Owner,
    IsTemperature,
    IsHumidity,
    IsCo2,
    TemperatureMin,
    TemperatureMax,
    HumidityMin,
    HumidityMax,
    Co2Min,
    Co2Max,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Readings {
    Table,
    Id,
    Uid,
    Owner,
    Datetime,
    Pressure,
    Humidity,
    Co2,
    Temperature,
}
