#![allow(dead_code)]

use sea_orm::{Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::prelude::*;
use tablecrate::metadata::{EntityMetadata, Schema};

pub mod post_entity;
pub mod profile_entity;
pub mod user_entity;

pub const USER_SEARCH_FIELDS: [&str; 2] = ["first_name", "last_name"];

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed(&db).await?;

    Ok(db)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Entity metadata for the test tables. Relations follow the foreign keys.
pub fn schema() -> Schema {
    Schema::new()
        .register(
            EntityMetadata::from_entity::<user_entity::Entity>("User")
                .with_relation("profile", "Profile", "profile_id", "id")
                .with_many_relation("posts", "Post", "id", "user_id"),
        )
        .register(EntityMetadata::from_entity::<profile_entity::Entity>("Profile"))
        .register(
            EntityMetadata::from_entity::<post_entity::Entity>("Post")
                .with_relation("user", "User", "user_id", "id"),
        )
}

fn profile(id: i32, country: &str, city: &str) -> profile_entity::ActiveModel {
    profile_entity::Model {
        id,
        country: country.to_string(),
        city: city.to_string(),
        bio: format!("Lives in {city}"),
    }
    .into()
}

fn user(id: i32, first: &str, last: &str, active: bool, profile_id: Option<i32>) -> user_entity::ActiveModel {
    user_entity::Model {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        active,
        profile_id,
    }
    .into()
}

fn post(id: i32, title: &str, user_id: i32) -> post_entity::ActiveModel {
    post_entity::Model {
        id,
        title: title.to_string(),
        body: format!("{title} body"),
        user_id,
    }
    .into()
}

/// Four profiles (nobody lives in Évry), five users (Dan has no profile), six posts.
async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    profile_entity::Entity::insert_many([
        profile(1, "FR", "Paris"),
        profile(2, "DE", "Berlin"),
        profile(3, "FR", "Lyon"),
        profile(4, "FR", "Évry"),
    ])
    .exec(db)
    .await?;

    user_entity::Entity::insert_many([
        user(1, "Ann", "Smith", true, Some(1)),
        user(2, "Bob", "Smithers", true, Some(2)),
        user(3, "Cara", "Jones", false, Some(3)),
        user(4, "Dan", "Black", true, None),
        user(5, "Eve", "Smith", true, Some(3)),
    ])
    .exec(db)
    .await?;

    post_entity::Entity::insert_many([
        post(1, "Hello world", 1),
        post(2, "Rust tips", 1),
        post(3, "Lyon food guide", 5),
        post(4, "Berlin nights", 2),
        post(5, "100% real", 3),
        post(6, "snake_case naming", 4),
    ])
    .exec(db)
    .await?;

    Ok(())
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables)]
    }
}

pub struct CreateTables;

#[async_trait::async_trait]
impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20250101_000001_create_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::Country).string().not_null())
                    .col(ColumnDef::new(Profiles::City).string().not_null())
                    .col(ColumnDef::new(Profiles::Bio).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Active).boolean().not_null().default(true))
                    .col(ColumnDef::new(Users::ProfileId).integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Posts::Title).string().not_null())
                    .col(ColumnDef::new(Posts::Body).text().not_null())
                    .col(ColumnDef::new(Posts::UserId).integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Country,
    City,
    Bio,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Active,
    ProfileId,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    Title,
    Body,
    UserId,
}
