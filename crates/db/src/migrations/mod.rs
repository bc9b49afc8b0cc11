//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_organization_tables;
mod m20250601_000003_create_group_tables;
mod m20250601_000004_create_direct_message_table;
mod m20250601_000005_create_group_message_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_organization_tables::Migration),
            Box::new(m20250601_000003_create_group_tables::Migration),
            Box::new(m20250601_000004_create_direct_message_table::Migration),
            Box::new(m20250601_000005_create_group_message_tables::Migration),
        ]
    }
}
