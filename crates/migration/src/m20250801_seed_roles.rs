use crate::m20250801_create_all_tables::Roles;
use sea_orm_migration::prelude::*;

/// The fixed role set. Names must match the `RoleName` enum in `models`.
const ROLES: [(&str, &str); 3] = [
    ("student", "Student"),
    ("instructor", "Instructor"),
    ("admin", "Administrator"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Roles::Table)
            .columns([Roles::Name, Roles::Description]);

        for (name, description) in ROLES {
            insert.values_panic([name.into(), description.into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Roles::Table)
            .and_where(Expr::col(Roles::Name).is_in(ROLES.map(|(name, _)| name)))
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
