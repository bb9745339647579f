use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::infrastructure::entity::users;

/// Creates the `users` table (with its UNIQUE columns) unless it already exists.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(users::Entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
