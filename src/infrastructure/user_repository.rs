use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
};

use crate::{
    domain::{
        error::{RepositoryError, UniqueField},
        models::user::{ExternalId, NewUser, User, UserId},
        repositories::user_repository::UserRepository,
    },
    infrastructure::entity::users,
};

#[derive(Clone)]
pub struct SqlUserRepository {
    db: DatabaseConnection,
}

impl SqlUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: users::Model) -> User {
    User::reconstruct(
        UserId::new(model.id),
        model.username,
        model.email,
        ExternalId::new(model.external_id),
        model.first_name,
        model.last_name,
        model.active,
        model.created_at,
        model.updated_at,
    )
}

fn map_db_err(e: DbErr) -> RepositoryError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            RepositoryError::UniqueViolation(unique_field(&message))
        }
        _ => RepositoryError::DatabaseError(e.to_string()),
    }
}

/// Field behind a unique-violation message, judged by the key name only.
///
/// MySQL: `Duplicate entry 'v' for key 'users.email'`,
/// SQLite: `UNIQUE constraint failed: users.email`,
/// Postgres: `... violates unique constraint "users_email_key"`.
/// The duplicated value can contain anything, so it is never inspected.
fn unique_field(message: &str) -> UniqueField {
    const KEY_MARKERS: [&str; 3] = ["for key '", "constraint failed: ", "unique constraint \""];

    let key = KEY_MARKERS
        .iter()
        .find_map(|marker| message.rfind(marker).map(|at| &message[at + marker.len()..]))
        .unwrap_or_default();

    if key.to_lowercase().contains("email") {
        UniqueField::Email
    } else {
        UniqueField::Username
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(user.map(to_domain))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(user.map(to_domain))
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError> {
        let user = users::Entity::find()
            .filter(users::Column::ExternalId.eq(external_id.as_str()))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(user.map(to_domain))
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(users.into_iter().map(to_domain).collect())
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now();
        let user_model = users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            external_id: Set(user.external_id.as_str().to_string()),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = user_model.insert(&self.db).await.map_err(map_db_err)?;
        Ok(to_domain(model))
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = users::Entity::delete_by_id(id.value())
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
