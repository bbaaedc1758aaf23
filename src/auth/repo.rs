use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUserRecord, User, UserChanges};

/// Data-access interface for user records.
///
/// Uniqueness of `email` and `username` is the store's responsibility; a
/// violating insert must fail rather than silently duplicate.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: &NewUserRecord) -> anyhow::Result<User>;
    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<Option<User>>;
    async fn delete(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
}

/// Postgres-backed user store.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, hashed_password, is_active, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, hashed_password, is_active, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, hashed_password, is_active, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: &NewUserRecord) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, hashed_password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, hashed_password, is_active, role, created_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.hashed_password)
        .bind(new.role)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                username = COALESCE($3, username),
                hashed_password = COALESCE($4, hashed_password)
            WHERE id = $1
            RETURNING id, email, username, hashed_password, is_active, role, created_at
            "#,
        )
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.username.as_deref())
        .bind(changes.hashed_password.as_deref())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, email, username, hashed_password, is_active, role, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, hashed_password, is_active, role, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

/// In-memory user store used by `AppState::fake()` and unit tests.
pub struct InMemoryUsers {
    pub(crate) inner: std::sync::Mutex<Vec<User>>,
    next_id: std::sync::atomic::AtomicI64,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(Vec::new()),
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryUsers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.inner.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.inner.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let users = self.inner.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: &NewUserRecord) -> anyhow::Result<User> {
        let mut users = self.inner.lock().unwrap();
        // Mirror the database uniqueness constraints
        if users.iter().any(|u| u.email == new.email) {
            anyhow::bail!("unique constraint violation on users.email");
        }
        if users.iter().any(|u| u.username == new.username) {
            anyhow::bail!("unique constraint violation on users.username");
        }
        let user = User {
            id: self
                .next_id
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst),
            email: new.email.clone(),
            username: new.username.clone(),
            hashed_password: new.hashed_password.clone(),
            is_active: true,
            role: new.role,
            created_at: time::OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<Option<User>> {
        let mut users = self.inner.lock().unwrap();
        // Same constraints as on insert, minus the row being updated
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                anyhow::bail!("unique constraint violation on users.email");
            }
        }
        if let Some(username) = &changes.username {
            if users.iter().any(|u| u.id != id && &u.username == username) {
                anyhow::bail!("unique constraint violation on users.username");
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(hash) = &changes.hashed_password {
            user.hashed_password = hash.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<Option<User>> {
        let mut users = self.inner.lock().unwrap();
        let pos = users.iter().position(|u| u.id == id);
        Ok(pos.map(|i| users.remove(i)))
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = self.inner.lock().unwrap();
        Ok(users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::UserRole;

    fn record(email: &str, username: &str) -> NewUserRecord {
        NewUserRecord {
            email: email.into(),
            username: username.into(),
            hashed_password: "hash".into(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn in_memory_create_enforces_uniqueness() {
        let store = InMemoryUsers::new();
        store.create(&record("a@x.com", "alice")).await.expect("create");

        let err = store.create(&record("a@x.com", "alice2")).await.unwrap_err();
        assert!(err.to_string().contains("users.email"));
        let err = store.create(&record("b@x.com", "alice")).await.unwrap_err();
        assert!(err.to_string().contains("users.username"));
    }

    #[tokio::test]
    async fn in_memory_update_enforces_uniqueness() {
        let store = InMemoryUsers::new();
        let alice = store.create(&record("a@x.com", "alice")).await.expect("create");
        store.create(&record("b@x.com", "bob")).await.expect("create");

        let err = store
            .update(
                alice.id,
                &UserChanges {
                    email: Some("b@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("users.email"));

        let err = store
            .update(
                alice.id,
                &UserChanges {
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("users.username"));

        // re-submitting your own values is not a collision
        let same = store
            .update(
                alice.id,
                &UserChanges {
                    email: Some("a@x.com".into()),
                    username: Some("alice".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update")
            .expect("row exists");
        assert_eq!(same.email, "a@x.com");
        assert_eq!(same.username, "alice");
    }
}
