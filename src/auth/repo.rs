use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::auth::repo_types::{NewUser, UpdateUser, User};
use crate::calculations::{self, model::Calculation};

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, username, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.email)
        .bind(new.username)
        .bind(new.password_hash)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        update: &UpdateUser,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   email      = COALESCE($4, email),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, first_name, last_name, email, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.email.as_deref())
        .fetch_optional(db)
        .await
        .context("update user profile")?;
        Ok(user)
    }

    /// Delete a user; owned calculations go with it (ON DELETE CASCADE).
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    /// The user's owned calculations, oldest first.
    pub async fn calculations(db: &PgPool, id: Uuid) -> anyhow::Result<Vec<Calculation>> {
        calculations::repo::list_all_by_user(db, id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::calculations::repo as calc_repo;

    pub(crate) async fn insert_user(db: &PgPool, username: &str) -> User {
        let email = format!("{username}@example.com");
        User::create(
            db,
            NewUser {
                first_name: "John",
                last_name: "Doe",
                email: &email,
                username,
                password_hash: "hashedpassword123",
            },
        )
        .await
        .expect("insert user")
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a running postgres (DATABASE_URL)"]
    async fn create_and_find_user(db: PgPool) {
        let created = insert_user(&db, "johndoe").await;

        let by_name = User::find_by_username(&db, "johndoe").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.email, "johndoe@example.com");
        assert_eq!(by_name.first_name, "John");
        assert_eq!(by_name.last_name, "Doe");

        let by_email = User::find_by_email(&db, "johndoe@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert!(User::calculations(&db, created.id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a running postgres (DATABASE_URL)"]
    async fn duplicate_username_is_rejected(db: PgPool) {
        insert_user(&db, "dupe").await;
        let again = User::create(
            &db,
            NewUser {
                first_name: "A",
                last_name: "B",
                email: "other@example.com",
                username: "dupe",
                password_hash: "x",
            },
        )
        .await;
        assert!(again.is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a running postgres (DATABASE_URL)"]
    async fn update_profile_keeps_calculations(db: PgPool) {
        let user = insert_user(&db, "jane").await;
        let calc = Calculation::create("addition", user.id, vec![1.0, 2.0]).unwrap();
        calc_repo::insert(&db, &calc).await.unwrap();

        let update = UpdateUser {
            first_name: Some("Jane".into()),
            last_name: Some("Smith".into()),
            email: Some("jane.smith@example.com".into()),
        };
        let updated = User::update_profile(&db, user.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Jane");
        assert_eq!(updated.last_name, "Smith");
        assert_eq!(updated.email, "jane.smith@example.com");
        assert_eq!(updated.username, "jane");
        assert_eq!(User::calculations(&db, user.id).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a running postgres (DATABASE_URL)"]
    async fn deleting_user_cascades_to_calculations(db: PgPool) {
        let user = insert_user(&db, "cascade").await;
        let add = calc_repo::insert(
            &db,
            &Calculation::create("addition", user.id, vec![5.0, 5.0]).unwrap(),
        )
        .await
        .unwrap();
        let sub = calc_repo::insert(
            &db,
            &Calculation::create("subtraction", user.id, vec![15.0, 5.0]).unwrap(),
        )
        .await
        .unwrap();

        assert!(User::delete(&db, user.id).await.unwrap());
        assert!(User::find_by_id(&db, user.id).await.unwrap().is_none());
        assert!(calc_repo::get_by_id(&db, add.id).await.unwrap().is_none());
        assert!(calc_repo::get_by_id(&db, sub.id).await.unwrap().is_none());
        assert!(!User::delete(&db, user.id).await.unwrap());
    }
}
