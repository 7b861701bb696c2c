use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::dto::FullName;
use crate::auth::google::GoogleProfile;
use crate::auth::repo_types::User;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, google_id, role,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, google_id, role,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a locally-registered user with a hashed password.
    pub async fn create_local(
        db: &PgPool,
        email: &str,
        fullname: &FullName,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, password_hash, google_id, role,
                      created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(&fullname.first_name)
        .bind(&fullname.last_name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Reconcile a Google identity with the local store: return the matching
    /// record if one exists, otherwise create one. The boolean reports
    /// whether a record was created, so the caller can decide to emit the
    /// registration event.
    ///
    /// When the asserted google id and email match different rows, the
    /// google id match wins. Matched records are returned unchanged.
    pub async fn find_or_create_from_google(
        db: &PgPool,
        profile: &GoogleProfile,
    ) -> anyhow::Result<(User, bool)> {
        let existing = match &profile.email {
            Some(email) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, email, first_name, last_name, password_hash, google_id, role,
                           created_at, updated_at
                    FROM users
                    WHERE google_id = $1 OR email = $2
                    ORDER BY (google_id = $1) DESC NULLS LAST
                    LIMIT 1
                    "#,
                )
                .bind(&profile.id)
                .bind(email)
                .fetch_optional(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, email, first_name, last_name, password_hash, google_id, role,
                           created_at, updated_at
                    FROM users
                    WHERE google_id = $1
                    "#,
                )
                .bind(&profile.id)
                .fetch_optional(db)
                .await?
            }
        };

        if let Some(user) = existing {
            return Ok((user, false));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (google_id, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, password_hash, google_id, role,
                      created_at, updated_at
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(profile.given_name.as_deref().unwrap_or_default())
        .bind(profile.family_name.as_deref().unwrap_or_default())
        .fetch_one(db)
        .await?;
        Ok((user, true))
    }
}
