use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;

use crate::api::pagination::{like_pattern, Page};
use crate::db::id::RecordId;
use crate::db::models::{Role, UserRow};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, location, bio, skills, \
                            resume_url, created_at, updated_at";

/// Fields needed to insert an account; the password is already hashed
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Self-service profile changes; `None` leaves the column untouched
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub resume_url: Option<String>,
}

/// Repository for User database operations
pub struct UserRepository;

impl UserRepository {
    pub async fn create(pool: &Pool<Postgres>, user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
        debug!("Creating user: email={}, role={:?}", user.email, user.role);

        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(RecordId::generate())
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(pool)
            .await?;

        debug!("User created with id={}", row.id);
        Ok(row)
    }

    pub async fn find_by_id(pool: &Pool<Postgres>, id: &RecordId) -> Result<Option<UserRow>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql).bind(id).fetch_optional(pool).await
    }

    pub async fn find_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql).bind(email).fetch_optional(pool).await
    }

    pub async fn update_profile(
        pool: &Pool<Postgres>,
        id: &RecordId,
        changes: &ProfileChanges,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        debug!("Updating profile for user id={}", id);

        let sql = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                phone = COALESCE($3, phone), \
                location = COALESCE($4, location), \
                bio = COALESCE($5, bio), \
                skills = COALESCE($6, skills), \
                resume_url = COALESCE($7, resume_url), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.phone.as_deref())
            .bind(changes.location.as_deref())
            .bind(changes.bio.as_deref())
            .bind(changes.skills.as_ref())
            .bind(changes.resume_url.as_deref())
            .fetch_optional(pool)
            .await
    }

    pub async fn update_role(
        pool: &Pool<Postgres>,
        id: &RecordId,
        role: Role,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        debug!("Setting role of user id={} to {:?}", id, role);

        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Newest accounts first, optionally narrowed by a name/email substring
    pub async fn list(
        pool: &Pool<Postgres>,
        search: Option<&str>,
        page: Page,
    ) -> Result<(Vec<UserRow>, i64), sqlx::Error> {
        fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
            if let Some(term) = search {
                let pattern = like_pattern(term);
                qb.push(" WHERE (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filter(&mut select, search);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = select.build_query_as::<UserRow>().fetch_all(pool).await?;

        Ok((users, total))
    }

    /// Delete a non-admin account together with its applications
    ///
    /// Runs in one transaction: every job the account applied to has its
    /// `application_count` reduced by the number of applications removed.
    /// Returns `false` if no non-admin account with this id exists.
    pub async fn delete_with_applications(pool: &Pool<Postgres>, id: &RecordId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed = sqlx::query(
            r#"
            WITH removed AS (
                DELETE FROM applications WHERE applicant_id = $1 RETURNING job_id
            ), per_job AS (
                SELECT job_id, COUNT(*)::INT AS n FROM removed GROUP BY job_id
            )
            UPDATE jobs
            SET application_count = GREATEST(jobs.application_count - per_job.n, 0)
            FROM per_job
            WHERE jobs.id = per_job.job_id
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        debug!("Adjusted counters on {} jobs for user id={}", removed.rows_affected(), id);

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1 AND role = 'user'")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn count_by_role(pool: &Pool<Postgres>, role: Role) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await
    }

    pub async fn count(pool: &Pool<Postgres>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{account, apply, counts, posting};

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_a_user_removes_applications_and_adjusts_counters(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let ada = account(&pool, "Ada", Role::User).await;
        let alan = account(&pool, "Alan", Role::User).await;
        let rust = posting(&pool, &admin, "Rust Engineer").await;
        let go = posting(&pool, &admin, "Go Engineer").await;

        apply(&pool, &rust, &ada).await;
        apply(&pool, &go, &ada).await;
        apply(&pool, &rust, &alan).await;

        assert!(UserRepository::delete_with_applications(&pool, &ada.id).await.unwrap());

        assert!(UserRepository::find_by_id(&pool, &ada.id).await.unwrap().is_none());
        assert_eq!(counts(&pool, &rust.id).await, (1, 1));
        assert_eq!(counts(&pool, &go.id).await, (0, 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn admins_survive_delete(pool: Pool<Postgres>) {
        let admin = account(&pool, "Boss", Role::Admin).await;
        let other = account(&pool, "Deputy", Role::Admin).await;
        let job = posting(&pool, &admin, "Rust Engineer").await;
        apply(&pool, &job, &other).await;

        assert!(!UserRepository::delete_with_applications(&pool, &other.id).await.unwrap());

        // Rolled back: the account and its application are untouched
        assert!(UserRepository::find_by_id(&pool, &other.id).await.unwrap().is_some());
        assert_eq!(counts(&pool, &job.id).await, (1, 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn email_lookup_ignores_case(pool: Pool<Postgres>) {
        let ada = account(&pool, "Ada", Role::User).await;

        let found = UserRepository::find_by_email(&pool, "ADA@Example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ada.id));
    }
}
