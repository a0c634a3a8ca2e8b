use crate::{ProfileStore, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::BTreeSet;
use teammatch_types::{ExternalUserId, Profile, ProfileId};
use tracing::info;

const SELECT_PROFILE: &str = r#"
    SELECT
        id, external_user_id, name, skills, past_projects, bio,
        looking_for_skills, project_idea, location,
        matches, rejections, pending_outgoing,
        created_at, updated_at
    FROM profiles
"#;

/// Profile store backed by SQLite
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    /// Open (or create) the database file and run migrations
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePool::connect(&database_url).await?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("Profile store initialized with database: {}", database_path);
        Ok(store)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                external_user_id INTEGER UNIQUE NOT NULL,
                name TEXT NOT NULL,
                skills TEXT NOT NULL,
                past_projects TEXT NOT NULL,
                bio TEXT NOT NULL,
                looking_for_skills TEXT NOT NULL,
                project_idea TEXT,
                location TEXT,
                matches TEXT NOT NULL,
                rejections TEXT NOT NULL,
                pending_outgoing TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    async fn write_row(tx: &mut Transaction<'_, Sqlite>, profile: &Profile) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                external_user_id = ?, name = ?, skills = ?, past_projects = ?, bio = ?,
                looking_for_skills = ?, project_idea = ?, location = ?,
                matches = ?, rejections = ?, pending_outgoing = ?,
                created_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.external_user_id)
        .bind(&profile.name)
        .bind(serde_json::to_string(&profile.skills)?)
        .bind(serde_json::to_string(&profile.past_projects)?)
        .bind(&profile.bio)
        .bind(serde_json::to_string(&profile.looking_for_skills)?)
        .bind(&profile.project_idea)
        .bind(&profile.location)
        .bind(serde_json::to_string(&profile.matches)?)
        .bind(serde_json::to_string(&profile.rejections)?)
        .bind(serde_json::to_string(&profile.pending_outgoing)?)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .bind(profile.id.to_string())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(profile.id));
        }
        Ok(())
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn decode_time(row: &SqliteRow, column: &str, id: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            details: format!("{}: {}", column, e),
        })
}

fn decode_profile(row: &SqliteRow) -> Result<Profile> {
    let raw_id: String = row.try_get("id")?;
    let id: ProfileId = raw_id.parse().map_err(|e| StoreError::Corrupt {
        id: raw_id.clone(),
        details: format!("id: {}", e),
    })?;

    Ok(Profile {
        id,
        external_user_id: row.try_get("external_user_id")?,
        name: row.try_get("name")?,
        skills: decode_json(row, "skills")?,
        past_projects: decode_json(row, "past_projects")?,
        bio: row.try_get("bio")?,
        looking_for_skills: decode_json(row, "looking_for_skills")?,
        project_idea: row.try_get("project_idea")?,
        location: row.try_get("location")?,
        matches: decode_json::<BTreeSet<ProfileId>>(row, "matches")?,
        rejections: decode_json::<BTreeSet<ProfileId>>(row, "rejections")?,
        pending_outgoing: decode_json::<BTreeSet<ProfileId>>(row, "pending_outgoing")?,
        created_at: decode_time(row, "created_at", &raw_id)?,
        updated_at: decode_time(row, "updated_at", &raw_id)?,
    })
}

/// Map a unique-constraint violation onto the matching duplicate error
fn classify_insert_error(err: sqlx::Error, profile: &Profile) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return if db.message().contains("external_user_id") {
                StoreError::DuplicateUser(profile.external_user_id)
            } else {
                StoreError::DuplicateProfile(profile.id)
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn find_by_user_id(&self, user_id: ExternalUserId) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!("{} WHERE external_user_id = ?", SELECT_PROFILE))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_profile).transpose()
    }

    async fn find_by_id(&self, id: ProfileId) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PROFILE))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_profile).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(&format!("{} ORDER BY seq ASC", SELECT_PROFILE))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_profile).collect()
    }

    async fn create(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, external_user_id, name, skills, past_projects, bio,
                looking_for_skills, project_idea, location,
                matches, rejections, pending_outgoing,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id.to_string())
        .bind(profile.external_user_id)
        .bind(&profile.name)
        .bind(serde_json::to_string(&profile.skills)?)
        .bind(serde_json::to_string(&profile.past_projects)?)
        .bind(&profile.bio)
        .bind(serde_json::to_string(&profile.looking_for_skills)?)
        .bind(&profile.project_idea)
        .bind(&profile.location)
        .bind(serde_json::to_string(&profile.matches)?)
        .bind(serde_json::to_string(&profile.rejections)?)
        .bind(serde_json::to_string(&profile.pending_outgoing)?)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, profile))?;

        Ok(())
    }

    async fn update(&self, profile: &Profile) -> Result<()> {
        self.update_all(std::slice::from_ref(profile)).await
    }

    async fn update_all(&self, profiles: &[Profile]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for profile in profiles {
            // Dropping the transaction on error rolls it back
            Self::write_row(&mut tx, profile).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn exists(&self, id: ProfileId) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM profiles WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }
}

