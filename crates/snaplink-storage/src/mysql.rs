use async_trait::async_trait;
use jiff::Timestamp;
use snaplink_core::repository::{ReadRepository, Repository, Result};
use snaplink_core::{
    ClickEvent, ClickHistory, OwnerId, PasswordDigest, ShortCode, StorageError, UrlEntity,
    UrlPatch, HISTORY_CAPACITY,
};
use sqlx::mysql::{MySqlArguments, MySqlPoolOptions, MySqlRow};
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

/// Schema of the `short_urls` table, safe to run repeatedly.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

const SELECT_COLUMNS: &str = r#"
    SELECT short_code, long_url, title, description, owner_id,
           created_at, updated_at, expires_at, is_active, is_public,
           password_hash, click_count, click_history, tags, version
    FROM short_urls
"#;

/// Bounds the optimistic read-modify-write loop used for edits.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct RetryPolicy {
    #[builder(default = 16)]
    pub max_attempts: u32,
    /// Sleep between attempts, multiplied by the attempt number.
    #[builder(default = Duration::from_millis(2))]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// MySQL implementation of the repository contract.
///
/// Rows carry a `version` column. Edits read the row, apply the patch in
/// memory and write back only if the version and owner are unchanged,
/// retrying under [`RetryPolicy`]. Clicks are a single in-place `UPDATE`
/// that never touches the version, so they neither retry nor disturb edits.
/// Deletes are hard deletes so a freed code can be taken again.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a repository by opening a new MySQL connection pool.
    ///
    /// `acquire_timeout` bounds how long any single operation waits for a
    /// connection before failing with [`StorageError::Timeout`].
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_versioned(&self, code: &ShortCode) -> Result<Option<(UrlEntity, u64)>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE short_code = ? LIMIT 1"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn fetch_many(&self, query: MySqlQuery<'_>) -> Result<Vec<UrlEntity>> {
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| decode_row(row).map(|(entity, _)| entity))
            .collect()
    }

    /// Applies `patch` to the current row and writes the editable columns
    /// back, guarded by the row version and by `expected_owner`. Returns
    /// `None` if the code does not exist or is held by another owner.
    async fn patch_versioned(
        &self,
        code: &ShortCode,
        expected_owner: Option<&OwnerId>,
        patch: &UrlPatch,
    ) -> Result<Option<UrlEntity>> {
        let owner = expected_owner.map(OwnerId::as_str);

        for attempt in 1..=self.retry.max_attempts {
            let Some((mut entity, version)) = self.fetch_versioned(code).await? else {
                return Ok(None);
            };
            if entity.owner_id.as_ref() != expected_owner {
                return Ok(None);
            }

            entity.apply_patch(patch.clone());

            let result = sqlx::query(
                r#"
                UPDATE short_urls
                SET long_url = ?, title = ?, description = ?, updated_at = ?,
                    expires_at = ?, is_active = ?, is_public = ?, password_hash = ?,
                    tags = ?, version = version + 1
                WHERE short_code = ?
                  AND version = ?
                  AND owner_id <=> ?
                "#,
            )
            .bind(&entity.long_url)
            .bind(&entity.title)
            .bind(&entity.description)
            .bind(entity.updated_at.as_microsecond())
            .bind(entity.expires_at.map(|ts| ts.as_microsecond()))
            .bind(entity.is_active)
            .bind(entity.is_public)
            .bind(entity.password.as_ref().map(PasswordDigest::as_str))
            .bind(Json(&entity.tags))
            .bind(code.as_str())
            .bind(version)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() == 1 {
                return Ok(Some(entity));
            }

            debug!(code = %code, attempt, "version changed under write, retrying");
            tokio::time::sleep(self.retry.backoff * attempt).await;
        }

        warn!(code = %code, attempts = self.retry.max_attempts, "giving up on contended row");
        Err(StorageError::Contention(format!(
            "{code}: row changed on each of {} attempts",
            self.retry.max_attempts
        )))
    }
}

fn micros_to_timestamp(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

fn decode_row(row: &MySqlRow) -> Result<(UrlEntity, u64)> {
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let owner_id: Option<String> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let password_hash: Option<String> = row.try_get("password_hash").map_err(map_sqlx_error)?;
    let Json(click_history): Json<ClickHistory> =
        row.try_get("click_history").map_err(map_sqlx_error)?;
    let Json(tags): Json<BTreeSet<String>> = row.try_get("tags").map_err(map_sqlx_error)?;
    let version: u64 = row.try_get("version").map_err(map_sqlx_error)?;

    let password = password_hash
        .map(PasswordDigest::from_phc)
        .transpose()
        .map_err(|e| StorageError::InvalidData(format!("{code}: {e}")))?;

    let entity = UrlEntity {
        code: ShortCode::new_unchecked(code),
        long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
        title: row.try_get("title").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        owner_id: owner_id.map(OwnerId::from),
        created_at: micros_to_timestamp("created_at", created_at)?,
        updated_at: micros_to_timestamp("updated_at", updated_at)?,
        expires_at: expires_at
            .map(|value| micros_to_timestamp("expires_at", value))
            .transpose()?,
        is_active: row.try_get("is_active").map_err(map_sqlx_error)?,
        is_public: row.try_get("is_public").map_err(map_sqlx_error)?,
        password,
        click_count: row.try_get("click_count").map_err(map_sqlx_error)?,
        click_history,
        tags,
    };

    Ok((entity, version))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlEntity>> {
        Ok(self.fetch_versioned(code).await?.map(|(entity, _)| entity))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn list_public(&self, limit: usize) -> Result<Vec<UrlEntity>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE is_public = TRUE AND is_active = TRUE \
             ORDER BY created_at DESC, short_code ASC LIMIT ?"
        );
        let limit = u64::try_from(limit).unwrap_or(u64::MAX);
        self.fetch_many(sqlx::query(&sql).bind(limit)).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UrlEntity>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE owner_id = ? ORDER BY created_at DESC, short_code ASC"
        );
        self.fetch_many(sqlx::query(&sql).bind(owner.as_str())).await
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, entity: UrlEntity) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (
                short_code, long_url, title, description, owner_id,
                created_at, updated_at, expires_at, is_active, is_public,
                password_hash, click_count, click_history, tags, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(entity.code.as_str())
        .bind(&entity.long_url)
        .bind(&entity.title)
        .bind(&entity.description)
        .bind(entity.owner_id.as_ref().map(OwnerId::as_str))
        .bind(entity.created_at.as_microsecond())
        .bind(entity.updated_at.as_microsecond())
        .bind(entity.expires_at.map(|ts| ts.as_microsecond()))
        .bind(entity.is_active)
        .bind(entity.is_public)
        .bind(entity.password.as_ref().map(PasswordDigest::as_str))
        .bind(entity.click_count)
        .bind(Json(&entity.click_history))
        .bind(Json(&entity.tags))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(entity.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn apply_patch(
        &self,
        code: &ShortCode,
        expected_owner: Option<&OwnerId>,
        patch: UrlPatch,
    ) -> Result<Option<UrlEntity>> {
        self.patch_versioned(code, expected_owner, &patch).await
    }

    async fn record_click(&self, code: &ShortCode, event: ClickEvent) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // the row lock held by this UPDATE serializes concurrent clicks
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET click_count = click_count + 1,
                click_history = JSON_ARRAY_APPEND(
                    IF(JSON_LENGTH(click_history) >= ?,
                       JSON_REMOVE(click_history, '$[0]'),
                       click_history),
                    '$', CAST(? AS JSON))
            WHERE short_code = ?
            "#,
        )
        .bind(HISTORY_CAPACITY as u64)
        .bind(Json(&event))
        .bind(code.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let count: u64 = sqlx::query_scalar(
            r#"
            SELECT click_count
            FROM short_urls
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(count))
    }

    async fn delete(&self, code: &ShortCode, expected_owner: Option<&OwnerId>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE short_code = ?
              AND owner_id <=> ?
            "#,
        )
        .bind(code.as_str())
        .bind(expected_owner.map(OwnerId::as_str))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
