//! Project aggregate persistence.
//!
//! All functions take a `&PgPool` and operate on the `projects` table.
//! Each row holds one whole aggregate as a JSONB document. Lifecycle rules
//! are enforced by the engine, not in SQL; the only database-side guard is
//! the version check that keeps an older snapshot from overwriting a newer
//! one when two writers race.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use cofund_core::ProjectId;
use cofund_engine::ProjectAggregate;

fn encode_document(aggregate: &ProjectAggregate) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(aggregate).map_err(|e| {
        tracing::error!(project = %aggregate.project.id, error = %e, "failed to serialize project aggregate");
        sqlx::Error::Encode(Box::new(e))
    })
}

fn encode_version(version: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(version).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Insert or replace a project's aggregate.
///
/// Returns `false` when the stored row already carries the same or a newer
/// version, in which case nothing is written.
pub async fn upsert(pool: &PgPool, aggregate: &ProjectAggregate) -> Result<bool, sqlx::Error> {
    let document = encode_document(aggregate)?;
    let version = encode_version(aggregate.version)?;

    let result = sqlx::query(
        "INSERT INTO projects (id, owner_id, state, version, document, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (id) DO UPDATE
            SET owner_id = EXCLUDED.owner_id,
                state = EXCLUDED.state,
                version = EXCLUDED.version,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
          WHERE projects.version < EXCLUDED.version",
    )
    .bind(aggregate.project.id.0)
    .bind(aggregate.project.owner.0)
    .bind(aggregate.project.state.to_string())
    .bind(version)
    .bind(&document)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let written = result.rows_affected() > 0;
    if !written {
        tracing::debug!(
            project = %aggregate.project.id,
            version = aggregate.version,
            "stored project is newer, skipping write"
        );
    }
    Ok(written)
}

/// Delete a project row. Returns `true` if a row was removed.
pub async fn delete(pool: &PgPool, id: ProjectId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all project aggregates (for startup hydration).
///
/// A row whose document no longer decodes is a hard error: silently
/// skipping it would let the next write of a fresh project with the same
/// id lose data.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ProjectAggregate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, version, document FROM projects ORDER BY updated_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ProjectRow::into_aggregate).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    version: i64,
    document: serde_json::Value,
}

impl ProjectRow {
    fn into_aggregate(self) -> Result<ProjectAggregate, sqlx::Error> {
        let mut aggregate: ProjectAggregate =
            serde_json::from_value(self.document).map_err(|e| {
                tracing::error!(id = %self.id, error = %e, "undecodable project document in database");
                sqlx::Error::Decode(Box::new(e))
            })?;
        if aggregate.project.id.0 != self.id {
            tracing::error!(id = %self.id, document_id = %aggregate.project.id, "project row id does not match its document");
            return Err(sqlx::Error::Decode(
                format!("project row {} holds document for {}", self.id, aggregate.project.id).into(),
            ));
        }
        aggregate.version = u64::try_from(self.version).unwrap_or_default();
        Ok(aggregate)
    }
}
