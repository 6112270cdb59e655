//! SQLite-backed equipment store

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{EquipmentRecord, EquipmentStore, NewEquipment, ProjectAggregate, StoreError};
use crate::equipment::EquipmentFields;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        equipment_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS equipment (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id),
        equipment_type TEXT NOT NULL,
        tag_number TEXT NOT NULL,
        job_number TEXT NOT NULL,
        title TEXT NOT NULL,
        size TEXT NOT NULL DEFAULT '',
        material TEXT NOT NULL DEFAULT '',
        design_code TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        progress INTEGER NOT NULL DEFAULT 0,
        progress_phase TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_equipment_project ON equipment(project_id)",
];

/// Equipment store over a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the tables exist
    pub async fn connect(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its single connection
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", url))?;

        let store = SqliteStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Fresh in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .context("Failed to create schema")?;
        }
        Ok(())
    }

    /// Create a project and return its id
    pub async fn create_project(&self, name: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO projects (id, name, equipment_count, created_at) VALUES (?, ?, 0, ?)")
            .bind(&id)
            .bind(name)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create project '{}'", name))?;
        Ok(id)
    }

    /// Stored aggregate equipment count of a project
    pub async fn project_equipment_count(&self, project_id: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT equipment_count FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read project")?;

        match row {
            Some(row) => Ok(Some(row.try_get("equipment_count")?)),
            None => Ok(None),
        }
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connectivity(err.to_string()),
        other => StoreError::Operation(other.to_string()),
    }
}

fn record_from_row(row: &SqliteRow) -> Result<EquipmentRecord, sqlx::Error> {
    Ok(EquipmentRecord {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        fields: EquipmentFields {
            equipment_type: row.try_get("equipment_type")?,
            tag_number: row.try_get("tag_number")?,
            job_number: row.try_get("job_number")?,
            title: row.try_get("title")?,
            size: row.try_get("size")?,
            material: row.try_get("material")?,
            design_code: row.try_get("design_code")?,
        },
        status: row.try_get("status")?,
        progress: row.try_get("progress")?,
        progress_phase: row.try_get("progress_phase")?,
    })
}

#[async_trait]
impl EquipmentStore for SqliteStore {
    async fn query_by_project(&self, project_id: &str) -> Result<Vec<EquipmentRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, equipment_type, tag_number, job_number, title,
                   size, material, design_code, status, progress, progress_phase
            FROM equipment
            WHERE project_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_error)
    }

    async fn create(&self, equipment: &NewEquipment) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let fields = &equipment.fields;

        sqlx::query(
            r#"
            INSERT INTO equipment (
                id, project_id, equipment_type, tag_number, job_number, title,
                size, material, design_code, status, progress, progress_phase, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&equipment.project_id)
        .bind(&fields.equipment_type)
        .bind(&fields.tag_number)
        .bind(&fields.job_number)
        .bind(&fields.title)
        .bind(&fields.size)
        .bind(&fields.material)
        .bind(&fields.design_code)
        .bind(&equipment.status)
        .bind(equipment.progress)
        .bind(&equipment.progress_phase)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(id)
    }

    async fn update(
        &self,
        project_id: &str,
        id: &str,
        fields: &EquipmentFields,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE equipment
            SET equipment_type = ?, tag_number = ?, job_number = ?, title = ?,
                size = ?, material = ?, design_code = ?
            WHERE id = ? AND project_id = ?
            "#,
        )
        .bind(&fields.equipment_type)
        .bind(&fields.tag_number)
        .bind(&fields.job_number)
        .bind(&fields.title)
        .bind(&fields.size)
        .bind(&fields.material)
        .bind(&fields.design_code)
        .bind(id)
        .bind(project_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update_project_aggregate(
        &self,
        project_id: &str,
        aggregate: ProjectAggregate,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE projects SET equipment_count = ? WHERE id = ?")
            .bind(aggregate.equipment_count as i64)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(project_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(tag: &str) -> EquipmentFields {
        EquipmentFields {
            equipment_type: "Pressure Vessel".into(),
            tag_number: tag.into(),
            job_number: "JOB-1".into(),
            title: "Vessel".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_query_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let project = store.create_project("Plant A").await.unwrap();

        let id = store
            .create(&NewEquipment::pending(&project, fields("PV-1")))
            .await
            .unwrap();
        assert_eq!(id.len(), 36);

        let rows = store.query_by_project(&project).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].fields.tag_number, "PV-1");
        assert_eq!(rows[0].status, "pending");
        assert_eq!(rows[0].progress_phase, "documentation");
    }

    #[tokio::test]
    async fn test_update_and_aggregate() {
        let store = SqliteStore::in_memory().await.unwrap();
        let project = store.create_project("Plant B").await.unwrap();
        let id = store
            .create(&NewEquipment::pending(&project, fields("PV-1")))
            .await
            .unwrap();

        store.update(&project, &id, &fields("PV-9")).await.unwrap();
        let rows = store.query_by_project(&project).await.unwrap();
        assert_eq!(rows[0].fields.tag_number, "PV-9");

        let missing = store.update(&project, "missing", &fields("X")).await.unwrap_err();
        assert_eq!(missing, StoreError::NotFound("missing".into()));

        store
            .update_project_aggregate(&project, ProjectAggregate { equipment_count: 1 })
            .await
            .unwrap();
        assert_eq!(store.project_equipment_count(&project).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_update_never_crosses_projects() {
        let store = SqliteStore::in_memory().await.unwrap();
        let plant_a = store.create_project("Plant A").await.unwrap();
        let plant_b = store.create_project("Plant B").await.unwrap();
        let id = store
            .create(&NewEquipment::pending(&plant_b, fields("PV-1")))
            .await
            .unwrap();

        let err = store.update(&plant_a, &id, &fields("HIJACKED")).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(id.clone()));

        let rows = store.query_by_project(&plant_b).await.unwrap();
        assert_eq!(rows[0].fields.tag_number, "PV-1");
    }

    #[tokio::test]
    async fn test_create_for_unknown_project_is_operation_error() {
        let store = SqliteStore::in_memory().await.unwrap();
        let err = store
            .create(&NewEquipment::pending("no-such-project", fields("PV-1")))
            .await
            .unwrap_err();
        assert!(!err.is_connectivity());
    }
}
