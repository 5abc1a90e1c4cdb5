//! Process-step and quality-grade reference data service

use sqlx::SqlitePool;

use shared::{ProcessStep, QualityGrade};

use crate::error::{AppError, AppResult};

/// Reference data service
#[derive(Clone)]
pub struct ReferenceService {
    db: SqlitePool,
}

impl ReferenceService {
    /// Create a new ReferenceService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Process steps in pipeline order
    pub async fn list_process_steps(&self) -> AppResult<Vec<ProcessStep>> {
        let rows = sqlx::query_as::<_, (String, String, i64, String)>(
            "SELECT process_code, process_name, process_level, accuracy_type \
             FROM process_steps ORDER BY process_level",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProcessStep {
                process_code: r.0,
                process_name: r.1,
                process_level: r.2,
                accuracy_type: r.3,
            })
            .collect())
    }

    /// Get a process step by its single-letter code
    pub async fn get_process_step(&self, process_code: &str) -> AppResult<ProcessStep> {
        let row = sqlx::query_as::<_, (String, String, i64, String)>(
            "SELECT process_code, process_name, process_level, accuracy_type \
             FROM process_steps WHERE process_code = ?1",
        )
        .bind(process_code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Process step '{}'", process_code)))?;

        Ok(ProcessStep {
            process_code: row.0,
            process_name: row.1,
            process_level: row.2,
            accuracy_type: row.3,
        })
    }

    /// Quality grades ordered by code
    pub async fn list_quality_grades(&self) -> AppResult<Vec<QualityGrade>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT grade_code, grade_name, processing_rule \
             FROM quality_grades ORDER BY grade_code",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| QualityGrade {
                grade_code: r.0,
                grade_name: r.1,
                processing_rule: r.2,
            })
            .collect())
    }
}
