//! Visit queries.

use visitgate_core::db::unix_timestamp;

use super::db::{AccessDatabase, DatabaseError};
use super::models::{Visit, VisitStatus};

impl AccessDatabase {
    /// Get a visit by ID within a company.
    pub async fn get_visit(&self, company_id: &str, id: &str) -> Result<Visit, DatabaseError> {
        sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE company_id = ? AND id = ?")
            .bind(company_id)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Visit {id}")))
    }

    /// List a company's visits, newest first, optionally by status.
    pub async fn list_visits(
        &self,
        company_id: &str,
        status: Option<VisitStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Visit>, DatabaseError> {
        let visits = if let Some(status) = status {
            sqlx::query_as::<_, Visit>(
                "SELECT * FROM visits WHERE company_id = ? AND status = ? \
                 ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            )
            .bind(company_id)
            .bind(status.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Visit>(
                "SELECT * FROM visits WHERE company_id = ? \
                 ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            )
            .bind(company_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        };

        Ok(visits)
    }

    /// Record a host decision on a pending visit.
    ///
    /// Returns `false` if the visit is not pending (or does not exist).
    pub async fn decide_visit(
        &self,
        company_id: &str,
        id: &str,
        decision: VisitStatus,
        decided_by: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE visits SET status = ?, decided_at = ?, decided_by = ? \
             WHERE company_id = ? AND id = ? AND status = 'pending'",
        )
        .bind(decision.as_str())
        .bind(unix_timestamp())
        .bind(decided_by)
        .bind(company_id)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
