//! Company, user and blacklist queries.

use visitgate_core::db::unix_timestamp;

use super::db::{AccessDatabase, DatabaseError};
use super::models::{BlacklistEntry, Company, User, UserRole, normalize_email};

/// Parameters for adding a blacklist entry.
pub struct BlacklistParams<'a> {
    pub id: &'a str,
    pub company_id: &'a str,
    pub email: &'a str,
    pub reason: Option<&'a str>,
    pub created_by: Option<&'a str>,
}

impl AccessDatabase {
    // =========================================================================
    // Company queries
    // =========================================================================

    /// Create a new company.
    pub async fn create_company(&self, id: &str, name: &str) -> Result<Company, DatabaseError> {
        sqlx::query("INSERT INTO companies (id, name, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        self.get_company(id).await
    }

    /// Get a company by ID.
    pub async fn get_company(&self, id: &str) -> Result<Company, DatabaseError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Company {id}")))
    }

    /// List companies by name.
    pub async fn list_companies(&self) -> Result<Vec<Company>, DatabaseError> {
        let companies =
            sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY name ASC, id ASC")
                .fetch_all(self.pool())
                .await?;

        Ok(companies)
    }

    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a user inside a company.
    pub async fn create_user(
        &self,
        id: &str,
        company_id: &str,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<User, DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, company_id, name, email, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(company_id)
        .bind(name)
        .bind(normalize_email(email))
        .bind(role.as_str())
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_user(company_id, id).await
    }

    /// Get a user by ID within a company.
    pub async fn get_user(&self, company_id: &str, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE company_id = ? AND id = ?")
            .bind(company_id)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// List the users of a company.
    pub async fn list_users(&self, company_id: &str) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE company_id = ? ORDER BY name ASC, id ASC",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Blacklist queries
    // =========================================================================

    /// Add an email to a company's blacklist.
    pub async fn add_blacklist_entry(
        &self,
        params: &BlacklistParams<'_>,
    ) -> Result<BlacklistEntry, DatabaseError> {
        let email = normalize_email(params.email);

        sqlx::query(
            "INSERT INTO blacklist (id, company_id, email, reason, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.company_id)
        .bind(&email)
        .bind(params.reason)
        .bind(params.created_by)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, BlacklistEntry>("SELECT * FROM blacklist WHERE id = ?")
            .bind(params.id)
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    /// List a company's blacklist, newest first.
    pub async fn list_blacklist(
        &self,
        company_id: &str,
    ) -> Result<Vec<BlacklistEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, BlacklistEntry>(
            "SELECT * FROM blacklist WHERE company_id = ? ORDER BY created_at DESC, email ASC",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Remove an email from a company's blacklist.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn remove_blacklist_entry(
        &self,
        company_id: &str,
        email: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM blacklist WHERE company_id = ? AND email = ?")
            .bind(company_id)
            .bind(normalize_email(email))
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether an email is blacklisted by a company.
    pub async fn is_blacklisted(
        &self,
        email: &str,
        company_id: &str,
    ) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM blacklist WHERE company_id = ? AND email = ?")
                .bind(company_id)
                .bind(normalize_email(email))
                .fetch_optional(self.pool())
                .await?;

        Ok(row.is_some())
    }
}
