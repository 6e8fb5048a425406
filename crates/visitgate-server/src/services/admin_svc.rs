//! Tenant administration: companies, users, blacklist and visit decisions.

use serde::Deserialize;
use tracing::{info, instrument};

use super::access_svc::checked_email;
use crate::error::AccessError;
use crate::storage::{
    AccessDatabase, BlacklistEntry, BlacklistParams, Company, User, UserRole, Visit, VisitStatus,
};

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlacklistEntry {
    pub email: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Deny,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitDecision {
    pub decision: Decision,
    #[serde(default)]
    pub decided_by: Option<String>,
}

/// Filters for listing visits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub struct AdminService {
    db: AccessDatabase,
}

impl AdminService {
    pub const fn new(db: AccessDatabase) -> Self {
        Self { db }
    }

    // =========================================================================
    // Companies
    // =========================================================================

    #[instrument(skip(self, req))]
    pub async fn create_company(&self, req: &NewCompany) -> Result<Company, AccessError> {
        let name = non_empty("company name", &req.name)?;
        let id = uuid::Uuid::new_v4().to_string();
        let company = self.db.create_company(&id, name).await?;
        info!(company_id = %company.id, "Company created");
        Ok(company)
    }

    pub async fn get_company(&self, company_id: &str) -> Result<Company, AccessError> {
        Ok(self.db.get_company(company_id).await?)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, AccessError> {
        Ok(self.db.list_companies().await?)
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[instrument(skip(self, req))]
    pub async fn create_user(&self, company_id: &str, req: &NewUser) -> Result<User, AccessError> {
        self.db.get_company(company_id).await?;

        let name = non_empty("user name", &req.name)?;
        let email = checked_email(&req.email)?;
        let role: UserRole = req.role.trim().parse().map_err(AccessError::InvalidInput)?;
        let id = uuid::Uuid::new_v4().to_string();

        let user = self
            .db
            .create_user(&id, company_id, name, &email, role)
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::Conflict(_) => {
                    AccessError::Conflict(format!("user {email} already exists"))
                }
                other => other,
            })?;
        info!(user_id = %user.id, role = %role, "User created");
        Ok(user)
    }

    pub async fn list_users(&self, company_id: &str) -> Result<Vec<User>, AccessError> {
        self.db.get_company(company_id).await?;
        Ok(self.db.list_users(company_id).await?)
    }

    // =========================================================================
    // Blacklist
    // =========================================================================

    #[instrument(skip(self, req))]
    pub async fn add_blacklist_entry(
        &self,
        company_id: &str,
        req: &NewBlacklistEntry,
    ) -> Result<BlacklistEntry, AccessError> {
        self.db.get_company(company_id).await?;

        let email = checked_email(&req.email)?;
        if let Some(created_by) = req.created_by.as_deref() {
            self.db.get_user(company_id, created_by).await?;
        }
        let id = uuid::Uuid::new_v4().to_string();

        let entry = self
            .db
            .add_blacklist_entry(&BlacklistParams {
                id: &id,
                company_id,
                email: &email,
                reason: req.reason.as_deref(),
                created_by: req.created_by.as_deref(),
            })
            .await
            .map_err(|e| match AccessError::from(e) {
                AccessError::Conflict(_) => {
                    AccessError::Conflict(format!("{email} is already blacklisted"))
                }
                other => other,
            })?;
        info!(entry_id = %entry.id, "Blacklist entry added");
        Ok(entry)
    }

    pub async fn list_blacklist(
        &self,
        company_id: &str,
    ) -> Result<Vec<BlacklistEntry>, AccessError> {
        self.db.get_company(company_id).await?;
        Ok(self.db.list_blacklist(company_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_blacklist_entry(
        &self,
        company_id: &str,
        email: &str,
    ) -> Result<(), AccessError> {
        if self.db.remove_blacklist_entry(company_id, email).await? {
            info!("Blacklist entry removed");
            Ok(())
        } else {
            Err(AccessError::NotFound(format!("Blacklist entry {email}")))
        }
    }

    // =========================================================================
    // Visits
    // =========================================================================

    pub async fn list_visits(
        &self,
        company_id: &str,
        filter: &VisitFilter,
    ) -> Result<Vec<Visit>, AccessError> {
        let status = filter
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<VisitStatus>)
            .transpose()
            .map_err(AccessError::InvalidInput)?;
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
        let offset = filter.offset.unwrap_or(0).max(0);

        Ok(self.db.list_visits(company_id, status, limit, offset).await?)
    }

    /// Approve or deny a pending visit. Decided visits stay as they are.
    #[instrument(skip(self, req))]
    pub async fn decide_visit(
        &self,
        company_id: &str,
        visit_id: &str,
        req: &VisitDecision,
    ) -> Result<Visit, AccessError> {
        if let Some(decided_by) = req.decided_by.as_deref() {
            self.db.get_user(company_id, decided_by).await?;
        }
        let status = match req.decision {
            Decision::Approve => VisitStatus::Approved,
            Decision::Deny => VisitStatus::Denied,
        };

        let decided = self
            .db
            .decide_visit(company_id, visit_id, status, req.decided_by.as_deref())
            .await?;
        let visit = self.db.get_visit(company_id, visit_id).await?;

        if !decided {
            return Err(AccessError::InvalidTransition(format!(
                "visit {visit_id} is already {}",
                visit.status
            )));
        }

        info!(status = %status, "Visit decided");
        Ok(visit)
    }
}

fn non_empty<'a>(what: &str, value: &'a str) -> Result<&'a str, AccessError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccessError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}
