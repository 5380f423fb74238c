//! Postgres registration store.
//!
//! Every mutation runs in a transaction that first takes a row lock with
//! `SELECT ... FOR UPDATE`, applies the `fest-state` transition in memory,
//! writes the row back and commits. Concurrent scans or approvals of the
//! same record queue on the row lock. Unique and CHECK constraints in the
//! schema back up the application-level rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use fest_core::{Credential, EmailAddress, RegistrationId, RollNumber, Timestamp};
use fest_state::{
    admit, ApprovalStatus, CooldownPolicy, EntryDecision, LifecycleError, Registration,
    RejectOutcome,
};

use super::{AdminRecord, EntryOutcome, RegistrationRepository, RepositoryError};

const SELECT_COLUMNS: &str = "SELECT id, name, roll_number, branch, email, phone, \
     id_card_reference, status, credential, last_entry_at, entry_count, reviewed_at, \
     created_at, updated_at FROM registrations";

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_by_id(
        tx: &mut Transaction<'_, Postgres>,
        id: RegistrationId,
    ) -> Result<Option<Registration>, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(RegistrationRow::into_registration).transpose()
    }

    async fn write_back(
        tx: &mut Transaction<'_, Postgres>,
        reg: &Registration,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE registrations SET status = $1, credential = $2, last_entry_at = $3, \
             entry_count = $4, reviewed_at = $5, updated_at = $6 WHERE id = $7",
        )
        .bind(reg.status.as_str())
        .bind(reg.credential.as_ref().map(Credential::as_str))
        .bind(reg.last_entry_at.map(|t| *t.as_datetime()))
        .bind(entry_count_to_db(reg.entry_count)?)
        .bind(reg.reviewed_at.map(|t| *t.as_datetime()))
        .bind(*reg.updated_at.as_datetime())
        .bind(reg.id.0)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn entry_count_to_db(count: u32) -> Result<i32, RepositoryError> {
    i32::try_from(count).map_err(|_| RepositoryError::Corrupt(format!("entry_count {count} overflows")))
}

/// Map unique violations to `Duplicate`, naming the column.
fn map_insert_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("registrations_email_key") => RepositoryError::Duplicate { field: "email" },
                _ => RepositoryError::Duplicate {
                    field: "roll_number",
                },
            };
        }
    }
    RepositoryError::Storage(err)
}

#[async_trait]
impl RegistrationRepository for PgRepository {
    async fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError> {
        sqlx::query(
            "INSERT INTO registrations (id, name, roll_number, branch, email, phone, \
             id_card_reference, status, credential, last_entry_at, entry_count, reviewed_at, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(registration.id.0)
        .bind(&registration.name)
        .bind(registration.roll_number.as_str())
        .bind(&registration.branch)
        .bind(registration.email.as_str())
        .bind(&registration.phone)
        .bind(&registration.id_card_reference)
        .bind(registration.status.as_str())
        .bind(registration.credential.as_ref().map(Credential::as_str))
        .bind(registration.last_entry_at.map(|t| *t.as_datetime()))
        .bind(entry_count_to_db(registration.entry_count)?)
        .bind(registration.reviewed_at.map(|t| *t.as_datetime()))
        .bind(*registration.created_at.as_datetime())
        .bind(*registration.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(registration)
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RegistrationRow::into_registration).transpose()
    }

    async fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(RegistrationRow::into_registration)
            .collect()
    }

    async fn approve(
        &self,
        id: RegistrationId,
        credential: Credential,
        now: Timestamp,
    ) -> Result<Registration, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut reg = Self::lock_by_id(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        reg.approve(credential, now).map_err(|e| match e {
            LifecycleError::AlreadyApproved { id } => RepositoryError::AlreadyApproved(id),
            other => RepositoryError::Corrupt(other.to_string()),
        })?;
        Self::write_back(&mut tx, &reg).await?;
        tx.commit().await?;
        Ok(reg)
    }

    async fn reject(
        &self,
        id: RegistrationId,
        now: Timestamp,
    ) -> Result<(Registration, RejectOutcome), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut reg = Self::lock_by_id(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        let outcome = reg.reject(now);
        if outcome.changed() {
            Self::write_back(&mut tx, &reg).await?;
        }
        tx.commit().await?;
        Ok((reg, outcome))
    }

    async fn record_entry(
        &self,
        roll_number: &RollNumber,
        now: Timestamp,
        policy: &CooldownPolicy,
    ) -> Result<EntryOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "{SELECT_COLUMNS} WHERE roll_number = $1 FOR UPDATE"
        ))
        .bind(roll_number.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(EntryOutcome {
                decision: EntryDecision::NotFound {
                    code: roll_number.to_string(),
                },
                registration: None,
            });
        };

        let mut reg = row.into_registration()?;
        let decision = admit(&mut reg, now, policy);
        if decision.is_accepted() {
            Self::write_back(&mut tx, &reg).await?;
        }
        tx.commit().await?;
        Ok(EntryOutcome {
            decision,
            registration: Some(reg),
        })
    }

    async fn admin(&self) -> Result<Option<AdminRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT email, password_hash, created_at FROM admin_credentials WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(AdminRow::into_record).transpose()
    }

    async fn provision_admin(&self, record: AdminRecord) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO admin_credentials (id, email, password_hash, created_at) \
             VALUES (1, $1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.email.as_str())
        .bind(&record.password_hash)
        .bind(*record.created_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    name: String,
    roll_number: String,
    branch: String,
    email: String,
    phone: String,
    id_card_reference: String,
    status: String,
    credential: Option<String>,
    last_entry_at: Option<DateTime<Utc>>,
    entry_count: i32,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RegistrationRow {
    fn into_registration(self) -> Result<Registration, RepositoryError> {
        let corrupt = |what: String| RepositoryError::Corrupt(format!("registration {}: {what}", self.id));
        let status = ApprovalStatus::parse(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status {:?}", self.status)))?;
        let roll_number = RollNumber::new(&self.roll_number).map_err(|e| corrupt(e.to_string()))?;
        let email = EmailAddress::new(&self.email).map_err(|e| corrupt(e.to_string()))?;
        let credential = self
            .credential
            .as_deref()
            .map(Credential::new)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let entry_count = u32::try_from(self.entry_count)
            .map_err(|_| corrupt(format!("negative entry_count {}", self.entry_count)))?;

        let reg = Registration {
            id: RegistrationId::from(self.id),
            name: self.name,
            roll_number,
            branch: self.branch,
            email,
            phone: self.phone,
            id_card_reference: self.id_card_reference,
            status,
            credential,
            last_entry_at: self.last_entry_at.map(Timestamp::from),
            entry_count,
            reviewed_at: self.reviewed_at.map(Timestamp::from),
            created_at: Timestamp::from(self.created_at),
            updated_at: Timestamp::from(self.updated_at),
        };
        reg.check_invariants()
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        Ok(reg)
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl AdminRow {
    fn into_record(self) -> Result<AdminRecord, RepositoryError> {
        Ok(AdminRecord {
            email: EmailAddress::new(&self.email)
                .map_err(|e| RepositoryError::Corrupt(format!("admin email: {e}")))?,
            password_hash: self.password_hash,
            created_at: Timestamp::from(self.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RegistrationRow {
        let now = Utc::now();
        RegistrationRow {
            id: Uuid::new_v4(),
            name: "Asha Rao".into(),
            roll_number: "CS101".into(),
            branch: "CSE".into(),
            email: "asha@college.edu".into(),
            phone: "9876543210".into(),
            id_card_reference: "uploads/asha.png".into(),
            status: "PENDING".into(),
            credential: None,
            last_entry_at: None,
            entry_count: 0,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_row_converts() {
        let reg = row().into_registration().unwrap();
        assert_eq!(reg.status, ApprovalStatus::Pending);
        assert_eq!(reg.roll_number.as_str(), "CS101");
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let mut r = row();
        r.status = "ARCHIVED".into();
        assert!(matches!(r.into_registration(), Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn approved_without_credential_is_corrupt() {
        let mut r = row();
        r.status = "APPROVED".into();
        assert!(matches!(r.into_registration(), Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn negative_entry_count_is_corrupt() {
        let mut r = row();
        r.entry_count = -1;
        assert!(matches!(r.into_registration(), Err(RepositoryError::Corrupt(_))));
    }
}
