//! Provider roster operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Department, DutyStatus, Provider};

const PROVIDER_COLUMNS: &str =
    "provider_id, name, department, duty_status, is_backup, max_daily, current_load";

impl Database {
    /// Insert or replace a provider record.
    pub fn upsert_provider(&self, provider: &Provider) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO providers (
                provider_id, name, department, duty_status, is_backup, max_daily, current_load
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(provider_id) DO UPDATE SET
                name = excluded.name,
                department = excluded.department,
                duty_status = excluded.duty_status,
                is_backup = excluded.is_backup,
                max_daily = excluded.max_daily,
                current_load = excluded.current_load,
                updated_at = datetime('now')
            "#,
            params![
                provider.id,
                provider.name,
                provider.department.as_str(),
                provider.duty_status.as_str(),
                provider.is_backup,
                provider.max_daily,
                provider.current_load,
            ],
        )?;
        Ok(())
    }

    /// Update load and duty status. Fails with `NotFound` for unknown ids.
    pub fn update_provider_load(
        &self,
        provider_id: &str,
        current_load: u32,
        duty_status: DutyStatus,
    ) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE providers SET
                current_load = ?2,
                duty_status = ?3,
                updated_at = datetime('now')
            WHERE provider_id = ?1
            "#,
            params![provider_id, current_load, duty_status.as_str()],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("provider {}", provider_id)));
        }
        Ok(())
    }

    pub fn get_provider(&self, provider_id: &str) -> DbResult<Option<Provider>> {
        let sql = format!("SELECT {} FROM providers WHERE provider_id = ?", PROVIDER_COLUMNS);
        self.conn
            .query_row(&sql, [provider_id], ProviderRow::from_row)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// List providers, optionally restricted to one department.
    pub fn list_providers(&self, department: Option<Department>) -> DbResult<Vec<Provider>> {
        let rows = match department {
            Some(department) => {
                let sql = format!(
                    "SELECT {} FROM providers WHERE department = ? ORDER BY provider_id",
                    PROVIDER_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([department.as_str()], ProviderRow::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM providers ORDER BY provider_id", PROVIDER_COLUMNS);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], ProviderRow::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Intermediate row struct for database mapping.
struct ProviderRow {
    provider_id: String,
    name: String,
    department: String,
    duty_status: String,
    is_backup: bool,
    max_daily: u32,
    current_load: u32,
}

impl ProviderRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            provider_id: row.get(0)?,
            name: row.get(1)?,
            department: row.get(2)?,
            duty_status: row.get(3)?,
            is_backup: row.get(4)?,
            max_daily: row.get(5)?,
            current_load: row.get(6)?,
        })
    }
}

impl TryFrom<ProviderRow> for Provider {
    type Error = DbError;

    fn try_from(row: ProviderRow) -> Result<Self, Self::Error> {
        Ok(Provider {
            id: row.provider_id,
            name: row.name,
            department: row.department.parse().map_err(DbError::Constraint)?,
            duty_status: row.duty_status.parse().map_err(DbError::Constraint)?,
            is_backup: row.is_backup,
            max_daily: row.max_daily,
            current_load: row.current_load,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get_provider() {
        let db = Database::open_in_memory().unwrap();
        let provider = Provider::backup("doc_4", "Dr. James Wilson", Department::EmergencyDepartment, 15);
        db.upsert_provider(&provider).unwrap();

        let loaded = db.get_provider("doc_4").unwrap().unwrap();
        assert_eq!(loaded, provider);
        assert!(db.get_provider("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_load() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_provider(&Provider::new("doc_1", "Dr. One", Department::UrgentCare, 2))
            .unwrap();

        db.update_provider_load("doc_1", 2, DutyStatus::Busy).unwrap();
        let loaded = db.get_provider("doc_1").unwrap().unwrap();
        assert_eq!(loaded.current_load, 2);
        assert_eq!(loaded.duty_status, DutyStatus::Busy);

        let missing = db.update_provider_load("nobody", 1, DutyStatus::Available);
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_list_by_department() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_provider(&Provider::new("a", "Dr. A", Department::UrgentCare, 10)).unwrap();
        db.upsert_provider(&Provider::new("b", "Dr. B", Department::GeneralPractice, 10)).unwrap();

        assert_eq!(db.list_providers(Some(Department::UrgentCare)).unwrap().len(), 1);
        assert_eq!(db.list_providers(None).unwrap().len(), 2);
    }
}
