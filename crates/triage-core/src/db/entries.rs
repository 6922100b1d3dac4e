//! Queue entry operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{CaseStatus, Department, QueueEntry};

const ENTRY_COLUMNS: &str = "case_id, patient_id, department, queue_date, slot, risk_tier, \
     priority_score, status, queue_position, provider_id, original_slot, intake_fingerprint, \
     created_at, updated_at, assigned_on";

impl Database {
    /// Insert or update a queue entry keyed by case id.
    pub fn upsert_entry(&self, entry: &QueueEntry) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO queue_entries (
                case_id, patient_id, department, queue_date, slot, risk_tier,
                priority_score, status, queue_position, provider_id, original_slot,
                intake_fingerprint, created_at, updated_at, assigned_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(case_id) DO UPDATE SET
                department = excluded.department,
                queue_date = excluded.queue_date,
                slot = excluded.slot,
                risk_tier = excluded.risk_tier,
                priority_score = excluded.priority_score,
                status = excluded.status,
                queue_position = excluded.queue_position,
                provider_id = excluded.provider_id,
                assigned_on = excluded.assigned_on,
                original_slot = excluded.original_slot,
                updated_at = excluded.updated_at
            "#,
            params![
                entry.case_id,
                entry.patient_id,
                entry.department.as_str(),
                entry.date.to_string(),
                entry.slot,
                entry.risk_tier.as_str(),
                entry.priority_score,
                entry.status.as_str(),
                entry.queue_position,
                entry.provider_id,
                entry.original_slot,
                entry.intake_fingerprint,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
                entry.assigned_on.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn get_entry(&self, case_id: &str) -> DbResult<Option<QueueEntry>> {
        let sql = format!("SELECT {} FROM queue_entries WHERE case_id = ?", ENTRY_COLUMNS);
        self.conn
            .query_row(&sql, [case_id], EntryRow::from_row)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Entries of one (department, date) partition with one of `statuses`.
    pub fn list_partition_entries(
        &self,
        department: Department,
        date: NaiveDate,
        statuses: &[CaseStatus],
    ) -> DbResult<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE department = ?1 AND queue_date = ?2 \
             ORDER BY created_at",
            ENTRY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![department.as_str(), date.to_string()],
            EntryRow::from_row,
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let entry: QueueEntry = row?.try_into()?;
            if statuses.contains(&entry.status) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Every entry of a patient on a date, any status.
    pub fn list_patient_entries(&self, patient_id: &str, date: NaiveDate) -> DbResult<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE patient_id = ?1 AND queue_date = ?2 \
             ORDER BY created_at",
            ENTRY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![patient_id, date.to_string()], EntryRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }
}

/// Intermediate row struct for database mapping.
struct EntryRow {
    case_id: String,
    patient_id: String,
    department: String,
    queue_date: String,
    slot: String,
    risk_tier: String,
    priority_score: u32,
    status: String,
    queue_position: Option<u32>,
    provider_id: Option<String>,
    original_slot: Option<String>,
    intake_fingerprint: Option<String>,
    created_at: String,
    updated_at: String,
    assigned_on: Option<String>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            patient_id: row.get(1)?,
            department: row.get(2)?,
            queue_date: row.get(3)?,
            slot: row.get(4)?,
            risk_tier: row.get(5)?,
            priority_score: row.get(6)?,
            status: row.get(7)?,
            queue_position: row.get(8)?,
            provider_id: row.get(9)?,
            original_slot: row.get(10)?,
            intake_fingerprint: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            assigned_on: row.get(14)?,
        })
    }
}

impl TryFrom<EntryRow> for QueueEntry {
    type Error = DbError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(QueueEntry {
            case_id: row.case_id,
            patient_id: row.patient_id,
            department: row.department.parse().map_err(DbError::Constraint)?,
            date: parse_date(&row.queue_date)?,
            slot: row.slot,
            risk_tier: row.risk_tier.parse().map_err(DbError::Constraint)?,
            priority_score: row.priority_score,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            status: row.status.parse().map_err(DbError::Constraint)?,
            queue_position: row.queue_position,
            provider_id: row.provider_id,
            assigned_on: row.assigned_on.as_deref().map(parse_date).transpose()?,
            original_slot: row.original_slot,
            intake_fingerprint: row.intake_fingerprint,
        })
    }
}

fn parse_date(s: &str) -> DbResult<NaiveDate> {
    s.parse()
        .map_err(|e| DbError::Constraint(format!("Bad queue date {}: {}", s, e)))
}

fn parse_timestamp(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Constraint(format!("Bad timestamp {}: {}", s, e)))
}
