//! SQLite schema definition.

/// Complete database schema for the triage core.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Provider roster
-- ============================================================================

CREATE TABLE IF NOT EXISTS providers (
    provider_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    department TEXT NOT NULL,
    duty_status TEXT NOT NULL DEFAULT 'AVAILABLE',  -- AVAILABLE | ON_CALL | BUSY
    is_backup INTEGER NOT NULL DEFAULT 0,
    max_daily INTEGER NOT NULL,
    current_load INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (current_load >= 0 AND current_load <= max_daily)
);

CREATE INDEX IF NOT EXISTS idx_providers_department ON providers(department);

-- ============================================================================
-- Queue entries (one row per case)
-- ============================================================================

CREATE TABLE IF NOT EXISTS queue_entries (
    case_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL,
    department TEXT NOT NULL,
    queue_date TEXT NOT NULL,                       -- YYYY-MM-DD
    slot TEXT NOT NULL,                             -- e.g. "9:00 AM"
    risk_tier TEXT NOT NULL,
    priority_score INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',          -- pending | in-progress | completed | cancelled
    queue_position INTEGER,
    provider_id TEXT,
    assigned_on TEXT,                               -- business day of the provider unit
    original_slot TEXT,
    intake_fingerprint TEXT,
    created_at TEXT NOT NULL,                       -- RFC 3339
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_partition ON queue_entries(department, queue_date, status);
CREATE INDEX IF NOT EXISTS idx_entries_patient ON queue_entries(patient_id, queue_date);
CREATE INDEX IF NOT EXISTS idx_entries_fingerprint ON queue_entries(intake_fingerprint);
"#;
