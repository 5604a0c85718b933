use crate::models::ad_spend::{AdSpendRecord, AdSpendSource, TestRun};
use crate::models::event::{EventKind, Lead, PageEvent};
use crate::models::metrics::{DateRange, Metrics, MetricsSource};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::fs;
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 3;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 3 {
        apply_migration_3(conn)?;
        version = 3;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("database schema version {version} is newer than {DB_SCHEMA_VERSION}");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS page_events (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('visit', 'pricing_click')),
            visitor_id TEXT NOT NULL,
            occurred_at INTEGER NOT NULL,
            occurred_on TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            email TEXT NOT NULL,
            name TEXT,
            created_at INTEGER NOT NULL,
            created_on TEXT NOT NULL,
            UNIQUE(project_id, email)
        );

        CREATE TABLE IF NOT EXISTS test_runs (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            ad_spend_cents INTEGER,
            impressions INTEGER,
            clicks INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "test_runs", "notes TEXT")
}

fn apply_migration_3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_page_events_project_day ON page_events(project_id, kind, occurred_on);
        CREATE INDEX IF NOT EXISTS idx_leads_project_day ON leads(project_id, created_on);
        CREATE INDEX IF NOT EXISTS idx_test_runs_project_updated ON test_runs(project_id, updated_at);
        ",
    )
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}

pub fn get_db_connection(workspace_path: &str) -> std::result::Result<Connection, String> {
    let dir = Path::new(workspace_path).join(".ideascore");
    fs::create_dir_all(&dir)
        .map_err(|e| format!("DB error: could not create {}: {e}", dir.display()))?;

    let conn = Connection::open(dir.join("state.db")).map_err(|e| format!("DB error: {e}"))?;
    initialize_schema(&conn).map_err(|e| format!("DB error: {e}"))?;
    Ok(conn)
}

/// UTC calendar day of a unix timestamp, as stored in the `*_on` columns.
pub fn calendar_day(timestamp: i64) -> std::result::Result<String, String> {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("INVALID_INPUT: timestamp {timestamp} is out of range"))
}

pub fn insert_page_event(conn: &Connection, event: &PageEvent, occurred_on: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO page_events (id, project_id, kind, visitor_id, occurred_at, occurred_on) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &event.id,
            &event.project_id,
            event.kind.as_str(),
            &event.visitor_id,
            event.occurred_at,
            occurred_on,
        ],
    )?;
    Ok(())
}

/// Returns false when the project already has a lead with this email.
pub fn insert_lead(conn: &Connection, lead: &Lead, created_on: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO leads (id, project_id, email, name, created_at, created_on) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &lead.id,
            &lead.project_id,
            &lead.email,
            lead.name.as_deref(),
            lead.created_at,
            created_on,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn count_metrics(conn: &Connection, project_id: &str, range: Option<&DateRange>) -> Result<Metrics> {
    let start = range.map(|r| r.start.format("%Y-%m-%d").to_string());
    let end = range.map(|r| r.end.format("%Y-%m-%d").to_string());

    let visitors: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT visitor_id) FROM page_events
         WHERE project_id = ?1 AND kind = 'visit'
           AND (?2 IS NULL OR occurred_on >= ?2)
           AND (?3 IS NULL OR occurred_on <= ?3)",
        params![project_id, start, end],
        |row| row.get(0),
    )?;

    let pricing_clicks_total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM page_events
         WHERE project_id = ?1 AND kind = 'pricing_click'
           AND (?2 IS NULL OR occurred_on >= ?2)
           AND (?3 IS NULL OR occurred_on <= ?3)",
        params![project_id, start, end],
        |row| row.get(0),
    )?;

    let leads: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads
         WHERE project_id = ?1
           AND (?2 IS NULL OR created_on >= ?2)
           AND (?3 IS NULL OR created_on <= ?3)",
        params![project_id, start, end],
        |row| row.get(0),
    )?;

    log::debug!(
        "metrics for {project_id}: visitors={visitors} pricing_clicks={pricing_clicks_total} leads={leads}"
    );

    Ok(Metrics {
        visitors,
        pricing_clicks_total,
        leads,
    })
}

const TEST_RUN_COLUMNS: &str =
    "id, project_id, ad_spend_cents, impressions, clicks, notes, created_at, updated_at";

fn test_run_from_row(row: &Row<'_>) -> Result<TestRun> {
    Ok(TestRun {
        id: row.get(0)?,
        project_id: row.get(1)?,
        ad_spend_cents: row.get(2)?,
        impressions: row.get(3)?,
        clicks: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn load_test_run(conn: &Connection, id: &str) -> Result<Option<TestRun>> {
    conn.query_row(
        &format!("SELECT {TEST_RUN_COLUMNS} FROM test_runs WHERE id = ?1"),
        params![id],
        test_run_from_row,
    )
    .optional()
}

/// Most recently updated run for a project; insertion order breaks ties.
pub fn load_latest_test_run(conn: &Connection, project_id: &str) -> Result<Option<TestRun>> {
    conn.query_row(
        &format!(
            "SELECT {TEST_RUN_COLUMNS} FROM test_runs WHERE project_id = ?1 ORDER BY updated_at DESC, rowid DESC LIMIT 1"
        ),
        params![project_id],
        test_run_from_row,
    )
    .optional()
}

pub fn list_test_runs(conn: &Connection, project_id: Option<&str>) -> Result<Vec<TestRun>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEST_RUN_COLUMNS} FROM test_runs WHERE (?1 IS NULL OR project_id = ?1) ORDER BY created_at DESC, rowid DESC"
    ))?;

    let runs = stmt
        .query_map(params![project_id], test_run_from_row)?
        .filter_map(|r| r.ok())
        .collect();

    Ok(runs)
}

impl MetricsSource for Connection {
    fn load_metrics(
        &self,
        project_id: &str,
        range: Option<&DateRange>,
    ) -> std::result::Result<Metrics, String> {
        count_metrics(self, project_id, range).map_err(|e| format!("Metrics query error: {e}"))
    }
}

impl AdSpendSource for Connection {
    fn load_ad_spend(&self, project_id: &str) -> std::result::Result<Option<AdSpendRecord>, String> {
        load_latest_test_run(self, project_id)
            .map(|run| run.map(|r| r.ad_spend()))
            .map_err(|e| format!("Ad spend query error: {e}"))
    }
}

pub async fn record_page_event(
    workspace_path: String,
    project_id: String,
    kind: String,
    visitor_id: String,
    occurred_at: Option<i64>,
) -> std::result::Result<PageEvent, String> {
    if project_id.trim().is_empty() {
        return Err("INVALID_INPUT: project_id is required".to_string());
    }
    if visitor_id.trim().is_empty() {
        return Err("INVALID_INPUT: visitor_id is required".to_string());
    }

    let event = PageEvent {
        id: uuid::Uuid::new_v4().to_string(),
        project_id,
        kind: EventKind::parse(&kind)?,
        visitor_id,
        occurred_at: occurred_at.unwrap_or_else(|| chrono::Utc::now().timestamp()),
    };
    let occurred_on = calendar_day(event.occurred_at)?;

    let conn = get_db_connection(&workspace_path)?;
    insert_page_event(&conn, &event, &occurred_on).map_err(|e| format!("Insert error: {e}"))?;

    log::debug!(
        "recorded {} for project {} on {occurred_on}",
        event.kind.as_str(),
        event.project_id
    );
    Ok(event)
}

pub async fn record_lead(
    workspace_path: String,
    project_id: String,
    email: String,
    name: Option<String>,
) -> std::result::Result<serde_json::Value, String> {
    if project_id.trim().is_empty() {
        return Err("INVALID_INPUT: project_id is required".to_string());
    }
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(format!("INVALID_INPUT: '{email}' is not an email address"));
    }

    let lead = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        project_id,
        email,
        name: name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        created_at: chrono::Utc::now().timestamp(),
    };
    let created_on = calendar_day(lead.created_at)?;

    let conn = get_db_connection(&workspace_path)?;
    let inserted = insert_lead(&conn, &lead, &created_on).map_err(|e| format!("Insert error: {e}"))?;

    if inserted {
        log::info!("new lead for project {}", lead.project_id);
        Ok(serde_json::json!({"status": "created", "id": lead.id}))
    } else {
        Ok(serde_json::json!({"status": "duplicate"}))
    }
}

pub async fn test_run_crud(
    workspace_path: String,
    operation: String,
    item: Option<TestRun>,
    id: Option<String>,
    project_id: Option<String>,
) -> std::result::Result<serde_json::Value, String> {
    let conn = get_db_connection(&workspace_path)?;

    match operation.as_str() {
        "create" => {
            let item = item.ok_or("Item required for create")?;
            item.validate()?;
            let now = chrono::Utc::now().timestamp();
            let id = if item.id.trim().is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                item.id.clone()
            };
            conn.execute(
                "INSERT INTO test_runs (id, project_id, ad_spend_cents, impressions, clicks, notes, created_at, updated_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![&id, &item.project_id, item.ad_spend_cents, item.impressions, item.clicks, item.notes.as_deref(), now, now],
            )
            .map_err(|e| format!("Insert error: {e}"))?;
            log::info!("created test run {id} for project {}", item.project_id);
            Ok(serde_json::json!({"status": "created", "id": id}))
        }
        "update" => {
            let item = item.ok_or("Item required for update")?;
            item.validate()?;
            let now = chrono::Utc::now().timestamp();
            let updated = conn
                .execute(
                    "UPDATE test_runs SET ad_spend_cents=?2, impressions=?3, clicks=?4, notes=?5, updated_at=MAX(?6, updated_at + 1) WHERE id=?1",
                    params![&item.id, item.ad_spend_cents, item.impressions, item.clicks, item.notes.as_deref(), now],
                )
                .map_err(|e| format!("Update error: {e}"))?;
            if updated == 0 {
                return Err(format!("NOT_FOUND: test run {}", item.id));
            }
            Ok(serde_json::json!({"status": "updated", "id": item.id}))
        }
        "read" => {
            let id = id.ok_or("ID required for read")?;
            let item = load_test_run(&conn, &id).map_err(|e| format!("Read error: {e}"))?;
            Ok(serde_json::to_value(item).unwrap_or(serde_json::Value::Null))
        }
        "latest" => {
            let project_id = project_id.ok_or("project_id required for latest")?;
            let item = load_latest_test_run(&conn, &project_id).map_err(|e| format!("Read error: {e}"))?;
            Ok(serde_json::to_value(item).unwrap_or(serde_json::Value::Null))
        }
        "list" => {
            let items = list_test_runs(&conn, project_id.as_deref()).map_err(|e| format!("Query error: {e}"))?;
            Ok(serde_json::to_value(items).unwrap_or_default())
        }
        "delete" => {
            let id = id.ok_or("ID required for delete")?;
            let deleted = conn
                .execute("DELETE FROM test_runs WHERE id = ?1", params![id])
                .map_err(|e| format!("Delete error: {e}"))?;
            if deleted == 0 {
                return Err(format!("NOT_FOUND: test run {id}"));
            }
            Ok(serde_json::json!({"status": "deleted"}))
        }
        _ => Err(format!("Unknown operation: {operation}")),
    }
}
