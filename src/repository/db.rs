//! Database Connection and Setup
//!
//! Opens the offline SQLite store and runs its migrations.

use std::path::Path;

use rusqlite::Connection;

/// Open (or create) the database at `db_path`. `:memory:` gives a private
/// in-memory database.
pub fn open_db(db_path: &Path) -> Result<Connection, String> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(db_path)
    }
    .map_err(|e| format!("Failed to open db: {}", e))?;

    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(names) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let found = names.flatten().any(|name| name == column);
    found
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS waypoints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| e.to_string())?;

    // Photos came later
    if !column_exists(conn, "waypoints", "image_url") {
        conn.execute("ALTER TABLE waypoints ADD COLUMN image_url TEXT", [])
            .map_err(|e| format!("Failed to add image_url: {}", e))?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_waypoints_created ON waypoints(created_at)",
        [],
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_rerunnable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.db");

        let conn = open_db(&path).unwrap();
        assert!(column_exists(&conn, "waypoints", "image_url"));
        drop(conn);

        let conn = open_db(&path).unwrap();
        assert!(column_exists(&conn, "waypoints", "image_url"));
        assert!(!column_exists(&conn, "waypoints", "elevation"));
        assert!(!column_exists(&conn, "no_such_table", "id"));
    }
}
