use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use avitolog_types::models::DEFAULT_HEADER_TITLE;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE ads (
                id            TEXT PRIMARY KEY,
                source_url    TEXT NOT NULL UNIQUE,
                title         TEXT,
                image_url     TEXT,
                published_at  TEXT,
                category      TEXT NOT NULL,
                category_key  TEXT NOT NULL,
                view_count    INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            );

            CREATE INDEX idx_ads_category ON ads(category_key);

            -- ad_id is not a foreign key: ads may live in the in-memory store
            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                ad_id       TEXT NOT NULL,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_ad ON comments(ad_id, created_at);

            CREATE TABLE site_settings (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                header_title  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        conn.execute(
            "INSERT INTO site_settings (header_title) VALUES (?1)",
            [DEFAULT_HEADER_TITLE],
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
