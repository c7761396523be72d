use crate::models::{CommentRow, UserRow};
use crate::{Database, format_ts, now, parse_ts};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    /// Insert a user. Returns `false` if the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(username) DO NOTHING",
                (id, username, password_hash, format_ts(&now())),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, ad_id: &str, author_id: &str, text: &str) -> Result<CommentRow> {
        self.with_conn(|conn| {
            let created_at = now();
            conn.execute(
                "INSERT INTO comments (id, ad_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, ad_id, author_id, text, format_ts(&created_at)),
            )?;

            let author_username: String =
                conn.query_row("SELECT username FROM users WHERE id = ?1", [author_id], |row| row.get(0))?;

            Ok(CommentRow {
                id: id.to_string(),
                ad_id: ad_id.to_string(),
                author_id: author_id.to_string(),
                author_username,
                text: text.to_string(),
                created_at,
            })
        })
    }

    /// Comments for an ad, oldest first.
    pub fn get_comments(&self, ad_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, ad_id))
    }

    // -- Settings --

    pub fn get_header_title(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let title = conn
                .query_row("SELECT header_title FROM site_settings ORDER BY id LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(title)
        })
    }

    /// Overwrite the header title on the first settings row, creating it if
    /// the table is empty.
    pub fn set_header_title(&self, title: &str) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE site_settings SET header_title = ?1
                 WHERE id = (SELECT id FROM site_settings ORDER BY id LIMIT 1)",
                [title],
            )?;
            if updated == 0 {
                conn.execute("INSERT INTO site_settings (header_title) VALUES (?1)", [title])?;
            }
            Ok(())
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: parse_ts(3, &row.get::<_, String>(3)?)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_comments(conn: &Connection, ad_id: &str) -> Result<Vec<CommentRow>> {
    // JOIN users to fetch the author's username in a single query
    let mut stmt = conn.prepare(
        "SELECT c.id, c.ad_id, c.author_id, u.username, c.text, c.created_at
         FROM comments c
         LEFT JOIN users u ON c.author_id = u.id
         WHERE c.ad_id = ?1
         ORDER BY c.created_at ASC, c.rowid ASC",
    )?;

    let rows = stmt
        .query_map([ad_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                ad_id: row.get(1)?,
                author_id: row.get(2)?,
                author_username: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "unknown".to_string()),
                text: row.get(4)?,
                created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("u1", "alice", "hash").unwrap());
        db
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = db_with_user();
        assert!(!db.create_user("u2", "alice", "other").unwrap());

        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.password, "hash");
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn comments_are_listed_oldest_first() {
        let db = db_with_user();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            db.insert_comment(&format!("c{i}"), "ad-1", "u1", text).unwrap();
        }
        db.insert_comment("other", "ad-2", "u1", "elsewhere").unwrap();

        let comments = db.get_comments("ad-1").unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(comments.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(comments[0].author_username, "alice");
    }

    #[test]
    fn comment_insert_returns_stored_row() {
        let db = db_with_user();
        let inserted = db.insert_comment("c1", "ad-1", "u1", "hello").unwrap();
        let listed = db.get_comments("ad-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, inserted.created_at);
        assert_eq!(listed[0].author_username, inserted.author_username);
    }

    #[test]
    fn header_title_is_seeded_and_updatable() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_header_title().unwrap().as_deref(), Some("Авитолог"));

        db.set_header_title("Доска").unwrap();
        assert_eq!(db.get_header_title().unwrap().as_deref(), Some("Доска"));

        db.with_conn(|conn| {
            conn.execute("DELETE FROM site_settings", [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.get_header_title().unwrap(), None);

        db.set_header_title("Снова").unwrap();
        assert_eq!(db.get_header_title().unwrap().as_deref(), Some("Снова"));
    }
}
