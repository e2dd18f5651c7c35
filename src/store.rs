//! SQLite persistence for articles and post records.
//!
//! The store owns the two durable contracts the pipeline relies on:
//!
//! 1. The `UNIQUE (external_id, source_id)` constraint on articles, which
//!    makes [`Store::get_or_create_article`] the dedup point for ingestion
//!    (first-write-wins; an existing row is never overwritten).
//! 2. Transactional post-record + flag writes: a publisher's post record
//!    insert and the article's `posted_to_*` flag update commit together.
//!
//! Post records are the idempotency source of truth; the article flags are a
//! derived cache. Deleting a post record (an administrative action) goes
//! through [`Store::delete_facebook_post`] / [`Store::delete_instagram_post`],
//! which recompute the flag from the remaining record count in the same
//! transaction.
//!
//! The connection sits behind a mutex so publish jobs spawned on the runtime
//! can share one handle; every call locks, runs synchronously, and releases
//! before any await point.

use crate::models::{Article, CandidateArticle, FacebookPost, InstagramPost};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        init(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-call; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the candidate if its `(external_id, source)` key is new.
    ///
    /// Returns the stored row plus whether this call created it. Concurrent
    /// callers with the same key race on the unique constraint; the loser
    /// observes `created = false` and gets the winner's row unchanged.
    pub fn get_or_create_article(
        &self,
        source_id: i64,
        candidate: &CandidateArticle,
    ) -> Result<(Article, bool)> {
        let conn = self.conn();
        let affected = conn.execute(
            "INSERT OR IGNORE INTO articles
             (external_id, source_id, url, title, post_date, image, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                candidate.external_id,
                source_id,
                candidate.url,
                candidate.title,
                candidate.post_date,
                candidate.image,
                candidate.body,
            ],
        )?;
        let created = affected > 0;

        let article = conn.query_row(
            &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE external_id = ?1 AND source_id = ?2"),
            params![candidate.external_id, source_id],
            map_article,
        )?;

        if created {
            debug!(article_id = article.id, external_id = %article.external_id, "article created");
        }
        Ok((article, created))
    }

    pub fn article(&self, id: i64) -> Result<Article> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
            [id],
            map_article,
        )
        .with_context(|| format!("article {id} not found"))
    }

    /// Articles dated `date` that have not been posted to either platform.
    /// This is the sweeper's eligibility set.
    pub fn unposted_for_date(&self, date: NaiveDate) -> Result<Vec<Article>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles
             WHERE post_date = ?1
               AND posted_to_facebook = 0
               AND posted_to_instagram = 0
             ORDER BY id"
        ))?;
        let rows = stmt.query_map([date], map_article)?;

        let mut articles = Vec::new();
        for article in rows {
            articles.push(article?);
        }
        Ok(articles)
    }

    /// Record a successful Facebook publish: insert the post record and set
    /// the article's flag in one transaction.
    pub fn record_facebook_post(
        &self,
        article_id: i64,
        page_id: i64,
        remote_post_id: Option<&str>,
    ) -> Result<FacebookPost> {
        let posted_at = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO facebook_posts (article_id, page_id, posted_at, remote_post_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![article_id, page_id, posted_at, remote_post_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE articles SET posted_to_facebook = 1 WHERE id = ?1",
            [article_id],
        )?;
        tx.commit()?;

        Ok(FacebookPost {
            id,
            article_id,
            page_id,
            posted_at: Some(posted_at),
            remote_post_id: remote_post_id.map(str::to_string),
        })
    }

    /// Record a successful Instagram publish; same transactional shape as
    /// [`Store::record_facebook_post`].
    pub fn record_instagram_post(
        &self,
        article_id: i64,
        profile_id: i64,
        remote_post_id: Option<&str>,
    ) -> Result<InstagramPost> {
        let posted_at = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO instagram_posts (article_id, profile_id, posted_at, remote_post_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![article_id, profile_id, posted_at, remote_post_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE articles SET posted_to_instagram = 1 WHERE id = ?1",
            [article_id],
        )?;
        tx.commit()?;

        Ok(InstagramPost {
            id,
            article_id,
            profile_id,
            posted_at: Some(posted_at),
            remote_post_id: remote_post_id.map(str::to_string),
        })
    }

    pub fn facebook_post(&self, id: i64) -> Result<Option<FacebookPost>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, article_id, page_id, posted_at, remote_post_id
             FROM facebook_posts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([id], map_facebook_post)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn instagram_post(&self, id: i64) -> Result<Option<InstagramPost>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, article_id, profile_id, posted_at, remote_post_id
             FROM instagram_posts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([id], map_instagram_post)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Delete a Facebook post record and reconcile the article flag.
    ///
    /// The flag is recomputed from the remaining record count, not blindly
    /// cleared: deleting one of two records leaves `posted_to_facebook`
    /// true. Returns the deleted record so the caller can attempt remote
    /// cleanup, or `None` if the id does not exist.
    pub fn delete_facebook_post(&self, id: i64) -> Result<Option<FacebookPost>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let post = {
            let mut stmt = tx.prepare(
                "SELECT id, article_id, page_id, posted_at, remote_post_id
                 FROM facebook_posts WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map([id], map_facebook_post)?;
            match rows.next().transpose()? {
                Some(post) => post,
                None => return Ok(None),
            }
        };
        tx.execute("DELETE FROM facebook_posts WHERE id = ?1", [id])?;
        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM facebook_posts WHERE article_id = ?1",
            [post.article_id],
            |row| row.get(0),
        )?;
        if remaining == 0 {
            tx.execute(
                "UPDATE articles SET posted_to_facebook = 0 WHERE id = ?1",
                [post.article_id],
            )?;
        }
        tx.commit()?;
        debug!(post_id = id, article_id = post.article_id, remaining, "facebook post record deleted");
        Ok(Some(post))
    }

    /// Instagram counterpart of [`Store::delete_facebook_post`].
    pub fn delete_instagram_post(&self, id: i64) -> Result<Option<InstagramPost>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let post = {
            let mut stmt = tx.prepare(
                "SELECT id, article_id, profile_id, posted_at, remote_post_id
                 FROM instagram_posts WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map([id], map_instagram_post)?;
            match rows.next().transpose()? {
                Some(post) => post,
                None => return Ok(None),
            }
        };
        tx.execute("DELETE FROM instagram_posts WHERE id = ?1", [id])?;
        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM instagram_posts WHERE article_id = ?1",
            [post.article_id],
            |row| row.get(0),
        )?;
        if remaining == 0 {
            tx.execute(
                "UPDATE articles SET posted_to_instagram = 0 WHERE id = ?1",
                [post.article_id],
            )?;
        }
        tx.commit()?;
        debug!(post_id = id, article_id = post.article_id, remaining, "instagram post record deleted");
        Ok(Some(post))
    }
}

const ARTICLE_COLUMNS: &str = "id, source_id, external_id, url, title, post_date, image, body, \
                               posted_to_facebook, posted_to_instagram";

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL,
            source_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            post_date TEXT NOT NULL,
            image TEXT NOT NULL,
            body TEXT NOT NULL,
            posted_to_facebook INTEGER NOT NULL DEFAULT 0,
            posted_to_instagram INTEGER NOT NULL DEFAULT 0,
            UNIQUE (external_id, source_id)
        );

        CREATE INDEX IF NOT EXISTS idx_articles_post_date
            ON articles (post_date);

        CREATE TABLE IF NOT EXISTS facebook_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_id INTEGER NOT NULL REFERENCES articles (id),
            page_id INTEGER NOT NULL,
            posted_at TEXT,
            remote_post_id TEXT,
            UNIQUE (article_id, page_id)
        );

        CREATE TABLE IF NOT EXISTS instagram_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_id INTEGER NOT NULL REFERENCES articles (id),
            profile_id INTEGER NOT NULL,
            posted_at TEXT,
            remote_post_id TEXT,
            UNIQUE (article_id, profile_id)
        );
        ",
    )?;
    Ok(())
}

fn map_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        source_id: row.get(1)?,
        external_id: row.get(2)?,
        url: row.get(3)?,
        title: row.get(4)?,
        post_date: row.get(5)?,
        image: row.get(6)?,
        body: row.get(7)?,
        posted_to_facebook: row.get(8)?,
        posted_to_instagram: row.get(9)?,
    })
}

fn map_facebook_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<FacebookPost> {
    Ok(FacebookPost {
        id: row.get(0)?,
        article_id: row.get(1)?,
        page_id: row.get(2)?,
        posted_at: row.get(3)?,
        remote_post_id: row.get(4)?,
    })
}

fn map_instagram_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<InstagramPost> {
    Ok(InstagramPost {
        id: row.get(0)?,
        article_id: row.get(1)?,
        profile_id: row.get(2)?,
        posted_at: row.get(3)?,
        remote_post_id: row.get(4)?,
    })
}
