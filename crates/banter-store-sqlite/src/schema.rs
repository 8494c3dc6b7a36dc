//! SQL schema for the Banter SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per commented-on external object. The unique index on
-- (obj_id, obj_type) backs the conditional insert in get-or-create.
CREATE TABLE IF NOT EXISTS comment_subject (
    id            INTEGER PRIMARY KEY,
    obj_id        INTEGER NOT NULL,
    obj_type      INTEGER NOT NULL,
    member_id     INTEGER NOT NULL,
    comment_count INTEGER NOT NULL DEFAULT 0,
    root_count    INTEGER NOT NULL DEFAULT 0,   -- floor counter for roots
    all_count     INTEGER NOT NULL DEFAULT 0,
    state         INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS comment_subject_obj_idx
    ON comment_subject(obj_id, obj_type);

-- Flat index rows; tree shape is expressed through root/parent
-- back-references (0 = none), never joined recursively.
CREATE TABLE IF NOT EXISTS comment_index (
    id               INTEGER PRIMARY KEY,
    subject_id       INTEGER NOT NULL REFERENCES comment_subject(id),
    obj_id           INTEGER NOT NULL,
    obj_type         INTEGER NOT NULL,
    member_id        INTEGER NOT NULL,
    root             INTEGER NOT NULL DEFAULT 0,
    parent           INTEGER NOT NULL DEFAULT 0,
    floor            INTEGER NOT NULL DEFAULT 0,
    reply_count      INTEGER NOT NULL DEFAULT 0,
    root_reply_count INTEGER NOT NULL DEFAULT 0, -- floor counter for replies
    like_count       INTEGER NOT NULL DEFAULT 0,
    hate_count       INTEGER NOT NULL DEFAULT 0,
    state            INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comment_index_obj_idx
    ON comment_index(obj_id, obj_type, root, floor);
CREATE INDEX IF NOT EXISTS comment_index_root_idx
    ON comment_index(root, floor);

-- Content payload, 1:1 with comment_index on the same id. Split from the
-- index row so the two can live on different storage tiers.
CREATE TABLE IF NOT EXISTS comment_content (
    id            INTEGER PRIMARY KEY REFERENCES comment_index(id),
    at_member_ids TEXT NOT NULL DEFAULT '[]',   -- JSON array of member ids
    ip            TEXT NOT NULL DEFAULT '',
    platform      INTEGER NOT NULL DEFAULT 0,
    device        TEXT NOT NULL DEFAULT '',
    message       TEXT NOT NULL,
    meta          TEXT NOT NULL DEFAULT ''
);

-- Like ledger. Row existence is the sole source of truth for 'member has
-- liked comment'; like_count on the index row is derived from it.
CREATE TABLE IF NOT EXISTS comment_like (
    member_id  INTEGER NOT NULL,
    comment_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (member_id, comment_id)
);

PRAGMA user_version = 1;
";
