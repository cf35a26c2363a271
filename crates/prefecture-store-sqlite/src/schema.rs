//! SQL schema for the Préfecture SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- lower-cased
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    user_id     TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    role        TEXT NOT NULL DEFAULT 'student',
    first_name  TEXT,
    last_name   TEXT,
    created_at  TEXT NOT NULL
);

-- status is written as 'pending' | 'answered'; older rows may carry the
-- legacy spellings, which the store treats as 'answered'.
CREATE TABLE IF NOT EXISTS questions (
    question_id     TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    full_text       TEXT NOT NULL,
    theme           TEXT NOT NULL,
    official_answer TEXT,
    status          TEXT NOT NULL DEFAULT 'pending',
    visible         INTEGER NOT NULL DEFAULT 0,
    author_id       TEXT NOT NULL,
    created_at      TEXT NOT NULL     -- fixed-width RFC 3339, sorts as text
);

-- At most one reaction per user per question.
CREATE TABLE IF NOT EXISTS question_reactions (
    question_id TEXT NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    kind        TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
    reacted_at  TEXT NOT NULL,
    PRIMARY KEY (question_id, user_id)
);

CREATE TABLE IF NOT EXISTS documents (
    document_id  TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    level        TEXT NOT NULL,
    file_name    TEXT NOT NULL,
    size_bytes   INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    url          TEXT NOT NULL,
    storage_path TEXT NOT NULL UNIQUE,
    uploaded_by  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS questions_created_idx ON questions(created_at);
CREATE INDEX IF NOT EXISTS questions_author_idx  ON questions(author_id);
CREATE INDEX IF NOT EXISTS documents_level_idx   ON documents(level, created_at);

PRAGMA user_version = 1;
";
