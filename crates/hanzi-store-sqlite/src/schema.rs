//! SQL schema for the hanzi SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    username      TEXT NOT NULL,
    password_hash TEXT NOT NULL,    -- argon2 PHC string
    created_at    TEXT NOT NULL     -- ISO 8601 UTC
);

-- Single-use registration gates.
CREATE TABLE IF NOT EXISTS invitation_codes (
    code       TEXT PRIMARY KEY,
    used       INTEGER NOT NULL DEFAULT 0,
    used_by    TEXT REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    used_at    TEXT
);

-- Bearer tokens are stored only as SHA-256 hex digests.
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    token_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    course_id   TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    published   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lessons (
    lesson_id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES courses(course_id),
    sequence  INTEGER NOT NULL,
    title     TEXT NOT NULL,
    body      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS characters (
    character_id TEXT PRIMARY KEY,
    course_id    TEXT NOT NULL REFERENCES courses(course_id),
    glyph        TEXT NOT NULL,
    pinyin       TEXT NOT NULL,
    meaning      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    enrolled_at   TEXT NOT NULL,
    progress      INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, course_id)
);

-- One scheduling row per (user, character). No UPDATE path exists other
-- than apply_review's compare-and-swap on revision; rows are never deleted.
CREATE TABLE IF NOT EXISTS reviews (
    review_id        TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL REFERENCES users(user_id),
    character_id     TEXT NOT NULL REFERENCES characters(character_id),
    repetition_count INTEGER NOT NULL DEFAULT 0,
    ease_factor      REAL NOT NULL DEFAULT 2.5,
    interval_days    REAL NOT NULL DEFAULT 1,
    next_review_at   TEXT NOT NULL,
    last_reviewed_at TEXT,
    revision         INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, character_id)
);

CREATE INDEX IF NOT EXISTS sessions_user_idx     ON sessions(user_id);
CREATE INDEX IF NOT EXISTS lessons_course_idx    ON lessons(course_id);
CREATE INDEX IF NOT EXISTS characters_course_idx ON characters(course_id);
CREATE INDEX IF NOT EXISTS enrollments_user_idx  ON enrollments(user_id);
CREATE INDEX IF NOT EXISTS reviews_user_due_idx  ON reviews(user_id, next_review_at);

PRAGMA user_version = 1;
";
