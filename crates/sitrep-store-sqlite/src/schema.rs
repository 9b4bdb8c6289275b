//! SQL schema for the sitrep SQLite store.
//!
//! Executed once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Organizational hierarchy ──────────────────────────────────────────
-- Three disjoint structure tables; codes are assumed unique across all
-- three (not enforceable here), and resolution order is DC > DRI > DIW.

CREATE TABLE IF NOT EXISTS dris (
    code   TEXT PRIMARY KEY,
    label  TEXT
);

CREATE TABLE IF NOT EXISTS diws (
    code       TEXT PRIMARY KEY,
    label      TEXT,
    parent_dri TEXT NOT NULL REFERENCES dris(code)
);

CREATE TABLE IF NOT EXISTS dcs (
    code        TEXT PRIMARY KEY,
    label       TEXT,
    description TEXT
);

-- ── Users ─────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    username       TEXT NOT NULL,
    first_name     TEXT,
    last_name      TEXT,
    email          TEXT,
    phone          TEXT,
    role           INTEGER NOT NULL,     -- 1 DIW, 2 DRI, 3 DC, 4 Admin, 5 Director
    structure_code TEXT,
    is_active      INTEGER NOT NULL DEFAULT 0,
    is_super_admin INTEGER NOT NULL DEFAULT 0,
    session_token  TEXT,
    created_at     TEXT NOT NULL,        -- ISO 8601 UTC; server-assigned
    created_by     TEXT,
    last_seen_at   TEXT
);

-- ── Indicator catalog ─────────────────────────────────────────────────
-- The per-family sequence counters only ever grow, so indicator ids
-- ('{category}.{seq}') are never reused after a deletion.

CREATE TABLE IF NOT EXISTS categories (
    category_id    TEXT PRIMARY KEY,
    label          TEXT NOT NULL,
    last_op_seq    INTEGER NOT NULL DEFAULT 0,
    last_strat_seq INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS objectives (
    objective_id INTEGER PRIMARY KEY AUTOINCREMENT,
    label        TEXT NOT NULL,
    category_id  TEXT NOT NULL REFERENCES categories(category_id)
);

CREATE TABLE IF NOT EXISTS indicators (
    indicator_id TEXT PRIMARY KEY,
    label        TEXT NOT NULL,
    category_id  TEXT NOT NULL REFERENCES categories(category_id)
);

CREATE TABLE IF NOT EXISTS strategic_indicators (
    indicator_id TEXT PRIMARY KEY,
    label        TEXT NOT NULL,
    category_id  TEXT NOT NULL REFERENCES categories(category_id),
    objective_id INTEGER NOT NULL REFERENCES objectives(objective_id)
);

CREATE TABLE IF NOT EXISTS dri_indicators (
    indicator_id INTEGER PRIMARY KEY,
    label        TEXT NOT NULL
);

-- ── Targets ───────────────────────────────────────────────────────────
-- At most one row per scope tuple; a missing row reads as target 0.

CREATE TABLE IF NOT EXISTS targets_op (
    indicator_id   TEXT NOT NULL REFERENCES indicators(indicator_id),
    structure_code TEXT NOT NULL,
    year           TEXT NOT NULL,
    value          REAL NOT NULL,
    UNIQUE (indicator_id, structure_code, year)
);

CREATE TABLE IF NOT EXISTS targets_strat (
    indicator_id TEXT NOT NULL REFERENCES strategic_indicators(indicator_id),
    year         TEXT NOT NULL,
    value        REAL NOT NULL,
    UNIQUE (indicator_id, year)
);

CREATE TABLE IF NOT EXISTS targets_dri (
    indicator_id INTEGER NOT NULL REFERENCES dri_indicators(indicator_id),
    dri_code     TEXT NOT NULL,
    year         TEXT NOT NULL,
    value        REAL NOT NULL,
    UNIQUE (indicator_id, dri_code, year)
);

-- ── Situations ────────────────────────────────────────────────────────
-- One situation per (structure, lower(month), year); checked inside the
-- creation transaction rather than by a constraint, because month names
-- compare case-insensitively.

CREATE TABLE IF NOT EXISTS situations (
    situation_id       TEXT PRIMARY KEY,
    structure_code     TEXT NOT NULL,
    month              TEXT NOT NULL,
    year               TEXT NOT NULL,
    kind               TEXT NOT NULL,    -- 'operational' | 'strategic' | 'dri_self'
    status             INTEGER NOT NULL DEFAULT 0,  -- 0 draft, 1 submitted, 2 rejected, 3 validated
    owner_user_id      TEXT NOT NULL REFERENCES users(user_id),
    created_at         TEXT NOT NULL,
    edited_at          TEXT,
    confirmed_at       TEXT,
    dri_validated_at   TEXT,
    admin_validated_at TEXT
);

-- ── Declarations ──────────────────────────────────────────────────────
-- One live table and one draft shadow per family, identical shape. A
-- situation's rows live in exactly one of the pair, governed by status.

CREATE TABLE IF NOT EXISTS declarations_op (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS declarations_op_draft (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS declarations_strat (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS declarations_strat_draft (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS declarations_dri (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS declarations_dri_draft (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL REFERENCES situations(situation_id) ON DELETE CASCADE,
    indicator_id TEXT NOT NULL,
    numerator    REAL NOT NULL,
    denominator  REAL NOT NULL,
    rate         REAL NOT NULL,
    target       REAL NOT NULL,
    gap          REAL NOT NULL
);

-- ── Rejection history ─────────────────────────────────────────────────
-- Append-only; never updated or deleted. No foreign key to situations so
-- the log survives deletion of a rejected situation.

CREATE TABLE IF NOT EXISTS rejection_history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    situation_id TEXT NOT NULL,
    comment      TEXT NOT NULL,
    rejected_by  TEXT NOT NULL,
    rejected_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS situations_structure_idx ON situations(structure_code);
CREATE INDEX IF NOT EXISTS situations_owner_idx     ON situations(owner_user_id);
CREATE INDEX IF NOT EXISTS situations_status_idx    ON situations(status);
CREATE INDEX IF NOT EXISTS declarations_op_sit_idx          ON declarations_op(situation_id);
CREATE INDEX IF NOT EXISTS declarations_op_draft_sit_idx    ON declarations_op_draft(situation_id);
CREATE INDEX IF NOT EXISTS declarations_strat_sit_idx       ON declarations_strat(situation_id);
CREATE INDEX IF NOT EXISTS declarations_strat_draft_sit_idx ON declarations_strat_draft(situation_id);
CREATE INDEX IF NOT EXISTS declarations_dri_sit_idx         ON declarations_dri(situation_id);
CREATE INDEX IF NOT EXISTS declarations_dri_draft_sit_idx   ON declarations_dri_draft(situation_id);
CREATE INDEX IF NOT EXISTS rejection_history_sit_idx        ON rejection_history(situation_id);

PRAGMA user_version = 1;
";
