//! PostgreSQL schema definitions
//!
//! Everything lives in the `sda` schema. Multi-row writes that must stay
//! atomic (register + event, archive fields + checksum + event) are stored
//! procedures so a worker crash can never leave half a transition behind.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 4;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
CREATE SCHEMA IF NOT EXISTS sda;

-- =============================================================================
-- Infrastructure: schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.dbschema_version (
    version INTEGER PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    description TEXT
);

-- =============================================================================
-- 1. Encryption keys (before files due to FK)
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.encryption_keys (
    key_hash TEXT PRIMARY KEY,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deprecated_at TIMESTAMPTZ
);

-- =============================================================================
-- 2. Files
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.files (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    stable_id TEXT UNIQUE,
    submission_user TEXT NOT NULL,
    submission_file_path TEXT NOT NULL,
    archive_file_path TEXT,
    archive_file_size BIGINT,
    decrypted_file_size BIGINT,
    backup_path TEXT,
    header TEXT,
    key_hash TEXT REFERENCES sda.encryption_keys(key_hash),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_modified TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (submission_user, submission_file_path)
);

-- =============================================================================
-- 3. File event log (append-only; rows are never updated or deleted)
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.file_event_log (
    id BIGSERIAL PRIMARY KEY,
    file_id UUID NOT NULL REFERENCES sda.files(id),
    event TEXT NOT NULL CHECK (event IN (
        'registered', 'uploaded', 'submitted', 'ingested', 'archived',
        'verified', 'backed up', 'ready', 'disabled', 'enabled', 'error'
    )),
    correlation_id TEXT,
    user_id TEXT,
    details TEXT,
    message TEXT,
    started_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_file_event_log_file
    ON sda.file_event_log(file_id, started_at DESC);
CREATE INDEX IF NOT EXISTS idx_file_event_log_corr
    ON sda.file_event_log(correlation_id);

-- =============================================================================
-- 4. Checksums (one per file and source)
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.checksums (
    id BIGSERIAL PRIMARY KEY,
    file_id UUID NOT NULL REFERENCES sda.files(id),
    checksum TEXT NOT NULL,
    type TEXT NOT NULL,
    source TEXT NOT NULL CHECK (source IN ('UPLOADED', 'ARCHIVED', 'UNENCRYPTED')),
    UNIQUE (file_id, source)
);

-- =============================================================================
-- 5. Datasets and file-dataset mapping
-- =============================================================================
CREATE TABLE IF NOT EXISTS sda.datasets (
    id BIGSERIAL PRIMARY KEY,
    stable_id TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS sda.file_dataset (
    id BIGSERIAL PRIMARY KEY,
    file_id UUID NOT NULL REFERENCES sda.files(id),
    dataset_id BIGINT NOT NULL REFERENCES sda.datasets(id),
    UNIQUE (file_id, dataset_id)
);

CREATE TABLE IF NOT EXISTS sda.dataset_event_log (
    id BIGSERIAL PRIMARY KEY,
    dataset_id TEXT NOT NULL,
    event TEXT NOT NULL CHECK (event IN ('registered', 'released', 'deprecated')),
    message TEXT,
    started_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- =============================================================================
-- Stored procedures: append event + write fields, atomically
-- =============================================================================

-- Create-or-update the file row; always append a 'registered' event. The
-- file id doubles as the correlation id of the registration event.
CREATE OR REPLACE FUNCTION sda.register_file(submission_path TEXT, submitting_user TEXT)
RETURNS UUID LANGUAGE plpgsql AS $$
DECLARE
    file_uuid UUID;
BEGIN
    INSERT INTO sda.files (submission_file_path, submission_user)
    VALUES (submission_path, submitting_user)
    ON CONFLICT (submission_user, submission_file_path)
    DO UPDATE SET last_modified = now()
    RETURNING id INTO file_uuid;

    INSERT INTO sda.file_event_log (file_id, event, correlation_id, user_id)
    VALUES (file_uuid, 'registered', file_uuid::TEXT, submitting_user);

    RETURN file_uuid;
END;
$$;

CREATE OR REPLACE FUNCTION sda.set_archived(
    file_uuid UUID,
    corr_id TEXT,
    file_path TEXT,
    file_size BIGINT,
    enc_checksum TEXT,
    enc_type TEXT
)
RETURNS void LANGUAGE plpgsql AS $$
BEGIN
    UPDATE sda.files
    SET archive_file_path = file_path,
        archive_file_size = file_size,
        last_modified = now()
    WHERE id = file_uuid;

    INSERT INTO sda.checksums (file_id, checksum, type, source)
    VALUES (file_uuid, enc_checksum, enc_type, 'ARCHIVED')
    ON CONFLICT (file_id, source)
    DO UPDATE SET checksum = enc_checksum, type = enc_type;

    INSERT INTO sda.file_event_log (file_id, event, correlation_id)
    VALUES (file_uuid, 'archived', corr_id);
END;
$$;

CREATE OR REPLACE FUNCTION sda.set_verified(
    file_uuid UUID,
    corr_id TEXT,
    archive_checksum TEXT,
    archive_type TEXT,
    decrypted_size BIGINT,
    decrypted_checksum TEXT,
    decrypted_type TEXT
)
RETURNS void LANGUAGE plpgsql AS $$
BEGIN
    UPDATE sda.files
    SET decrypted_file_size = decrypted_size,
        last_modified = now()
    WHERE id = file_uuid;

    INSERT INTO sda.checksums (file_id, checksum, type, source)
    VALUES (file_uuid, archive_checksum, archive_type, 'ARCHIVED')
    ON CONFLICT (file_id, source)
    DO UPDATE SET checksum = archive_checksum, type = archive_type;

    INSERT INTO sda.checksums (file_id, checksum, type, source)
    VALUES (file_uuid, decrypted_checksum, decrypted_type, 'UNENCRYPTED')
    ON CONFLICT (file_id, source)
    DO UPDATE SET checksum = decrypted_checksum, type = decrypted_type;

    INSERT INTO sda.file_event_log (file_id, event, correlation_id)
    VALUES (file_uuid, 'verified', corr_id);
END;
$$;
"#;
