use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, onboarding, documents)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                          TEXT PRIMARY KEY,
                email                       TEXT NOT NULL UNIQUE,
                password                    TEXT NOT NULL,
                first_name                  TEXT NOT NULL,
                last_name                   TEXT NOT NULL,
                company                     TEXT,
                role                        TEXT NOT NULL DEFAULT 'buyer',
                is_email_verified           INTEGER NOT NULL DEFAULT 0,
                is_active                   INTEGER NOT NULL DEFAULT 1,
                email_verification_token    TEXT,
                email_verification_expires  TEXT,
                password_reset_token        TEXT,
                password_reset_expires      TEXT,
                last_login                  TEXT,
                created_at                  TEXT NOT NULL,
                updated_at                  TEXT NOT NULL
            );

            CREATE INDEX idx_users_role ON users(role);

            CREATE TABLE onboarding (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL UNIQUE REFERENCES users(id),
                user_role       TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'in_progress',
                progress        INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
                review_status   TEXT NOT NULL DEFAULT 'pending',
                reviewed_by     TEXT REFERENCES users(id),
                reviewed_at     TEXT,
                review_comments TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_onboarding_status ON onboarding(status);
            CREATE INDEX idx_onboarding_role ON onboarding(user_role);
            CREATE INDEX idx_onboarding_created ON onboarding(created_at);

            CREATE TABLE onboarding_requirements (
                onboarding_id   TEXT NOT NULL REFERENCES onboarding(id) ON DELETE CASCADE,
                document_type   TEXT NOT NULL,
                required        INTEGER NOT NULL DEFAULT 1,
                completed       INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (onboarding_id, document_type)
            );

            CREATE TABLE onboarding_documents (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                onboarding_id   TEXT NOT NULL REFERENCES onboarding(id) ON DELETE CASCADE,
                document_type   TEXT NOT NULL,
                file_name       TEXT NOT NULL,
                original_name   TEXT NOT NULL,
                file_size       INTEGER NOT NULL,
                mime_type       TEXT NOT NULL,
                file_path       TEXT NOT NULL,
                sha256          TEXT NOT NULL,
                upload_date     TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending',
                review_status   TEXT,
                reviewed_by     TEXT REFERENCES users(id),
                reviewed_at     TEXT,
                review_comments TEXT,
                UNIQUE (onboarding_id, document_type)
            );

            CREATE INDEX idx_documents_user ON onboarding_documents(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
