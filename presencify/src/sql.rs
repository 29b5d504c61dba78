//! SQL query constants with database-specific placeholders.
//!
//! SQLite uses `?` placeholders, PostgreSQL uses `$1, $2, ...` numbered placeholders.

// =============================================================================
// Accounts and sessions
// =============================================================================

#[cfg(feature = "sqlite")]
pub const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (id, email, password_hash, full_name, created_at)
    VALUES (?, ?, ?, ?, ?)
"#;

#[cfg(feature = "postgres")]
pub const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (id, email, password_hash, full_name, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

#[cfg(feature = "sqlite")]
pub const SELECT_ACCOUNT_BY_EMAIL: &str =
    "SELECT id, email, password_hash, full_name, created_at, last_login FROM accounts WHERE email = ?";

#[cfg(feature = "postgres")]
pub const SELECT_ACCOUNT_BY_EMAIL: &str =
    "SELECT id, email, password_hash, full_name, created_at, last_login FROM accounts WHERE email = $1";

pub const SELECT_ALL_ACCOUNTS: &str =
    "SELECT id, email, password_hash, full_name, created_at, last_login FROM accounts ORDER BY created_at";

#[cfg(feature = "sqlite")]
pub const UPDATE_ACCOUNT_LAST_LOGIN: &str = "UPDATE accounts SET last_login = ? WHERE id = ?";

#[cfg(feature = "postgres")]
pub const UPDATE_ACCOUNT_LAST_LOGIN: &str = "UPDATE accounts SET last_login = $1 WHERE id = $2";

#[cfg(feature = "sqlite")]
pub const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (session_id, user_id, created_at, expires_at)
    VALUES (?, ?, ?, ?)
"#;

#[cfg(feature = "postgres")]
pub const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (session_id, user_id, created_at, expires_at)
    VALUES ($1, $2, $3, $4)
"#;

#[cfg(feature = "sqlite")]
pub const SELECT_SESSION_USER: &str = r#"
    SELECT s.expires_at, a.id, a.email, a.full_name
    FROM sessions s JOIN accounts a ON a.id = s.user_id
    WHERE s.session_id = ?
"#;

#[cfg(feature = "postgres")]
pub const SELECT_SESSION_USER: &str = r#"
    SELECT s.expires_at, a.id, a.email, a.full_name
    FROM sessions s JOIN accounts a ON a.id = s.user_id
    WHERE s.session_id = $1
"#;

#[cfg(feature = "sqlite")]
pub const DELETE_SESSION: &str = "DELETE FROM sessions WHERE session_id = ?";

#[cfg(feature = "postgres")]
pub const DELETE_SESSION: &str = "DELETE FROM sessions WHERE session_id = $1";

#[cfg(feature = "sqlite")]
pub const DELETE_EXPIRED_SESSIONS: &str = "DELETE FROM sessions WHERE expires_at < ?";

#[cfg(feature = "postgres")]
pub const DELETE_EXPIRED_SESSIONS: &str = "DELETE FROM sessions WHERE expires_at < $1";

// =============================================================================
// Roles
// =============================================================================

#[cfg(feature = "sqlite")]
pub const INSERT_ROLE: &str = r#"
    INSERT INTO user_roles (user_id, role) VALUES (?, ?)
    ON CONFLICT(user_id, role) DO NOTHING
"#;

#[cfg(feature = "postgres")]
pub const INSERT_ROLE: &str = r#"
    INSERT INTO user_roles (user_id, role) VALUES ($1, $2)
    ON CONFLICT(user_id, role) DO NOTHING
"#;

#[cfg(feature = "sqlite")]
pub const SELECT_ROLE: &str = "SELECT role FROM user_roles WHERE user_id = ? AND role = ?";

#[cfg(feature = "postgres")]
pub const SELECT_ROLE: &str = "SELECT role FROM user_roles WHERE user_id = $1 AND role = $2";

// =============================================================================
// Contact submissions
// =============================================================================

#[cfg(feature = "sqlite")]
pub const INSERT_SUBMISSION: &str = r#"
    INSERT INTO contact_submissions
        (id, name, email, phone, company, message, status, created_at,
         selected_package, selected_addons, estimated_total)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[cfg(feature = "postgres")]
pub const INSERT_SUBMISSION: &str = r#"
    INSERT INTO contact_submissions
        (id, name, email, phone, company, message, status, created_at,
         selected_package, selected_addons, estimated_total)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

#[cfg(feature = "sqlite")]
pub const SELECT_RECENT_SUBMISSIONS: &str =
    "SELECT * FROM contact_submissions ORDER BY created_at DESC LIMIT ?";

#[cfg(feature = "postgres")]
pub const SELECT_RECENT_SUBMISSIONS: &str =
    "SELECT * FROM contact_submissions ORDER BY created_at DESC LIMIT $1";

// =============================================================================
// Projects
// =============================================================================

#[cfg(feature = "sqlite")]
pub const INSERT_PROJECT: &str = r#"
    INSERT INTO projects
        (id, title, description, status, budget, start_date, end_date, client_id, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[cfg(feature = "postgres")]
pub const INSERT_PROJECT: &str = r#"
    INSERT INTO projects
        (id, title, description, status, budget, start_date, end_date, client_id, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#;

pub const SELECT_ALL_PROJECTS: &str = "SELECT * FROM projects ORDER BY created_at DESC";

#[cfg(feature = "sqlite")]
pub const SELECT_CLIENT_PROJECTS: &str =
    "SELECT * FROM projects WHERE client_id = ? ORDER BY created_at DESC";

#[cfg(feature = "postgres")]
pub const SELECT_CLIENT_PROJECTS: &str =
    "SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC";

// =============================================================================
// Site counts
// =============================================================================

pub const COUNT_ACCOUNTS: &str = "SELECT COUNT(*) FROM accounts";

pub const COUNT_PROJECTS: &str = "SELECT COUNT(*) FROM projects";

pub const COUNT_SUBMISSIONS: &str = "SELECT COUNT(*) FROM contact_submissions";
