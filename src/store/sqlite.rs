use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::schema::SCHEMA;
use super::{AccessStore, EndpointStore, PortalLinkRepository, ProjectStore, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// True when a unique violation names the given `table.column`.
fn violates_unique_column(err: &rusqlite::Error, column: &str) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE && msg.ends_with(column)
    )
}

fn endpoint_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Endpoint> {
    Ok(Endpoint {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const PORTAL_LINK_COLUMNS: &str = "p.id, p.project_id, p.name, p.token, p.owner_id, \
     p.can_manage_endpoint, p.created_at, p.updated_at, p.deleted_at";

/// Endpoint predicate shared by the count and page queries. A link matches
/// when the endpoint is in its explicit scope, or, for a link without an
/// explicit scope, when the endpoint is owned by the link's owner.
const ENDPOINT_FILTER: &str = "(?2 IS NULL
     OR EXISTS (SELECT 1 FROM portal_links_endpoints pe
                WHERE pe.portal_link_id = p.id AND pe.endpoint_id = ?2)
     OR (NOT EXISTS (SELECT 1 FROM portal_links_endpoints pe WHERE pe.portal_link_id = p.id)
         AND EXISTS (SELECT 1 FROM endpoints e
                     WHERE e.id = ?2 AND e.project_id = p.project_id
                       AND e.owner_id IS NOT NULL AND e.owner_id = p.owner_id)))";

fn portal_link_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PortalLink> {
    Ok(PortalLink {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        token: row.get(3)?,
        owner_id: row.get(4)?,
        can_manage_endpoint: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
        deleted_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        endpoints: Vec::new(),
        endpoints_metadata: Vec::new(),
    })
}

fn metadata_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EndpointMetadata> {
    Ok(EndpointMetadata {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        owner_id: row.get(3)?,
    })
}

/// Fills the explicit scope and the endpoint metadata snapshot of a link.
/// Without an explicit scope the metadata lists the endpoints registered to
/// the link's owner.
fn load_scope(conn: &Connection, link: &mut PortalLink) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT endpoint_id FROM portal_links_endpoints
         WHERE portal_link_id = ?1 ORDER BY position",
    )?;
    link.endpoints = stmt
        .query_map(params![link.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    link.endpoints_metadata = match (&link.owner_id, link.endpoints.is_empty()) {
        (Some(owner_id), true) => {
            let mut stmt = conn.prepare_cached(
                "SELECT id, name, url, owner_id FROM endpoints
                 WHERE project_id = ?1 AND owner_id = ?2 ORDER BY rowid",
            )?;
            stmt.query_map(params![link.project_id, owner_id], metadata_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
        _ => {
            let mut stmt = conn.prepare_cached(
                "SELECT e.id, e.name, e.url, e.owner_id
                 FROM portal_links_endpoints pe
                 JOIN endpoints e ON e.id = pe.endpoint_id AND e.project_id = ?2
                 WHERE pe.portal_link_id = ?1 ORDER BY pe.position",
            )?;
            stmt.query_map(params![link.id, link.project_id], metadata_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    Ok(())
}

/// Replaces the explicit scope of a link.
fn write_scope(conn: &Connection, link: &PortalLink) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM portal_links_endpoints WHERE portal_link_id = ?1",
        params![link.id],
    )?;

    for (position, endpoint_id) in link.endpoints.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO portal_links_endpoints (portal_link_id, endpoint_id, position)
             VALUES (?1, ?2, ?3)",
            params![link.id, endpoint_id, position as i64],
        )?;
    }

    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }
}

impl ProjectStore for SqliteStore {
    fn create_project(&self, project: &Project) -> Result<()> {
        self.conn().execute(
            "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![project.id, project.name, format_datetime(&project.created_at)],
        )?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM projects WHERE id = ?1",
            params![id],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

impl EndpointStore for SqliteStore {
    fn create_endpoint(&self, endpoint: &Endpoint) -> Result<()> {
        self.conn().execute(
            "INSERT INTO endpoints (id, project_id, name, url, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                endpoint.id,
                endpoint.project_id,
                endpoint.name,
                endpoint.url,
                endpoint.owner_id,
                format_datetime(&endpoint.created_at),
                format_datetime(&endpoint.updated_at),
            ],
        )?;
        Ok(())
    }

    fn find_endpoints_by_ids(&self, project_id: &str, ids: &[String]) -> Result<Vec<Endpoint>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, project_id, name, url, owner_id, created_at, updated_at
             FROM endpoints WHERE project_id = ?1 AND id IN ({placeholders})
             ORDER BY rowid"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let values = std::iter::once(project_id).chain(ids.iter().map(String::as_str));
        let rows = stmt.query_map(params_from_iter(values), endpoint_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl AccessStore for SqliteStore {
    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id,
                user.name,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::TokenCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn upsert_project_grant(&self, grant: &ProjectGrant) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_project_grants (user_id, project_id, allow_bits, deny_bits, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, project_id) DO UPDATE SET
                allow_bits = excluded.allow_bits,
                deny_bits = excluded.deny_bits,
                updated_at = excluded.updated_at",
            params![
                grant.user_id,
                grant.project_id,
                i64::from(grant.allow_bits),
                i64::from(grant.deny_bits),
                format_datetime(&grant.created_at),
                format_datetime(&grant.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_project_grant(&self, user_id: &str, project_id: &str) -> Result<Option<ProjectGrant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, project_id, allow_bits, deny_bits, created_at, updated_at
             FROM user_project_grants WHERE user_id = ?1 AND project_id = ?2",
            params![user_id, project_id],
            |row| {
                Ok(ProjectGrant {
                    user_id: row.get(0)?,
                    project_id: row.get(1)?,
                    allow_bits: Permission::from(row.get::<_, i64>(2)?),
                    deny_bits: Permission::from(row.get::<_, i64>(3)?),
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    updated_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

impl PortalLinkRepository for SqliteStore {
    fn create_portal_link(&self, link: &PortalLink) -> Result<()> {
        let now = format_datetime(&Utc::now());
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let result = tx.execute(
            "INSERT INTO portal_links (id, project_id, name, token, owner_id, can_manage_endpoint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                link.id,
                link.project_id,
                link.name,
                link.token,
                link.owner_id,
                link.can_manage_endpoint,
                now,
            ],
        );

        let rows = match result {
            Ok(rows) => rows,
            Err(e) if violates_unique_column(&e, "portal_links.token") => {
                return Err(Error::TokenCollision);
            }
            Err(e) if is_unique_violation(&e) => return Err(Error::NotCreated),
            Err(e) => return Err(Error::from(e)),
        };
        if rows == 0 {
            return Err(Error::NotCreated);
        }

        write_scope(&tx, link)?;
        tx.commit()?;
        Ok(())
    }

    fn find_portal_link_by_id(&self, project_id: &str, id: &str) -> Result<PortalLink> {
        let conn = self.conn();
        let mut link = conn
            .query_row(
                &format!(
                    "SELECT {PORTAL_LINK_COLUMNS} FROM portal_links p
                     WHERE p.id = ?1 AND p.project_id = ?2 AND p.deleted_at IS NULL"
                ),
                params![id, project_id],
                portal_link_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        load_scope(&conn, &mut link)?;
        Ok(link)
    }

    fn find_portal_link_by_token(&self, token: &str) -> Result<PortalLink> {
        let conn = self.conn();
        let mut link = conn
            .query_row(
                &format!(
                    "SELECT {PORTAL_LINK_COLUMNS} FROM portal_links p
                     WHERE p.token = ?1 AND p.deleted_at IS NULL"
                ),
                params![token],
                portal_link_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        load_scope(&conn, &mut link)?;
        Ok(link)
    }

    fn load_portal_links_paged(
        &self,
        project_id: &str,
        filter: &PortalLinkFilter,
        pageable: &Pageable,
    ) -> Result<(Vec<PortalLink>, PaginationData)> {
        let conn = self.conn();
        let endpoint_id = filter.endpoint_id.as_deref();

        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM portal_links p
                 WHERE p.project_id = ?1 AND p.deleted_at IS NULL AND {ENDPOINT_FILTER}"
            ),
            params![project_id, endpoint_id],
            |row| row.get(0),
        )?;

        let mut links = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PORTAL_LINK_COLUMNS} FROM portal_links p
                 WHERE p.project_id = ?1 AND p.deleted_at IS NULL AND {ENDPOINT_FILTER}
                 ORDER BY p.seq LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt.query_map(
                params![
                    project_id,
                    endpoint_id,
                    i64::try_from(pageable.limit()).unwrap_or(i64::MAX),
                    i64::try_from(pageable.offset()).unwrap_or(i64::MAX),
                ],
                portal_link_from_row,
            )?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        for link in &mut links {
            load_scope(&conn, link)?;
        }

        let pagination = PaginationData::new(pageable, u64::try_from(total).unwrap_or(0));
        Ok((links, pagination))
    }

    fn update_portal_link(&self, link: &PortalLink) -> Result<()> {
        let now = format_datetime(&Utc::now());
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE portal_links SET name = ?1, owner_id = ?2, can_manage_endpoint = ?3, updated_at = ?4
             WHERE id = ?5 AND project_id = ?6 AND deleted_at IS NULL",
            params![
                link.name,
                link.owner_id,
                link.can_manage_endpoint,
                now,
                link.id,
                link.project_id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotUpdated);
        }

        write_scope(&tx, link)?;
        tx.commit()?;
        Ok(())
    }

    fn revoke_portal_link(&self, project_id: &str, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE portal_links SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND project_id = ?3 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id, project_id],
        )?;

        if rows == 0 {
            return Err(Error::NotDeleted);
        }
        Ok(())
    }
}
