// crates/lti-results-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Gradebook Store
// Description: Read path for courses, line items, placements, and grades.
// Purpose: Back the Results resource with a durable SQLite gradebook.
// Dependencies: lti-results-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Grade items and line items live in separate tables, matching
//! [`lti_results_core::InMemoryGradebook`]: a line item without a grade item
//! is not found, and a grade item without a visible line item is forbidden.
//! Tool placements join `lti_types` to learn the owning tool proxy, and
//! `gradebook_services` records line items created through the gradebook
//! service together with the tool that created them. Grade rows are returned
//! ordered by their primary key, which is the natural order paging relies on
//! in every store.
//!
//! The schema is created on first open and version-checked afterwards.
//! Database contents are untrusted: out-of-range values fail closed as
//! corruption. Imports reject non-finite grades, which `SQLite` would
//! otherwise store as `NULL`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use lti_results_core::ContextId;
use lti_results_core::CourseLookup;
use lti_results_core::CourseRecord;
use lti_results_core::GradeFetch;
use lti_results_core::GradeItemLookup;
use lti_results_core::GradeItemRecord;
use lti_results_core::GradeRecord;
use lti_results_core::GradebookSnapshot;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::LineItem;
use lti_results_core::LineItemResolver;
use lti_results_core::StoreError;
use lti_results_core::ToolCaller;
use lti_results_core::ToolInstance;
use lti_results_core::ToolInstanceLookup;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use lti_results_core::UserId;
use lti_results_core::line_item_visible_to;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the gradebook.
const SCHEMA_VERSION: i64 = 2;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Owner kind stored for tool proxy registrations.
const OWNER_TOOL_PROXY: &str = "tool_proxy";
/// Owner kind stored for tool type registrations.
const OWNER_TOOL_TYPE: &str = "tool_type";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` gradebook.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteGradebookConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl SqliteGradebookConfig {
    /// Creates a config for the given path with the default busy timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` gradebook errors.
#[derive(Debug, Error)]
pub enum SqliteGradebookError {
    /// Filesystem error.
    #[error("sqlite gradebook io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite gradebook db error: {0}")]
    Db(String),
    /// Invalid configuration or stored data.
    #[error("sqlite gradebook invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteGradebookError> for StoreError {
    fn from(error: SqliteGradebookError) -> Self {
        match error {
            SqliteGradebookError::Io(message) | SqliteGradebookError::Db(message) => {
                Self::Io(message)
            }
            SqliteGradebookError::Invalid(message) => Self::Corrupt(message),
        }
    }
}

/// Maps a `rusqlite` error into a gradebook error.
fn db_error(err: &rusqlite::Error) -> SqliteGradebookError {
    SqliteGradebookError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed gradebook.
#[derive(Clone)]
pub struct SqliteGradebook {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteGradebook {
    /// Opens (and if needed initializes) a gradebook database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteGradebookError`] when the database cannot be opened or
    /// its schema version is unsupported.
    pub fn open(config: &SqliteGradebookConfig) -> Result<Self, SqliteGradebookError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Writes every record of a snapshot into the database.
    ///
    /// Existing rows with the same identifiers are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteGradebookError`] when any insert fails; the import is
    /// rolled back as a whole.
    pub fn import_snapshot(
        &self,
        snapshot: &GradebookSnapshot,
    ) -> Result<(), SqliteGradebookError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        for course in &snapshot.courses {
            tx.execute(
                "INSERT OR REPLACE INTO courses (id, name) VALUES (?1, ?2)",
                params![course.id.as_str(), course.name],
            )
            .map_err(|err| db_error(&err))?;
        }
        for item in &snapshot.grade_items {
            tx.execute(
                "INSERT OR REPLACE INTO grade_items (id, course_id, item_instance)
                 VALUES (?1, ?2, ?3)",
                params![
                    item.id.as_str(),
                    item.course_id.as_str(),
                    item.item_instance.as_ref().map(InstanceId::as_str)
                ],
            )
            .map_err(|err| db_error(&err))?;
        }
        for line_item in &snapshot.line_items {
            ensure_finite("line item grade_max", line_item.grade_max)?;
            tx.execute(
                "INSERT OR REPLACE INTO line_items (id, course_id, item_instance, label, grade_max)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    line_item.id.as_str(),
                    line_item.course_id.as_str(),
                    line_item.item_instance.as_ref().map(InstanceId::as_str),
                    line_item.label,
                    line_item.grade_max
                ],
            )
            .map_err(|err| db_error(&err))?;
        }
        for entry in &snapshot.line_item_owners {
            let (kind, owner_id) = owner_columns(&entry.owner);
            tx.execute(
                "INSERT OR REPLACE INTO gradebook_services (item_id, owner_kind, owner_id)
                 VALUES (?1, ?2, ?3)",
                params![entry.item_id.as_str(), kind, owner_id],
            )
            .map_err(|err| db_error(&err))?;
        }
        for instance in &snapshot.tool_instances {
            tx.execute(
                "INSERT INTO lti_types (id, tool_proxy_id) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     tool_proxy_id = COALESCE(excluded.tool_proxy_id, lti_types.tool_proxy_id)",
                params![
                    instance.type_id.as_str(),
                    instance.tool_proxy_id.as_ref().map(ToolProxyId::as_str)
                ],
            )
            .map_err(|err| db_error(&err))?;
            tx.execute(
                "INSERT OR REPLACE INTO lti_instances (id, course_id, type_id) VALUES (?1, ?2, ?3)",
                params![
                    instance.id.as_str(),
                    instance.course_id.as_str(),
                    instance.type_id.as_str()
                ],
            )
            .map_err(|err| db_error(&err))?;
        }
        for grade in &snapshot.grades {
            let id = i64::try_from(grade.id).map_err(|_| {
                SqliteGradebookError::Invalid(format!("grade id {} out of range", grade.id))
            })?;
            if let Some(value) = grade.value {
                ensure_finite("grade value", value)?;
            }
            ensure_finite("grade grade_max", grade.grade_max)?;
            tx.execute(
                "INSERT OR REPLACE INTO grade_grades
                     (id, item_id, user_id, final_grade, grade_max, feedback, time_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    grade.item_id.as_str(),
                    grade.user_id.as_str(),
                    grade.value,
                    grade.grade_max,
                    grade.feedback,
                    grade.time_modified
                ],
            )
            .map_err(|err| db_error(&err))?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(())
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteGradebookError> {
        self.connection.lock().map_err(|_| SqliteGradebookError::Db("mutex poisoned".to_string()))
    }

    /// Loads a line item row.
    fn load_line_item(&self, item_id: &ItemId) -> Result<Option<LineItem>, SqliteGradebookError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT course_id, item_instance, label, grade_max FROM line_items WHERE id = ?1",
                params![item_id.as_str()],
                |row| {
                    let course_id: String = row.get(0)?;
                    let item_instance: Option<String> = row.get(1)?;
                    let label: String = row.get(2)?;
                    let grade_max: f64 = row.get(3)?;
                    Ok((course_id, item_instance, label, grade_max))
                },
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(row.map(|(course_id, item_instance, label, grade_max)| LineItem {
            id: item_id.clone(),
            course_id: ContextId::new(course_id),
            item_instance: item_instance.map(InstanceId::new),
            label,
            grade_max,
        }))
    }

    /// Loads the service-registered owner of a line item.
    fn load_owner(&self, item_id: &ItemId) -> Result<Option<ToolCaller>, SqliteGradebookError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT owner_kind, owner_id FROM gradebook_services WHERE item_id = ?1",
                params![item_id.as_str()],
                |row| {
                    let kind: String = row.get(0)?;
                    let owner_id: String = row.get(1)?;
                    Ok((kind, owner_id))
                },
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        row.map(|(kind, owner_id)| parse_owner(&kind, owner_id)).transpose()
    }

    /// Loads a tool placement joined with its type's proxy.
    fn load_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Option<ToolInstance>, SqliteGradebookError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT i.course_id, i.type_id, t.tool_proxy_id FROM lti_instances i
                 LEFT JOIN lti_types t ON t.id = i.type_id WHERE i.id = ?1",
                params![instance_id.as_str()],
                |row| {
                    let course_id: String = row.get(0)?;
                    let type_id: String = row.get(1)?;
                    let tool_proxy_id: Option<String> = row.get(2)?;
                    Ok((course_id, type_id, tool_proxy_id))
                },
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(row.map(|(course_id, type_id, tool_proxy_id)| ToolInstance {
            id: instance_id.clone(),
            course_id: ContextId::new(course_id),
            type_id: TypeId::new(type_id),
            tool_proxy_id: tool_proxy_id.map(ToolProxyId::new),
        }))
    }

    /// Loads every grade row for an item ordered by id.
    fn load_grades(&self, item_id: &ItemId) -> Result<Vec<GradeRecord>, SqliteGradebookError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, user_id, final_grade, grade_max, feedback, time_modified
                 FROM grade_grades WHERE item_id = ?1 ORDER BY id",
            )
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![item_id.as_str()], |row| {
                let id: i64 = row.get(0)?;
                let user_id: String = row.get(1)?;
                let value: Option<f64> = row.get(2)?;
                let grade_max: f64 = row.get(3)?;
                let feedback: Option<String> = row.get(4)?;
                let time_modified: Option<i64> = row.get(5)?;
                Ok((id, user_id, value, grade_max, feedback, time_modified))
            })
            .map_err(|err| db_error(&err))?;
        let mut grades = Vec::new();
        for row in rows {
            let (id, user_id, value, grade_max, feedback, time_modified) =
                row.map_err(|err| db_error(&err))?;
            let id = u64::try_from(id)
                .map_err(|_| SqliteGradebookError::Invalid(format!("negative grade id {id}")))?;
            grades.push(GradeRecord {
                id,
                item_id: item_id.clone(),
                user_id: UserId::new(user_id),
                value,
                grade_max,
                feedback,
                time_modified,
            });
        }
        Ok(grades)
    }
}

impl CourseLookup for SqliteGradebook {
    fn course(&self, context_id: &ContextId) -> Result<Option<CourseRecord>, StoreError> {
        let guard = self.lock()?;
        let name: Option<String> = guard
            .query_row(
                "SELECT name FROM courses WHERE id = ?1",
                params![context_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(name.map(|name| CourseRecord {
            id: context_id.clone(),
            name,
        }))
    }
}

impl GradeItemLookup for SqliteGradebook {
    fn grade_item(&self, item_id: &ItemId) -> Result<Option<GradeItemRecord>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT course_id, item_instance FROM grade_items WHERE id = ?1",
                params![item_id.as_str()],
                |row| {
                    let course_id: String = row.get(0)?;
                    let item_instance: Option<String> = row.get(1)?;
                    Ok((course_id, item_instance))
                },
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(row.map(|(course_id, item_instance)| GradeItemRecord {
            id: item_id.clone(),
            course_id: ContextId::new(course_id),
            item_instance: item_instance.map(InstanceId::new),
        }))
    }

    fn grade_item_for_instance(
        &self,
        course_id: &ContextId,
        instance_id: &InstanceId,
    ) -> Result<Option<GradeItemRecord>, StoreError> {
        let guard = self.lock()?;
        let id: Option<String> = guard
            .query_row(
                "SELECT id FROM grade_items WHERE course_id = ?1 AND item_instance = ?2
                 ORDER BY id LIMIT 1",
                params![course_id.as_str(), instance_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(id.map(|id| GradeItemRecord {
            id: ItemId::new(id),
            course_id: course_id.clone(),
            item_instance: Some(instance_id.clone()),
        }))
    }
}

impl LineItemResolver for SqliteGradebook {
    fn resolve_line_item(
        &self,
        context_id: &ContextId,
        item_id: &ItemId,
        caller: &ToolCaller,
    ) -> Result<Option<LineItem>, StoreError> {
        let Some(line_item) = self.load_line_item(item_id)? else {
            return Ok(None);
        };
        if &line_item.course_id != context_id {
            return Ok(None);
        }
        let owner = self.load_owner(item_id)?;
        let instance = match &line_item.item_instance {
            Some(instance_id) => self
                .load_instance(instance_id)?
                .filter(|instance| &instance.course_id == context_id),
            None => None,
        };
        if line_item_visible_to(owner.as_ref(), instance.as_ref(), caller) {
            Ok(Some(line_item))
        } else {
            Ok(None)
        }
    }
}

impl ToolInstanceLookup for SqliteGradebook {
    fn tool_instance(
        &self,
        instance_id: &InstanceId,
        course_id: &ContextId,
    ) -> Result<Option<ToolInstance>, StoreError> {
        Ok(self.load_instance(instance_id)?.filter(|instance| &instance.course_id == course_id))
    }
}

impl GradeFetch for SqliteGradebook {
    fn grades(&self, item_id: &ItemId) -> Result<Vec<GradeRecord>, StoreError> {
        self.load_grades(item_id).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a caller into stored owner columns.
fn owner_columns(owner: &ToolCaller) -> (&'static str, &str) {
    match owner {
        ToolCaller::ToolProxy(id) => (OWNER_TOOL_PROXY, id.as_str()),
        ToolCaller::ToolType(id) => (OWNER_TOOL_TYPE, id.as_str()),
    }
}

/// Parses stored owner columns.
fn parse_owner(kind: &str, owner_id: String) -> Result<ToolCaller, SqliteGradebookError> {
    match kind {
        OWNER_TOOL_PROXY => Ok(ToolCaller::ToolProxy(ToolProxyId::new(owner_id))),
        OWNER_TOOL_TYPE => Ok(ToolCaller::ToolType(TypeId::new(owner_id))),
        other => Err(SqliteGradebookError::Invalid(format!("unknown owner kind: {other}"))),
    }
}

/// Rejects NaN and infinite values before they reach the database.
fn ensure_finite(field: &str, value: f64) -> Result<(), SqliteGradebookError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SqliteGradebookError::Invalid(format!("{field} must be finite")))
    }
}

/// Ensures the parent directory exists for the database file.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteGradebookError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|err| SqliteGradebookError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Validates the database path against length limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteGradebookError> {
    let path_string = path.to_string_lossy();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteGradebookError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteGradebookError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteGradebookError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection.
fn open_connection(config: &SqliteGradebookConfig) -> Result<Connection, SqliteGradebookError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteGradebookError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS courses (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL DEFAULT ''
                );
                CREATE TABLE IF NOT EXISTS grade_items (
                    id TEXT PRIMARY KEY,
                    course_id TEXT NOT NULL,
                    item_instance TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_grade_items_instance
                    ON grade_items (course_id, item_instance);
                CREATE TABLE IF NOT EXISTS line_items (
                    id TEXT PRIMARY KEY,
                    course_id TEXT NOT NULL,
                    item_instance TEXT,
                    label TEXT NOT NULL DEFAULT '',
                    grade_max REAL NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS lti_types (
                    id TEXT PRIMARY KEY,
                    tool_proxy_id TEXT
                );
                CREATE TABLE IF NOT EXISTS lti_instances (
                    id TEXT PRIMARY KEY,
                    course_id TEXT NOT NULL,
                    type_id TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS gradebook_services (
                    item_id TEXT PRIMARY KEY,
                    owner_kind TEXT NOT NULL CHECK (owner_kind IN ('tool_proxy', 'tool_type')),
                    owner_id TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS grade_grades (
                    id INTEGER PRIMARY KEY,
                    item_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    final_grade REAL,
                    grade_max REAL NOT NULL DEFAULT 0,
                    feedback TEXT,
                    time_modified INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_grade_grades_item
                    ON grade_grades (item_id, id);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteGradebookError::Invalid(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
