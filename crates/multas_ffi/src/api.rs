//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose board read, counter adjust and bulk reset flows to Dart via FRB.
//! - Own the single process-wide board and keep it behind one lock.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are returned as envelopes with `ok=false`, never thrown.
//! - A failed load keeps an empty board open so the UI stays interactive.
//!   Every action except `board_refresh` answers `ok=false` with the load
//!   error until a refresh succeeds.

use log::warn;
use multas_core::db::open_db;
use multas_core::{
    core_version as core_version_inner, format_amount, init_logging as init_logging_inner,
    ping as ping_inner, BoardSnapshot, Counter, Direction, ResetState, ScoreboardConfig,
    ScoreboardError, ScoreboardService, SqliteRecordStore,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const DEFAULT_DB_FILE_NAME: &str = "multas.sqlite3";
const DB_PATH_ENV: &str = "MULTAS_DB_PATH";
const CONFIG_PATH_ENV: &str = "MULTAS_CONFIG_PATH";

type Board = ScoreboardService<SqliteRecordStore>;

static BOARD: Mutex<Option<Board>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive); empty
///   selects the build-mode default (`debug` or `info`).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One person row as rendered by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRowView {
    pub person_id: String,
    pub name: String,
    /// Avatar fallback letter; empty when the name is blank.
    pub initial: String,
    pub photo_url: String,
    pub minor_count: u32,
    pub major_count: u32,
    pub minor_fine_label: String,
    pub major_fine_label: String,
    pub total: u64,
}

/// Whole-board view including reset dialog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub rows: Vec<BoardRowView>,
    pub grand_total: u64,
    pub grand_total_label: String,
    /// `idle|confirm_pending|committing|confirmed`.
    pub reset_state: String,
    pub dialog_open: bool,
    /// Success message while the reset confirmation is showing.
    pub reset_message: Option<String>,
    /// Banner from the last failed reset commit.
    pub reset_error: Option<String>,
    /// Milliseconds until the UI should call `reset_tick`.
    pub dismiss_in_ms: Option<u64>,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardActionResponse {
    pub ok: bool,
    pub message: String,
    /// Board after the action, also on failure.
    pub board: Option<BoardView>,
}

impl BoardActionResponse {
    fn success(message: impl Into<String>, board: BoardView) -> Self {
        Self {
            ok: true,
            message: message.into(),
            board: Some(board),
        }
    }

    fn failure(message: impl Into<String>, board: Option<BoardView>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            board,
        }
    }
}

/// Opens the board on `db_path`, replacing any board already open.
///
/// # FFI contract
/// - Async call (worker thread), DB-backed.
/// - `config_json` overrides `ScoreboardConfig` fields; `None` uses defaults.
/// - On a failed first load returns `ok=false` with an empty board kept open.
pub fn board_open(db_path: String, config_json: Option<String>) -> BoardActionResponse {
    let config = match config_json.as_deref().map(ScoreboardConfig::from_json_str) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            return BoardActionResponse::failure(format!("board_open failed: {err}"), None);
        }
        None => ScoreboardConfig::default(),
    };

    let mut guard = lock_board();
    *guard = None;
    let message = match install_board(&mut guard, PathBuf::from(db_path.trim()), config) {
        Ok(message) => message,
        Err(err) => {
            return BoardActionResponse::failure(format!("board_open failed: {err}"), None);
        }
    };
    respond(&guard, message)
}

/// Returns the current board without touching the store.
#[flutter_rust_bridge::frb(sync)]
pub fn board_snapshot() -> BoardActionResponse {
    with_board(|board| Ok(("Board loaded.".to_string(), board_view(board))))
}

/// Re-reads every person from the store.
///
/// On failure the previous rows are kept and returned.
pub fn board_refresh() -> BoardActionResponse {
    with_open_board(|board| {
        let count = board.refresh()?;
        Ok((format!("Loaded {count} people."), board_view(board)))
    })
}

/// Adjusts one counter of one person.
///
/// Input semantics:
/// - `counter`: `minor|major`.
/// - `direction`: `increase|decrease`; decrease stops at zero.
pub fn adjust_counter(
    person_id: String,
    counter: String,
    direction: String,
) -> BoardActionResponse {
    let Some(counter) = Counter::parse(&counter) else {
        return BoardActionResponse::failure(format!("unsupported counter `{counter}`"), None);
    };
    let Some(direction) = Direction::parse(&direction) else {
        return BoardActionResponse::failure(format!("unsupported direction `{direction}`"), None);
    };

    with_board(|board| {
        let value = board.adjust_counter(person_id.trim(), counter, direction)?;
        Ok((
            format!("{} set to {value}.", counter.as_str()),
            board_view(board),
        ))
    })
}

/// Opens the reset-all confirmation.
#[flutter_rust_bridge::frb(sync)]
pub fn reset_request() -> BoardActionResponse {
    with_board(|board| {
        board.request_reset()?;
        Ok(("Confirm reset.".to_string(), board_view(board)))
    })
}

/// Closes the reset-all confirmation without writing.
#[flutter_rust_bridge::frb(sync)]
pub fn reset_cancel() -> BoardActionResponse {
    with_board(|board| {
        board.cancel_reset()?;
        Ok(("Reset cancelled.".to_string(), board_view(board)))
    })
}

/// Commits the reset-all batch.
///
/// On failure the confirmation stays open with `reset_error` set.
pub fn reset_confirm() -> BoardActionResponse {
    with_board(|board| {
        board.confirm_reset(Instant::now())?;
        Ok(("All fines reset.".to_string(), board_view(board)))
    })
}

/// Closes the success message early.
#[flutter_rust_bridge::frb(sync)]
pub fn reset_dismiss() -> BoardActionResponse {
    with_board(|board| {
        board.dismiss_reset()?;
        Ok(("Reset dialog closed.".to_string(), board_view(board)))
    })
}

/// Fires the auto-dismiss timer; a no-op before the deadline.
#[flutter_rust_bridge::frb(sync)]
pub fn reset_tick() -> BoardActionResponse {
    with_board(|board| {
        let closed = board.tick(Instant::now());
        let message = if closed {
            "Reset dialog closed."
        } else {
            "No change."
        };
        Ok((message.to_string(), board_view(board)))
    })
}

fn lock_board() -> MutexGuard<'static, Option<Board>> {
    BOARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Opens the store and loads the board into `slot`.
///
/// Returns `Err` only when the database cannot be opened. A failed fetch
/// still installs the (empty) board and is reported in the message.
fn install_board(
    slot: &mut Option<Board>,
    db_path: PathBuf,
    config: ScoreboardConfig,
) -> Result<String, String> {
    let conn = open_db(&db_path).map_err(|err| format!("board DB open failed: {err}"))?;
    let mut board = ScoreboardService::new(SqliteRecordStore::new(conn), config)
        .map_err(|err| err.to_string())?;
    let message = match board.refresh() {
        Ok(count) => format!("Loaded {count} people."),
        Err(err) => {
            warn!("event=board_open module=ffi status=error error={err}");
            format!("load failed: {err}")
        }
    };
    *slot = Some(board);
    Ok(message)
}

/// Runs `f` on a loaded board, opening it from the environment on first use.
///
/// While the last load failed every action is refused with the load error
/// and the (empty) board.
fn with_board(
    f: impl FnOnce(&mut Board) -> Result<(String, BoardView), ScoreboardError>,
) -> BoardActionResponse {
    run_on_board(true, f)
}

/// Like [`with_board`] but also runs while the board is not loaded.
fn with_open_board(
    f: impl FnOnce(&mut Board) -> Result<(String, BoardView), ScoreboardError>,
) -> BoardActionResponse {
    run_on_board(false, f)
}

fn run_on_board(
    require_loaded: bool,
    f: impl FnOnce(&mut Board) -> Result<(String, BoardView), ScoreboardError>,
) -> BoardActionResponse {
    let mut guard = lock_board();
    let mut load_message = None;
    if guard.is_none() {
        let config = match resolve_config() {
            Ok(config) => config,
            Err(err) => return BoardActionResponse::failure(err, None),
        };
        match install_board(&mut guard, resolve_db_path(), config) {
            Ok(message) => load_message = Some(message),
            Err(err) => return BoardActionResponse::failure(err, None),
        }
    }

    let Some(board) = guard.as_mut() else {
        return BoardActionResponse::failure("board is not open", None);
    };
    if require_loaded && !board.is_loaded() {
        let message = load_message
            .unwrap_or_else(|| "board is not loaded; call board_refresh".to_string());
        return BoardActionResponse::failure(message, Some(board_view(board)));
    }

    match f(board) {
        Ok((message, view)) => BoardActionResponse::success(message, view),
        Err(err) => BoardActionResponse::failure(err.to_string(), Some(board_view(board))),
    }
}

fn respond(guard: &Option<Board>, message: String) -> BoardActionResponse {
    match guard.as_ref() {
        Some(board) if board.is_loaded() => {
            BoardActionResponse::success(message, board_view(board))
        }
        Some(board) => BoardActionResponse::failure(message, Some(board_view(board))),
        None => BoardActionResponse::failure("board is not open", None),
    }
}

fn resolve_db_path() -> PathBuf {
    match std::env::var(DB_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
    }
}

fn resolve_config() -> Result<ScoreboardConfig, String> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            ScoreboardConfig::load(raw.trim()).map_err(|err| err.to_string())
        }
        _ => Ok(ScoreboardConfig::default()),
    }
}

fn board_view(board: &Board) -> BoardView {
    let BoardSnapshot {
        rows,
        grand_total,
        reset_state,
    } = board.board();
    let now = Instant::now();

    BoardView {
        rows: rows
            .into_iter()
            .map(|row| BoardRowView {
                initial: row.person.initial().map(String::from).unwrap_or_default(),
                person_id: row.person.id,
                name: row.person.name,
                photo_url: row.person.photo_url,
                minor_count: row.person.minor_count,
                major_count: row.person.major_count,
                minor_fine_label: format_amount(row.minor_fine),
                major_fine_label: format_amount(row.major_fine),
                total: row.total,
            })
            .collect(),
        grand_total,
        grand_total_label: format_amount(grand_total),
        reset_state: reset_state.name().to_string(),
        dialog_open: board.reset_flow().is_dialog_open(),
        reset_message: board.reset_flow().transient_message().map(str::to_string),
        reset_error: board.reset_flow().error_message().map(str::to_string),
        dismiss_in_ms: match reset_state {
            ResetState::Confirmed { dismiss_at, .. } => Some(
                u64::try_from(dismiss_at.saturating_duration_since(now).as_millis())
                    .unwrap_or(u64::MAX),
            ),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{adjust_counter, board_open, board_refresh, board_snapshot, core_version};
    use super::{init_logging, lock_board, ping, reset_cancel, reset_confirm, reset_request};
    use super::{reset_tick, CONFIG_PATH_ENV, DB_PATH_ENV};
    use multas_core::db::open_db;
    use multas_core::{RecordStore, SqliteRecordStore};
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::{Mutex, MutexGuard};

    // Serializes tests that touch the process-wide board or its env vars.
    static BOARD_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn board_test_guard() -> MutexGuard<'static, ()> {
        BOARD_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn seed_person(path: &Path, document: Value) -> String {
        let Value::Object(fields) = document else {
            panic!("fixture must be a JSON object");
        };
        let store = SqliteRecordStore::new(open_db(path).unwrap());
        store.insert_document("usuarios", &fields).unwrap()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn adjust_counter_rejects_unknown_selectors_without_opening_board() {
        let response =
            adjust_counter("a".to_string(), "medium".to_string(), "increase".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("counter"));

        let response =
            adjust_counter("a".to_string(), "minor".to_string(), "sideways".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("direction"));
    }

    #[test]
    fn board_open_rejects_invalid_config_json() {
        let response = board_open("/tmp/unused.sqlite3".to_string(), Some("{".to_string()));
        assert!(!response.ok);
        assert!(response.board.is_none());
    }

    #[test]
    fn board_flow_adjusts_and_resets_seeded_database() {
        let _guard = board_test_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.sqlite3");
        let person_id = seed_person(
            &path,
            json!({ "Nombre": "Ana", "GroseriasLeves": 2, "GroseriasFuertes": 1 }),
        );

        let opened = board_open(path.to_str().unwrap().to_string(), None);
        assert!(opened.ok, "{}", opened.message);
        let board = opened.board.unwrap();
        assert_eq!(board.grand_total, 900);
        assert_eq!(board.grand_total_label, "$900");
        assert_eq!(board.rows[0].initial, "A");
        assert_eq!(board.rows[0].photo_url, "/placeholder.svg");

        let adjusted = adjust_counter(person_id, "major".to_string(), "increase".to_string());
        assert!(adjusted.ok, "{}", adjusted.message);
        assert_eq!(adjusted.board.unwrap().grand_total_label, "$1,400");

        assert!(reset_request().ok);
        assert!(reset_cancel().ok);
        assert!(!reset_confirm().ok, "confirm requires an open dialog");

        assert!(reset_request().ok);
        let confirmed = reset_confirm();
        assert!(confirmed.ok, "{}", confirmed.message);
        let board = confirmed.board.unwrap();
        assert_eq!(board.grand_total, 0);
        assert!(board.dialog_open);
        assert!(board.reset_message.is_some());
        assert!(board.dismiss_in_ms.is_some());

        let ticked = reset_tick();
        assert!(ticked.ok);
        assert_eq!(ticked.board.unwrap().reset_state, "confirmed");
    }

    #[test]
    fn lazy_open_with_failed_load_refuses_actions_until_refresh() {
        let _guard = board_test_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.sqlite3");
        let person_id = seed_person(&path, json!({ "Nombre": "Ana", "GroseriasLeves": "many" }));

        *lock_board() = None;
        std::env::set_var(DB_PATH_ENV, &path);
        std::env::remove_var(CONFIG_PATH_ENV);

        let snapshot = board_snapshot();
        assert!(!snapshot.ok);
        assert!(snapshot.message.contains("load failed"), "{}", snapshot.message);
        assert!(snapshot.board.unwrap().rows.is_empty());

        let requested = reset_request();
        assert!(!requested.ok);
        assert_eq!(requested.board.unwrap().reset_state, "idle");
        assert!(!reset_confirm().ok);

        let store = SqliteRecordStore::new(open_db(&path).unwrap());
        store
            .update_field("usuarios", &person_id, "GroseriasLeves", json!(2))
            .unwrap();
        drop(store);

        let refreshed = board_refresh();
        assert!(refreshed.ok, "{}", refreshed.message);
        assert_eq!(refreshed.board.unwrap().grand_total, 400);
        assert!(board_snapshot().ok);

        std::env::remove_var(DB_PATH_ENV);
        *lock_board() = None;
    }

    #[test]
    fn failed_actions_return_errors_with_unchanged_board() {
        let _guard = board_test_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.sqlite3");
        let ana = seed_person(
            &path,
            json!({ "Nombre": "Ana", "GroseriasLeves": 2, "GroseriasFuertes": 1 }),
        );
        let beto = seed_person(&path, json!({ "Nombre": "Beto", "GroseriasFuertes": 3 }));

        let opened = board_open(path.to_str().unwrap().to_string(), None);
        assert!(opened.ok, "{}", opened.message);
        assert_eq!(opened.board.unwrap().grand_total, 2400);

        let unknown = adjust_counter(
            "ghost".to_string(),
            "minor".to_string(),
            "increase".to_string(),
        );
        assert!(!unknown.ok);
        assert!(unknown.message.contains("ghost"), "{}", unknown.message);
        let board = unknown.board.unwrap();
        assert_eq!(board.rows.len(), 2);
        assert_eq!(board.grand_total, 2400);

        // Another writer removes one person, so the reset batch cannot apply.
        let conn = open_db(&path).unwrap();
        conn.execute("DELETE FROM documents WHERE id = ?1;", [beto.as_str()])
            .unwrap();
        drop(conn);

        assert!(reset_request().ok);
        let confirmed = reset_confirm();
        assert!(!confirmed.ok);
        let board = confirmed.board.unwrap();
        assert_eq!(board.reset_state, "confirm_pending");
        assert!(board.dialog_open);
        assert!(board.reset_error.is_some());
        assert!(board.reset_message.is_none());
        assert_eq!(board.grand_total, 2400);

        let stored = SqliteRecordStore::new(open_db(&path).unwrap())
            .get_document("usuarios", &ana)
            .unwrap()
            .unwrap();
        assert_eq!(stored.fields["GroseriasLeves"], json!(2));

        assert!(reset_cancel().ok);
    }
}
