//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `multas_core` linkage and print the board for quick checks.
//! - With a database path, print that database; without one, print a
//!   built-in demo board.

use multas_core::db::open_db;
use multas_core::model::person::FIELD_NAME;
use multas_core::{
    format_amount, BoardSnapshot, Counter, Fields, InMemoryRecordStore, ScoreboardConfig,
    ScoreboardService, SqliteRecordStore,
};
use serde_json::Value;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("multas_core ping={}", multas_core::ping());
    println!("multas_core version={}", multas_core::core_version());

    let config = ScoreboardConfig::default();
    let board = match std::env::args().nth(1) {
        Some(path) => open_db(&path)
            .map_err(|err| err.to_string())
            .and_then(|conn| {
                ScoreboardService::open(SqliteRecordStore::new(conn), config)
                    .map(|service| service.board())
                    .map_err(|err| err.to_string())
            }),
        None => ScoreboardService::open(demo_store(&config.collection), config)
            .map(|service| service.board())
            .map_err(|err| err.to_string()),
    };

    match board {
        Ok(board) => {
            print_board(&board);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("multas_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn demo_store(collection: &str) -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    for (name, minor, major) in [("Ana", 2_u32, 1_u32), ("Beto", 0, 3)] {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), Value::from(name));
        fields.insert(Counter::Minor.field_name().to_string(), Value::from(minor));
        fields.insert(Counter::Major.field_name().to_string(), Value::from(major));
        store.insert(collection, fields);
    }
    store
}

fn print_board(board: &BoardSnapshot) {
    for row in &board.rows {
        println!(
            "{:<24} leves={:>3} ({:>8})  fuertes={:>3} ({:>8})  total={:>10}",
            row.person.name,
            row.person.minor_count,
            format_amount(row.minor_fine),
            row.person.major_count,
            format_amount(row.major_fine),
            format_amount(row.total)
        );
    }
    println!("Total Recaudado: {}", format_amount(board.grand_total));
}
