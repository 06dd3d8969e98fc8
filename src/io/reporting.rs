// src/io/reporting.rs

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::model::role::{Role, PerRole};
use crate::model::snapshot::SnapshotStore;
use crate::simulation::session::GameId;

/// One CSV line: one role in one round.
#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    game: &'a str,
    round: u32,
    role: Role,
    incoming_order: u32,
    incoming_shipment: u32,
    inventory_before: u32,
    inventory_after: u32,
    backlog_before: u32,
    backlog_after: u32,
    order_placed: u32,
    shipment_sent: u32,
    holding_cost: f64,
    backlog_cost: f64,
    total_cost_cumulative: f64,
}

/// Writes every played round of a game to a CSV file.
///
/// # Arguments
/// * `file_path` - Where to save the file (e.g., "results/BEER-123.csv").
/// * `game` - The game the history belongs to.
/// * `snapshots` - The game's snapshot history. Round 0 is skipped.
///
/// Returns the number of rows written.
pub fn write_round_history(
    file_path: impl AsRef<Path>,
    game: &GameId,
    snapshots: &SnapshotStore,
) -> Result<usize, csv::Error> {
    let path = file_path.as_ref();
    let rows = write_rows(csv::Writer::from_path(path)?, game, snapshots)?;
    info!(rows, path = %path.display(), "round history exported");
    Ok(rows)
}

/// Same as [`write_round_history`] but into any writer.
pub fn write_rows<W: Write>(
    mut wtr: csv::Writer<W>,
    game: &GameId,
    snapshots: &SnapshotStore,
) -> Result<usize, csv::Error> {
    let played = snapshots.last_complete_round().unwrap_or(0);
    let histories = PerRole::from_fn(|role| snapshots.history(role));
    let mut rows = 0;

    // Round-major so the file reads like the game was played.
    for round in 1..=played {
        for (_, history) in histories.iter() {
            let Some(s) = history.get(round as usize) else {
                continue;
            };
            wtr.serialize(HistoryRow {
                game: game.as_str(),
                round: s.round,
                role: s.role,
                incoming_order: s.incoming_order,
                incoming_shipment: s.incoming_shipment,
                inventory_before: s.inventory_before,
                inventory_after: s.inventory_after,
                backlog_before: s.backlog_before,
                backlog_after: s.backlog_after,
                order_placed: s.order_placed,
                shipment_sent: s.shipment_sent,
                holding_cost: s.holding_cost,
                backlog_cost: s.backlog_cost,
                total_cost_cumulative: s.total_cost_cumulative,
            })?;
            rows += 1;
        }
    }

    // Flush the buffer to ensure all data is written
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::GameConfig;
    use crate::simulation::engine::ChainSimulation;
    use crate::strategy::implementations::PassThroughPolicy;

    #[test]
    fn exports_one_row_per_role_and_round() {
        let config = GameConfig { total_rounds: 5, ..GameConfig::default() }.validated().unwrap();
        let mut sim = ChainSimulation::new(config, Box::new(PassThroughPolicy::new())).unwrap();
        while sim.advance().unwrap().is_some() {}

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let rows = write_round_history(&path, &GameId::new("BEER-321"), sim.snapshots()).unwrap();
        assert_eq!(rows, 20);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "game");
        assert_eq!(&headers[2], "role");
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 20);
        assert_eq!(&records[0][2], "RETAILER");
        assert_eq!(&records[3][2], "FACTORY");
        assert_eq!(&records[4][1], "2");
    }
}
