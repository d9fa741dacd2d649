//! The scheduled mapping (§4.1 "Scheduled mapping"). Unlike the other two
//! `decide()` strategies, this one isn't gated behind a `strategy-*`
//! feature and isn't consulted by `decide` at all — it's a separate
//! `lookup(region_id, logical_thread_id)` operation consulted directly by
//! `migrate_schedule` (§4.6), compiled in regardless of which `decide()`
//! strategy is active. The table itself is out of scope (§1: "the
//! region-to-node scheduling table consulted by one of the entry points");
//! this module only owns loading and querying whatever table a deployment
//! provides, the same shape `isgasho-rd/commands/trace_info_command.rs`
//! uses for deserializing a `TraceHeader` with `serde`/`serde_json`.

use crate::log::LogLevel::LogError;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;

#[derive(Deserialize)]
struct ScheduleEntry {
    region: usize,
    logical_tid: i32,
    nid: i32,
}

#[derive(Deserialize)]
struct ScheduleFile {
    entries: Vec<ScheduleEntry>,
}

struct Schedule {
    table: HashMap<(usize, i32), i32>,
}

lazy_static! {
    static ref SCHEDULE: Schedule = load_schedule();
}

fn load_schedule() -> Schedule {
    let path = match env::var("POPCORN_SCHEDULE_FILE") {
        Ok(p) => p,
        Err(_) => {
            return Schedule {
                table: HashMap::new(),
            }
        }
    };
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            crate::log!(LogError, "cannot read schedule file {}: {}", path, e);
            return Schedule {
                table: HashMap::new(),
            };
        }
    };
    let parsed: ScheduleFile = match serde_json::from_str(&contents) {
        Ok(p) => p,
        Err(e) => {
            crate::log!(LogError, "cannot parse schedule file {}: {}", path, e);
            return Schedule {
                table: HashMap::new(),
            };
        }
    };
    let table = parsed
        .entries
        .into_iter()
        .map(|e| ((e.region, e.logical_tid), e.nid))
        .collect();
    Schedule { table }
}

/// `lookup(region_id, logical_thread_id) -> node_id` (§4.1). Returns `-1`
/// (the same "no answer" convention as `current_nid()`) if the table has
/// no entry for this key.
pub fn lookup(region: usize, logical_tid: i32) -> i32 {
    SCHEDULE
        .table
        .get(&(region, logical_tid))
        .copied()
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_reports_no_answer() {
        assert_eq!(lookup(9999, 9999), -1);
    }
}
