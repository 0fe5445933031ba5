//! NaN scrubbing.
//!
//! Every not-a-number sentinel reachable through tables, arrays, maps and
//! lists becomes the explicit `Null` marker, so downstream JSON is lossless.
//! The input is never mutated; container types, table names, indexes and
//! column types survive unchanged.

use crate::datum::{Datum, Table};

/// Deep copy of `value` with every NaN replaced by `Null`.
pub fn sanitize(value: &Datum) -> Datum {
    match value {
        Datum::Float(f) if f.is_nan() => Datum::Null,
        Datum::List(items) => Datum::List(items.iter().map(sanitize).collect()),
        Datum::Map(map) => Datum::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), sanitize(item)))
                .collect(),
        ),
        Datum::Array(cells) => Datum::Array(
            cells
                .iter()
                .map(|cell| cell.filter(|f| !f.is_nan()))
                .collect(),
        ),
        Datum::Table(table) => Datum::Table(sanitize_table(table)),
        other => other.clone(),
    }
}

/// Table form of [`sanitize`].
pub fn sanitize_table(table: &Table) -> Table {
    table.map_cells(sanitize)
}

/// True when no NaN is reachable from `value`.
pub fn is_sanitized(value: &Datum) -> bool {
    match value {
        Datum::Float(f) => !f.is_nan(),
        Datum::List(items) => items.iter().all(is_sanitized),
        Datum::Map(map) => map.values().all(is_sanitized),
        Datum::Array(cells) => cells.iter().flatten().all(|f| !f.is_nan()),
        Datum::Table(table) => table.rows().iter().flatten().all(is_sanitized),
        _ => true,
    }
}
