//! Fetch-and-normalize routines, one per source kind.

pub mod api;
pub mod csv;
pub mod warehouse;

pub use api::{fetch_table, normalize_json, parse_table, HttpTransport, JsonBody};
pub use csv::{load_csv_bytes, load_csv_path};
pub use warehouse::{SqlWarehouse, Warehouse};
