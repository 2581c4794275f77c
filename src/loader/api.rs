//! HTTP JSON loader: fetch a URL and normalize the body into a table.

use crate::error::LoadError;
use crate::source::{endpoint, Endpoint};
use crate::table::Table;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Column that receives array elements which are not objects.
pub const SCALAR_COLUMN: &str = "value";

/// Blocking GET returning the response body. Status >= 400 is an error.
pub trait HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, LoadError>;
}

/// Top-level shape of a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonBody {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl JsonBody {
    pub fn parse(body: &str) -> Result<Self, LoadError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| LoadError::Decode(e.to_string()))?;
        match value {
            Value::Array(items) => Ok(Self::Array(items)),
            Value::Object(map) => Ok(Self::Object(map)),
            other => Err(LoadError::Decode(format!(
                "expected a JSON array or object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Turn a parsed body into rows.
///
/// Arrays are row lists. Objects are searched for the first of `data_keys`;
/// its value is the row list (or a single row when it is an object). An
/// object with none of the keys is itself a single row. An empty object, or a
/// key holding `null`, is an empty table.
pub fn normalize_json(body: JsonBody, data_keys: &[String]) -> Result<Table, LoadError> {
    match body {
        JsonBody::Array(items) => rows_to_table(&items),
        JsonBody::Object(map) => {
            let preferred = data_keys
                .iter()
                .find_map(|key| map.get(key).map(|v| (key, v)));
            match preferred {
                Some((_, Value::Array(items))) => rows_to_table(items),
                Some((_, Value::Object(row))) => object_to_table(row),
                Some((_, Value::Null)) => Ok(Table::empty()),
                Some((key, other)) => Err(LoadError::Decode(format!(
                    "'{}' holds {}, expected a list of records",
                    key,
                    json_kind(other)
                ))),
                None => object_to_table(&map),
            }
        }
    }
}

/// Parse and normalize in one step.
pub fn parse_table(body: &str, data_keys: &[String]) -> Result<Table, LoadError> {
    normalize_json(JsonBody::parse(body)?, data_keys)
}

/// GET `url` through `transport` and normalize the response.
pub fn fetch_table(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
    data_keys: &[String],
) -> Result<Table, LoadError> {
    let url = match endpoint(url) {
        Endpoint::Http(url) => url,
        Endpoint::Unsupported(url) => {
            return Err(LoadError::Transport(format!(
                "unsupported URL '{}': only http:// and https:// endpoints can be fetched",
                url
            )))
        }
    };
    debug!(url = %url, timeout_secs = timeout.as_secs(), "fetching api endpoint");
    let body = transport.get(&url, timeout)?;
    parse_table(&body, data_keys)
}

fn object_to_table(row: &Map<String, Value>) -> Result<Table, LoadError> {
    if row.is_empty() {
        return Ok(Table::empty());
    }
    rows_to_table(std::slice::from_ref(&Value::Object(row.clone())))
}

fn rows_to_table(items: &[Value]) -> Result<Table, LoadError> {
    if items.is_empty() {
        return Ok(Table::empty());
    }

    // Column names in first-appearance order.
    let mut names: Vec<String> = Vec::new();
    for item in items {
        match item {
            Value::Object(map) => {
                for key in map.keys() {
                    if !names.iter().any(|n| n == key) {
                        names.push(key.clone());
                    }
                }
            }
            _ => {
                if !names.iter().any(|n| n == SCALAR_COLUMN) {
                    names.push(SCALAR_COLUMN.to_string());
                }
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let cells: Vec<&Value> = items.iter().map(|item| cell(item, name)).collect();
            build_column(name, &cells).into()
        })
        .collect::<Vec<Column>>();

    let df = DataFrame::new(columns).map_err(|e| LoadError::Decode(e.to_string()))?;
    Ok(Table::new(df))
}

fn cell<'a>(item: &'a Value, column: &str) -> &'a Value {
    match item {
        Value::Object(map) => map.get(column).unwrap_or(&Value::Null),
        scalar if column == SCALAR_COLUMN => scalar,
        _ => &Value::Null,
    }
}

fn build_column(name: &str, cells: &[&Value]) -> Series {
    let present: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();
    let name: PlSmallStr = name.into();

    if !present.is_empty() && present.iter().all(|v| v.is_boolean()) {
        let values: Vec<Option<bool>> = cells.iter().map(|v| v.as_bool()).collect();
        return Series::new(name, values);
    }
    if !present.is_empty() && present.iter().all(|v| v.is_i64()) {
        let values: Vec<Option<i64>> = cells.iter().map(|v| v.as_i64()).collect();
        return Series::new(name, values);
    }
    if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        let values: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
        return Series::new(name, values);
    }

    // Strings, mixed kinds and nested values all become text.
    let values: Vec<Option<String>> = cells
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    Series::new(name, values)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Blocking transport backed by a shared ureq agent.
#[cfg(feature = "http")]
pub struct UreqTransport {
    agent: ureq::Agent,
}

#[cfg(feature = "http")]
impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, LoadError> {
        use std::io::Read;

        let secs = timeout.as_secs();
        let response = self
            .agent
            .get(url)
            .timeout(timeout)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => LoadError::Http {
                    status,
                    reason: response.status_text().to_string(),
                },
                ureq::Error::Transport(t) if is_timeout(&t) => LoadError::Timeout { secs },
                ureq::Error::Transport(t) => LoadError::Transport(t.to_string()),
            })?;

        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    LoadError::Timeout { secs }
                }
                std::io::ErrorKind::InvalidData => LoadError::Decode(e.to_string()),
                _ => LoadError::Transport(e.to_string()),
            })?;
        Ok(body)
    }
}

#[cfg(feature = "http")]
fn is_timeout(transport: &ureq::Transport) -> bool {
    use std::error::Error;

    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

/// Stand-in used when the crate is built without the `http` feature.
#[cfg(not(feature = "http"))]
pub struct UnavailableTransport;

#[cfg(not(feature = "http"))]
impl HttpTransport for UnavailableTransport {
    fn get(&self, _url: &str, _timeout: Duration) -> Result<String, LoadError> {
        Err(LoadError::Transport(
            "HTTP support is not enabled in this build".to_string(),
        ))
    }
}

/// Transport used by the dashboard when none is supplied.
pub fn default_transport() -> Box<dyn HttpTransport> {
    #[cfg(feature = "http")]
    {
        Box::new(UreqTransport::new())
    }
    #[cfg(not(feature = "http"))]
    {
        Box::new(UnavailableTransport)
    }
}
