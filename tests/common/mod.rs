#![allow(dead_code)]

use datadash::{
    AppConfig, Dashboard, DashboardEvent, HttpTransport, LoadError, ManualClock, Table, Warehouse,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub const SALES_CSV: &str = "tests/sample-data/sales.csv";

pub fn sample_path() -> &'static Path {
    Path::new(SALES_CSV)
}

pub fn sample_bytes() -> Vec<u8> {
    std::fs::read(SALES_CSV).unwrap()
}

pub fn upload_sample() -> DashboardEvent {
    DashboardEvent::Upload {
        filename: "sales.csv".to_string(),
        bytes: sample_bytes(),
    }
}

/// Transport that answers from a queue of canned responses and counts requests.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    calls: Rc<Cell<usize>>,
    responses: Rc<RefCell<Vec<Result<String, LoadError>>>>,
}

impl ScriptedTransport {
    /// Always answers with `body`.
    pub fn returning(body: &str) -> Self {
        let transport = Self::default();
        transport.push(Ok(body.to_string()));
        transport
    }

    pub fn push(&self, response: Result<String, LoadError>) {
        self.responses.borrow_mut().push(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, _url: &str, _timeout: Duration) -> Result<String, LoadError> {
        self.calls.set(self.calls.get() + 1);
        let mut responses = self.responses.borrow_mut();
        // The last response repeats once the queue is drained.
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses
                .first()
                .cloned()
                .unwrap_or_else(|| Err(LoadError::Transport("no response".to_string())))
        }
    }
}

/// Warehouse that is never configured.
pub struct Offline;

impl Warehouse for Offline {
    fn execute(&self, _query: &str) -> Result<Table, LoadError> {
        Err(LoadError::Connection("no warehouse tables configured".to_string()))
    }
}

pub fn dashboard_with(
    config: AppConfig,
    transport: ScriptedTransport,
    warehouse: Box<dyn Warehouse>,
) -> (Dashboard<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let dashboard = Dashboard::with_clock(config, Box::new(transport), warehouse, clock.clone());
    (dashboard, clock)
}

pub fn dashboard(transport: ScriptedTransport) -> (Dashboard<ManualClock>, ManualClock) {
    dashboard_with(AppConfig::default(), transport, Box::new(Offline))
}

pub fn temp_output_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}
