//! Per-session state: the current table and where it came from.

use crate::source::{Provenance, SourceKind};
use crate::table::Table;

/// A table together with its provenance. Replaced as one value.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub provenance: Provenance,
}

#[derive(Debug, Default)]
pub struct Session {
    current: Option<LoadedTable>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current table and provenance together.
    pub fn replace(&mut self, table: Table, provenance: Provenance) {
        self.current = Some(LoadedTable { table, provenance });
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&LoadedTable> {
        self.current.as_ref()
    }

    pub fn table(&self) -> Option<&Table> {
        self.current.as_ref().map(|c| &c.table)
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.current.as_ref().map(|c| &c.provenance)
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.provenance().map(|p| p.kind)
    }
}
