//! Shared test utilities for core module tests
//!
//! Provides an in-memory engine that understands a handful of table
//! commands and honors the handle, echo, JSON and dry-run settings closely
//! enough to exercise the context without libnftables or privileges.
//! This module is only compiled in test mode.

use crate::core::context::Context;
use crate::core::engine::{Backend, Engine};
use crate::core::flags::FlagTable;
use std::cell::RefCell;
use std::rc::Rc;

/// Flag values as defined by libnftables 1.x
pub static TEST_FLAGS: FlagTable = FlagTable {
    reverse_dns: 1 << 0,
    service: 1 << 1,
    stateless: 1 << 2,
    handle: 1 << 3,
    json: 1 << 4,
    echo: 1 << 5,
    guid: 1 << 6,
    numeric_proto: 1 << 7,
    numeric_prio: 1 << 8,
    numeric_symbol: 1 << 9,
    numeric_time: 1 << 10,
    numeric_all: (1 << 7) | (1 << 8) | (1 << 9) | (1 << 10),
    terse: 1 << 11,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTable {
    pub family: String,
    pub name: String,
    pub handle: u32,
}

/// Kernel-side state shared by every engine of one [`MockBackend`]
#[derive(Debug, Default)]
pub struct MockState {
    pub tables: Vec<MockTable>,
    pub next_handle: u32,
    pub created: usize,
    pub freed: usize,
    pub fail_create: bool,
    pub fail_buffer_output: bool,
    pub fail_buffer_error: bool,
    pub refuse_dry_run: bool,
}

impl MockState {
    pub fn live(&self) -> usize {
        self.created - self.freed
    }
}

/// Cloneable handle to a mock "library"; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub state: Rc<RefCell<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .tables
            .iter()
            .map(|t| format!("{} {}", t.family, t.name))
            .collect()
    }
}

impl Backend for MockBackend {
    type Engine = MockEngine;

    fn create(&self) -> Option<MockEngine> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return None;
        }
        state.created += 1;
        Some(MockEngine {
            state: Rc::clone(&self.state),
            flags: 0,
            dry_run: false,
        })
    }

    fn flags(&self) -> &'static FlagTable {
        &TEST_FLAGS
    }
}

#[derive(Debug)]
pub struct MockEngine {
    state: Rc<RefCell<MockState>>,
    flags: u32,
    dry_run: bool,
}

impl MockEngine {
    fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    fn format_tables(&self, tables: &[&MockTable]) -> String {
        if self.has(TEST_FLAGS.json) {
            let items: Vec<serde_json::Value> = std::iter::once(serde_json::json!({
                "metainfo": { "version": "1.0.9", "release_name": "mock", "json_schema_version": 1 }
            }))
            .chain(tables.iter().map(|t| {
                serde_json::json!({
                    "table": { "family": t.family, "name": t.name, "handle": t.handle }
                })
            }))
            .collect();
            return format!("{}\n", serde_json::json!({ "nftables": items }));
        }

        tables
            .iter()
            .map(|t| {
                let suffix = if self.has(TEST_FLAGS.handle) {
                    format!(" # handle {}", t.handle)
                } else {
                    String::new()
                };
                format!("table {} {} {{{suffix}\n}}\n", t.family, t.name)
            })
            .collect()
    }

    fn execute(
        &self,
        line: &str,
        tables: &mut Vec<MockTable>,
        next_handle: &mut u32,
    ) -> Result<String, String> {
        fn find(tables: &[MockTable], family: &str, name: &str) -> Option<usize> {
            tables
                .iter()
                .position(|t| t.family == family && t.name == name)
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let missing = || format!("Error: Could not process rule: No such file or directory\n{line}\n");

        match words.as_slice() {
            [verb @ ("add" | "create"), "table", family, name] => {
                if find(tables, family, name).is_some() {
                    if *verb == "create" {
                        return Err(format!("Error: Could not process rule: File exists\n{line}\n"));
                    }
                    return Ok(String::new());
                }
                *next_handle += 1;
                tables.push(MockTable {
                    family: (*family).to_string(),
                    name: (*name).to_string(),
                    handle: *next_handle,
                });
                if self.has(TEST_FLAGS.echo) {
                    let suffix = if self.has(TEST_FLAGS.handle) {
                        format!(" # handle {next_handle}")
                    } else {
                        String::new()
                    };
                    return Ok(format!("add table {family} {name}{suffix}\n"));
                }
                Ok(String::new())
            }
            ["delete", "table", family, name] => {
                let idx = find(tables, family, name).ok_or_else(missing)?;
                tables.remove(idx);
                Ok(String::new())
            }
            ["list", "table", family, name] => {
                let idx = find(tables, family, name).ok_or_else(missing)?;
                Ok(self.format_tables(&[&tables[idx]]))
            }
            ["list", "ruleset"] => Ok(self.format_tables(&tables.iter().collect::<Vec<_>>())),
            ["flush", "ruleset"] => {
                tables.clear();
                Ok(String::new())
            }
            _ => Err(format!(
                "Error: syntax error, unexpected string\n{line}\n{}\n",
                "^".repeat(line.len())
            )),
        }
    }
}

impl Engine for MockEngine {
    fn output_flags(&self) -> u32 {
        self.flags
    }

    fn set_output_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn set_dry_run(&mut self, enabled: bool) {
        if !self.state.borrow().refuse_dry_run {
            self.dry_run = enabled;
        }
    }

    fn buffer_output(&mut self) -> bool {
        !self.state.borrow().fail_buffer_output
    }

    fn buffer_error(&mut self) -> bool {
        !self.state.borrow().fail_buffer_error
    }

    /// Runs the whole batch against a copy and commits only if every line
    /// succeeds and dry-run is off, like an nftables transaction.
    fn run_cmd(&mut self, cmd: &str) -> Result<String, String> {
        let (mut tables, mut next_handle) = {
            let state = self.state.borrow();
            (state.tables.clone(), state.next_handle)
        };

        let mut output = String::new();
        for line in cmd.lines().map(str::trim).filter(|l| !l.is_empty()) {
            output.push_str(&self.execute(line, &mut tables, &mut next_handle)?);
        }

        if !self.dry_run {
            let mut state = self.state.borrow_mut();
            state.tables = tables;
            state.next_handle = next_handle;
        }
        Ok(output)
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.state.borrow_mut().freed += 1;
    }
}

/// Creates a ready context over a fresh mock backend.
///
/// Returns the backend too so tests can inspect or sabotage its state.
pub fn mock_context() -> (Context<MockBackend>, MockBackend) {
    let backend = MockBackend::new();
    let ctx = Context::new(backend.clone()).expect("mock context should initialize");
    (ctx, backend)
}
