//! In-process graph store used for tests and offline runs

use super::result_parser::{Value, render_rows};
use super::statement::{EdgeKind, Lookup, LookupKind, NodeRef, Statement, SymbolKey, SymbolNode};
use super::store::GraphStore;
use crate::error::GraphError;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Edge {
    kind: EdgeKind,
    from: NodeRef,
    to: NodeRef,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, Option<String>>,
    symbols: BTreeMap<SymbolKey, SymbolNode>,
    edges: BTreeSet<Edge>,
    constraints: BTreeSet<String>,
}

/// Node and edge counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub files: usize,
    pub symbols: usize,
    pub edges: usize,
    pub constraints: usize,
}

impl GraphStats {
    pub fn nodes(&self) -> usize {
        self.files + self.symbols
    }
}

/// Applies statements with MERGE semantics: nodes are maps keyed by
/// identity, edges a set, so repeating a statement changes nothing. Edges
/// whose endpoints do not exist are not created, as with `MATCH`.
#[derive(Default)]
pub struct InMemoryGraphStore {
    state: Mutex<State>,
    calls: AtomicUsize,
    failing: Mutex<Vec<String>>,
    lookup_delay: Mutex<Option<Duration>>,
    kind_delays: Mutex<Vec<(LookupKind, Duration)>>,
    lookups: Mutex<Vec<Lookup>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| GraphError::ConnectionFailed(format!("graph state lock poisoned: {}", e)).into())
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `execute` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reject any call whose rendered script contains `needle`. The
    /// rejected call applies none of its statements.
    pub fn fail_calls_containing(&self, needle: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(needle.to_string());
        }
    }

    /// Delay every call that carries a lookup
    pub fn delay_lookups(&self, delay: Duration) {
        if let Ok(mut slot) = self.lookup_delay.lock() {
            *slot = Some(delay);
        }
    }

    /// Delay only calls carrying a lookup of `kind`
    pub fn delay_lookups_of(&self, kind: LookupKind, delay: Duration) {
        if let Ok(mut delays) = self.kind_delays.lock() {
            delays.push((kind, delay));
        }
    }

    /// Lookups received so far, in arrival order
    pub fn lookups(&self) -> Vec<Lookup> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn stats(&self) -> GraphStats {
        match self.state.lock() {
            Ok(state) => GraphStats {
                files: state.files.len(),
                symbols: state.symbols.len(),
                edges: state.edges.len(),
                constraints: state.constraints.len(),
            },
            Err(_) => GraphStats::default(),
        }
    }

    /// Whether an edge of `kind` links the two nodes
    pub fn has_edge(&self, kind: EdgeKind, from: &NodeRef, to: &NodeRef) -> bool {
        let edge = Edge {
            kind,
            from: from.clone(),
            to: to.clone(),
        };
        self.state
            .lock()
            .map(|s| s.edges.contains(&edge))
            .unwrap_or(false)
    }

    fn rejects(&self, statements: &[Statement]) -> Result<bool> {
        let failing = lock(&self.failing)?;
        if failing.is_empty() {
            return Ok(false);
        }
        let script = super::statement::render_batch(statements);
        Ok(failing.iter().any(|needle| script.contains(needle.as_str())))
    }
}

impl State {
    fn exists(&self, node: &NodeRef) -> bool {
        match node {
            NodeRef::File(path) => self.files.contains_key(path),
            NodeRef::Symbol(key) => self.symbols.contains_key(key),
        }
    }

    fn apply(&mut self, statement: &Statement) -> Option<String> {
        match statement {
            Statement::Constraint(c) => {
                self.constraints.insert(c.name.clone());
            }
            Statement::MergeFile { filepath, language } => {
                self.files.insert(filepath.clone(), Some(language.clone()));
            }
            Statement::MergeSymbol(node) => {
                self.symbols.insert(node.key.clone(), node.clone());
            }
            Statement::MergeImport { from, to } => {
                self.files.entry(from.clone()).or_insert(None);
                self.files.entry(to.clone()).or_insert(None);
                self.edges.insert(Edge {
                    kind: EdgeKind::Imports,
                    from: NodeRef::File(from.clone()),
                    to: NodeRef::File(to.clone()),
                });
            }
            Statement::MergeEdge { kind, from, to } => {
                if self.exists(from) && self.exists(to) {
                    self.edges.insert(Edge {
                        kind: *kind,
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
            Statement::Lookup(lookup) => return Some(self.lookup(lookup)),
            Statement::DetachDeleteAll => {
                self.files.clear();
                self.symbols.clear();
                self.edges.clear();
            }
        }
        None
    }

    /// File a symbol is defined in, if the DEFINED_IN edge exists
    fn defined_in<'a>(&self, key: &'a SymbolKey) -> Option<&'a str> {
        let edge = Edge {
            kind: EdgeKind::DefinedIn,
            from: NodeRef::Symbol(key.clone()),
            to: NodeRef::File(key.filepath.clone()),
        };
        self.edges.contains(&edge).then_some(key.filepath.as_str())
    }

    fn lookup(&self, lookup: &Lookup) -> String {
        let scoped = |path: &str| lookup.files.iter().any(|f| f == path);
        let text = |s: &str| Value::Text(s.to_string());

        let rows: Vec<Vec<Value>> = match lookup.kind {
            LookupKind::Symbols => self
                .symbols
                .values()
                .filter(|node| self.defined_in(&node.key).is_some_and(scoped))
                .map(|node| {
                    vec![
                        text(&node.key.name),
                        text(node.key.kind.label()),
                        text(&node.key.filepath),
                        Value::Int(node.line as i64),
                        node.end_line.map_or(Value::Null, |e| Value::Int(e as i64)),
                    ]
                })
                .take(lookup.limit)
                .collect(),
            LookupKind::Imports => self
                .edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Imports)
                .filter_map(|e| match (&e.from, &e.to) {
                    (NodeRef::File(from), NodeRef::File(to)) if scoped(from) || scoped(to) => {
                        Some(vec![text(from), text(to)])
                    }
                    _ => None,
                })
                .take(lookup.limit)
                .collect(),
            LookupKind::References => self
                .edges
                .iter()
                .filter(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::References))
                .filter_map(|e| match (&e.from, &e.to) {
                    (NodeRef::Symbol(caller), NodeRef::Symbol(target)) => {
                        let defined = self.defined_in(target).filter(|f| scoped(*f))?;
                        let referenced_in = self.defined_in(caller)?;
                        Some(vec![
                            text(&target.name),
                            text(target.kind.label()),
                            text(defined),
                            text(&caller.name),
                            text(referenced_in),
                        ])
                    }
                    _ => None,
                })
                .take(lookup.limit)
                .collect(),
        };

        render_rows(lookup.kind.columns(), &rows)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn execute(&self, statements: &[Statement]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let has_lookup = statements.iter().any(|s| !s.is_mutation());
        if has_lookup {
            let mut seen = lock(&self.lookups)?;
            for statement in statements {
                if let Statement::Lookup(lookup) = statement {
                    seen.push(lookup.clone());
                }
            }
        }
        let delay = {
            let kinds = lock(&self.kind_delays)?;
            let by_kind = statements
                .iter()
                .filter_map(|s| match s {
                    Statement::Lookup(lookup) => Some(lookup.kind),
                    _ => None,
                })
                .flat_map(|kind| kinds.iter().filter(move |(k, _)| *k == kind).map(|(_, d)| *d));
            by_kind.chain(*lock(&self.lookup_delay)?).max()
        };
        if has_lookup && let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.rejects(statements)? {
            return Err(GraphError::ExecutionFailed {
                statements: statements.len(),
                reason: "rejected by test store".to_string(),
            }
            .into());
        }

        let mut state = lock(&self.state)?;
        let outputs: Vec<String> = statements.iter().filter_map(|s| state.apply(s)).collect();
        Ok(outputs.join("\n"))
    }

    async fn clear(&self) -> Result<()> {
        lock(&self.state)?.apply(&Statement::DetachDeleteAll);
        Ok(())
    }
}
