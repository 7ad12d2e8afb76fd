//! Token subsystem facade and its fix-applying agent

use crate::orchestrator::FixApplier;
use crate::protocol::{FixRequest, FixResult};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use strata_core::{ContentHash, Result};
use strata_resolve::{GraphValidator, ResolvedToken, TokenResolver, ValidationReport};
use strata_store::{LoadReport, TokenStore, TokenWriter};

/// The assembled token subsystem: store, resolver, and writer wired so the
/// invariants hold without the caller doing anything.
///
/// Every write goes through the writer, which reloads the store and flushes
/// the resolver cache before returning; a resolve after a successful write
/// always observes the new state.
pub struct TokenEngine {
    store: TokenStore,
    resolver: TokenResolver,
    writer: TokenWriter,
}

impl TokenEngine {
    /// Open the token directory and load every storage unit
    pub fn open<P: AsRef<Path>>(root: P) -> Result<(Self, LoadReport)> {
        let (store, report) = TokenStore::open(root)?;
        Ok((
            Self {
                store,
                resolver: TokenResolver::new(),
                writer: TokenWriter::new(),
            },
            report,
        ))
    }

    /// The underlying store, for read-only inspection
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Resolve one token; see `TokenResolver::resolve`
    pub fn resolve(&mut self, path: &str, resolve_aliases: bool) -> Option<Arc<ResolvedToken>> {
        self.resolver.resolve(&self.store, path, resolve_aliases)
    }

    /// Resolve every token at or under a prefix
    pub fn resolve_by_prefix(&mut self, prefix: &str) -> Vec<Arc<ResolvedToken>> {
        self.resolver.resolve_by_prefix(&self.store, prefix)
    }

    /// Resolve every token declaring the given kind
    pub fn resolve_by_kind(&mut self, kind: &str) -> Vec<Arc<ResolvedToken>> {
        self.resolver.resolve_by_kind(&self.store, kind)
    }

    /// Write a token through the single legal mutation path
    pub fn write(
        &mut self,
        path: &str,
        value: &str,
        kind: Option<&str>,
        description: Option<&str>,
    ) -> bool {
        self.writer
            .write(&mut self.store, &mut self.resolver, path, value, kind, description)
    }

    /// Delete a token through the single legal mutation path
    pub fn delete(&mut self, path: &str) -> bool {
        self.writer.delete(&mut self.store, &mut self.resolver, path)
    }

    /// Run the full-tree structural validation
    pub fn validate(&mut self) -> ValidationReport {
        GraphValidator::new(&self.store, &mut self.resolver).validate()
    }

    /// Combined content hash of the storage units on disk
    pub fn checksum(&self) -> Result<ContentHash> {
        self.store.checksum()
    }
}

/// `FixApplier` for the `tokens` routing target.
///
/// The payload is a table: `op` is `"set"` or `"delete"`, `path` names the
/// token, and `set` takes `value` plus optional `kind` and `description`.
/// Malformed payloads and rejected writes come back as failed results, not
/// errors.
pub struct TokenAgent {
    engine: Rc<RefCell<TokenEngine>>,
}

impl TokenAgent {
    /// Create an agent sharing the given engine
    pub fn new(engine: Rc<RefCell<TokenEngine>>) -> Self {
        Self { engine }
    }
}

impl FixApplier for TokenAgent {
    fn apply_fix(&mut self, request: &FixRequest) -> FixResult {
        let payload = match request.payload.as_table() {
            Some(payload) => payload,
            None => return FixResult::failed("payload is not a table"),
        };
        let op = match payload.get("op").and_then(|v| v.as_str()) {
            Some(op) => op,
            None => return FixResult::failed("payload has no 'op' field"),
        };
        let path = match payload.get("path").and_then(|v| v.as_str()) {
            Some(path) => path,
            None => return FixResult::failed("payload has no 'path' field"),
        };

        match op {
            "set" => {
                let value = match payload.get("value") {
                    Some(toml::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => return FixResult::failed("'set' payload has no 'value' field"),
                };
                let kind = payload.get("kind").and_then(|v| v.as_str());
                let description = payload.get("description").and_then(|v| v.as_str());
                let mut engine = self.engine.borrow_mut();
                if engine.write(path, &value, kind, description) {
                    FixResult::applied(format!("set '{}' = '{}'", path, value))
                } else {
                    FixResult::failed(format!("write of '{}' was rejected", path))
                }
            }
            "delete" => {
                let mut engine = self.engine.borrow_mut();
                if engine.delete(path) {
                    FixResult::applied(format!("deleted '{}'", path))
                } else {
                    FixResult::failed(format!("delete of '{}' was rejected", path))
                }
            }
            other => FixResult::failed(format!("unknown op '{}'", other)),
        }
    }
}
