// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured payload paths and tree operations.
//!
//! The payload is a JSON tree rooted at `$!`. Paths use `!` as the
//! segment separator (`$!app`, `$!k8s!labels!name`). Lookups walk object
//! keys only; there is no array indexing in path syntax.

use crate::msg::MsgError;
use serde_json::{Map, Value};
use smol_str::SmolStr;

/// A pre-parsed `!`-separated payload path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath(Vec<SmolStr>);

impl JsonPath {
    /// Parse a path, accepting an optional `$!` or `!` prefix.
    ///
    /// Empty segments (`a!!b`) and empty paths are rejected with `BadPath`.
    pub fn parse(text: &str) -> Result<Self, MsgError> {
        let body = text
            .strip_prefix("$!")
            .or_else(|| text.strip_prefix('!'))
            .unwrap_or(text);
        if body.is_empty() {
            return Err(MsgError::BadPath(text.to_string()));
        }
        let mut segments = Vec::new();
        for seg in body.split('!') {
            if seg.is_empty() {
                return Err(MsgError::BadPath(text.to_string()));
            }
            segments.push(SmolStr::new(seg));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.0
    }

    /// Walk the path through `root`, returning the referenced subtree.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut cur = root;
        for seg in &self.0 {
            cur = cur.as_object()?.get(seg.as_str())?;
        }
        Some(cur)
    }

    /// Insert `subtree` at this path, replacing any existing value there.
    ///
    /// Intermediate segments are created as objects; a non-object value in
    /// the middle of the path is replaced by an object.
    pub fn set(&self, root: &mut Value, subtree: Value) {
        if !root.is_object() {
            *root = Value::Object(Map::new());
        }
        let mut cur = root;
        let (last, inner) = match self.0.split_last() {
            Some(pair) => pair,
            None => return,
        };
        for seg in inner {
            let map = match cur.as_object_mut() {
                Some(m) => m,
                None => return,
            };
            let entry = map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            cur = entry;
        }
        if let Some(map) = cur.as_object_mut() {
            map.insert(last.to_string(), subtree);
        }
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$!{}", self.0.join("!"))
    }
}

/// Rewrite `.` in object keys to `sep`, visiting nested objects and
/// arrays. Some sinks disallow dots in field names.
///
/// The tree is walked with an explicit worklist; payload depth is
/// unbounded, so nothing here may recurse.
pub fn de_dot(mut value: Value, sep: &str) -> Value {
    let mut work: Vec<&mut Value> = vec![&mut value];
    while let Some(node) = work.pop() {
        match node {
            Value::Object(map) => {
                let renamed: Map<String, Value> = std::mem::take(map)
                    .into_iter()
                    .map(|(k, v)| (k.replace('.', sep), v))
                    .collect();
                *map = renamed;
                work.extend(map.values_mut());
            }
            Value::Array(items) => work.extend(items.iter_mut()),
            _ => {}
        }
    }
    value
}

/// Tear a payload tree down without recursing: children move onto a
/// worklist and every node is dropped empty. `serde_json::Value`'s own
/// destructor recurses, which an arbitrarily deep payload would
/// overflow.
pub fn drop_tree(root: Value) {
    let mut work = vec![root];
    while let Some(node) = work.pop() {
        match node {
            Value::Object(map) => work.extend(map.into_iter().map(|(_, v)| v)),
            Value::Array(items) => work.extend(items),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
