//! Columnar event storage.
//!
//! The reader only needs "named column" access to a set of named trees, which is what the
//! [`EventStore`] and [`EventTree`] traits expose. Columns are resolved by name once per tree
//! (binding) and then read by index for every entry.
//!
//! [`MemoryStore`] is an in-memory implementation, loadable from JSON:
//!
//! ```text
//! { "name": "mujets",
//!   "trees": { "TTJets": { "columns": { "njets": [2, 1], "jet_pt": [[45.0, 30.5], [80.1]] } } } }
//! ```
//!
//! A column given as a flat array is a scalar column; an array of arrays is a per-event array
//! (jagged) column.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tq_core::{Error, Result};

/// A single tree: a fixed number of entries with named columns.
pub trait EventTree: Send + Sync {
    /// Tree name.
    fn name(&self) -> &str;

    /// Number of entries.
    fn entries(&self) -> u64;

    /// Resolve a column name to a handle valid for this tree.
    fn column_index(&self, column: &str) -> Option<usize>;

    /// Read a scalar column at `entry`.
    fn read_scalar(&self, column: usize, entry: u64) -> Result<f64>;

    /// Read a per-event array column at `entry` into `out`, replacing its content.
    fn read_array(&self, column: usize, entry: u64, out: &mut Vec<f64>) -> Result<()>;
}

/// A named collection of trees.
pub trait EventStore: Send + Sync {
    /// Store name, used in error messages.
    fn name(&self) -> &str;

    /// Look up a tree. A missing tree is [`Error::TreeNotFound`].
    fn tree(&self, name: &str) -> Result<Arc<dyn EventTree>>;

    /// Names of all trees in the store.
    fn tree_names(&self) -> Vec<String>;
}

/// A jagged (variable-length) column: flat values + per-entry offsets.
///
/// `offsets` has length `n_entries + 1`. Entry `i` has values `flat[offsets[i]..offsets[i+1]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JaggedCol {
    /// Flat array of all values across all entries.
    pub flat: Vec<f64>,
    /// Entry boundaries: `offsets.len() == n_entries + 1`.
    pub offsets: Vec<usize>,
}

impl JaggedCol {
    /// Build from one vector per entry.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<f64>>) -> Self {
        let mut flat = Vec::new();
        let mut offsets = vec![0];
        for row in rows {
            flat.extend(row);
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Values of entry `row`.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        let start = *self.offsets.get(row)?;
        let end = *self.offsets.get(row + 1)?;
        self.flat.get(start..end)
    }

    /// Number of entries.
    pub fn n_entries(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Column data of a [`MemoryTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// One value per entry.
    Scalar(Vec<f64>),
    /// A variable number of values per entry.
    Jagged(JaggedCol),
}

impl Column {
    /// Number of entries in the column.
    pub fn n_entries(&self) -> usize {
        match self {
            Column::Scalar(v) => v.len(),
            Column::Jagged(j) => j.n_entries(),
        }
    }
}

/// On-disk representation of a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ColumnData {
    Scalar(Vec<f64>),
    Jagged(Vec<Vec<f64>>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TreeDocument {
    #[serde(default)]
    entries: Option<u64>,
    #[serde(default)]
    columns: BTreeMap<String, ColumnData>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    trees: BTreeMap<String, TreeDocument>,
}

/// An in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    name: String,
    n_entries: usize,
    column_names: Vec<String>,
    columns: Vec<Column>,
    name_to_index: HashMap<String, usize>,
}

impl MemoryTree {
    /// Create a tree from materialized columns. All columns must have the same number of entries.
    pub fn from_columns(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut column_names = Vec::new();
        let mut cols = Vec::new();
        let mut n_entries: Option<usize> = None;

        for (col_name, col) in columns {
            let n = col.n_entries();
            match n_entries {
                Some(ne) if ne != n => {
                    return Err(Error::ColumnMismatch {
                        tree: name,
                        column: col_name,
                        reason: format!("expected {ne} entries, got {n}"),
                    });
                }
                _ => n_entries = Some(n),
            }
            if column_names.contains(&col_name) {
                return Err(Error::ColumnMismatch {
                    tree: name,
                    column: col_name,
                    reason: "duplicate column".into(),
                });
            }
            column_names.push(col_name);
            cols.push(col);
        }

        let name_to_index =
            column_names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect::<HashMap<_, _>>();

        Ok(Self {
            name,
            n_entries: n_entries.unwrap_or(0),
            column_names,
            columns: cols,
            name_to_index,
        })
    }

    /// Names of all columns, in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Access a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.name_to_index.get(name).map(|&i| &self.columns[i])
    }

    fn checked(&self, column: usize, entry: u64) -> Result<(&Column, usize)> {
        let col = self.columns.get(column).ok_or_else(|| Error::ColumnMismatch {
            tree: self.name.clone(),
            column: format!("#{column}"),
            reason: "no such column handle".into(),
        })?;
        let row = usize::try_from(entry).ok().filter(|&r| r < self.n_entries).ok_or_else(|| {
            Error::ColumnMismatch {
                tree: self.name.clone(),
                column: self.column_names[column].clone(),
                reason: format!("entry {entry} out of range (entries: {})", self.n_entries),
            }
        })?;
        Ok((col, row))
    }
}

impl EventTree for MemoryTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> u64 {
        self.n_entries as u64
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.name_to_index.get(column).copied()
    }

    fn read_scalar(&self, column: usize, entry: u64) -> Result<f64> {
        match self.checked(column, entry)? {
            (Column::Scalar(v), row) => Ok(v[row]),
            (Column::Jagged(_), _) => Err(Error::ColumnMismatch {
                tree: self.name.clone(),
                column: self.column_names[column].clone(),
                reason: "expected a scalar column, found a per-event array".into(),
            }),
        }
    }

    fn read_array(&self, column: usize, entry: u64, out: &mut Vec<f64>) -> Result<()> {
        match self.checked(column, entry)? {
            (Column::Jagged(j), row) => {
                out.clear();
                // `checked` bounds the row against the entry count, which matches the offsets.
                out.extend_from_slice(j.row(row).unwrap_or(&[]));
                Ok(())
            }
            (Column::Scalar(_), _) => Err(Error::ColumnMismatch {
                tree: self.name.clone(),
                column: self.column_names[column].clone(),
                reason: "expected a per-event array, found a scalar column".into(),
            }),
        }
    }
}

/// An in-memory collection of trees.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    trees: BTreeMap<String, Arc<MemoryTree>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), trees: BTreeMap::new() }
    }

    /// Add (or replace) a tree.
    pub fn with_tree(mut self, tree: MemoryTree) -> Self {
        self.insert(tree);
        self
    }

    /// Add (or replace) a tree.
    pub fn insert(&mut self, tree: MemoryTree) {
        self.trees.insert(tree.name.clone(), Arc::new(tree));
    }

    /// Parse a store from its JSON representation.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: StoreDocument = serde_json::from_str(text)?;
        let mut store = Self::new(doc.name);
        for (tree_name, tree_doc) in doc.trees {
            let declared = tree_doc.entries;
            let columns = tree_doc.columns.into_iter().map(|(name, data)| {
                let col = match data {
                    ColumnData::Scalar(v) => Column::Scalar(v),
                    ColumnData::Jagged(rows) => Column::Jagged(JaggedCol::from_rows(rows)),
                };
                (name, col)
            });
            let tree = MemoryTree::from_columns(tree_name, columns)?;
            if let Some(n) = declared
                && n != tree.entries()
                && !tree.column_names.is_empty()
            {
                return Err(Error::Validation(format!(
                    "tree {}: declares {n} entries but its columns hold {}",
                    tree.name,
                    tree.entries()
                )));
            }
            store.insert(tree);
        }
        Ok(store)
    }

    /// Load a store from a JSON file. A missing file is [`Error::SourceNotFound`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::SourceNotFound(format!("{}: {e}", path.display())))?;
        let mut store = Self::from_json_str(&text)?;
        if store.name.is_empty() {
            store.name = path.display().to_string();
        }
        Ok(store)
    }
}

impl EventStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn tree(&self, name: &str) -> Result<Arc<dyn EventTree>> {
        let tree = self.trees.get(name).ok_or_else(|| Error::TreeNotFound {
            tree: name.to_string(),
            source_name: self.name.clone(),
        })?;
        Ok(Arc::clone(tree) as Arc<dyn EventTree>)
    }

    fn tree_names(&self) -> Vec<String> {
        self.trees.keys().cloned().collect()
    }
}
