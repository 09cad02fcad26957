//! Per-tree column bindings and decode buffers.
//!
//! Column names are resolved once when a tree is bound; every read then goes through the
//! resolved handles. Array buffers grow to the per-event object count and are reused across
//! events.

use tq_core::{Error, Result};

use crate::layout::{MetColumns, ObjectColumns};
use crate::store::EventTree;

/// Initial capacity of the per-column buffers. Larger events grow the buffers.
pub const PREALLOCATED_OBJECTS: usize = 64;

/// Resolve a column by name. A missing column is [`Error::ColumnNotFound`].
pub fn bind_column(tree: &dyn EventTree, column: &str) -> Result<usize> {
    tree.column_index(column).ok_or_else(|| Error::ColumnNotFound {
        tree: tree.name().to_string(),
        column: column.to_string(),
    })
}

/// One decoded object of a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRow {
    /// Transverse momentum.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Isolation or b-tagging discriminator.
    pub discriminator: f64,
    /// Flavour code.
    pub flavour: i32,
}

#[derive(Debug)]
struct ArrayColumn {
    name: String,
    handle: usize,
    values: Vec<f64>,
}

impl ArrayColumn {
    fn bind(tree: &dyn EventTree, name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            handle: bind_column(tree, name)?,
            values: Vec::with_capacity(PREALLOCATED_OBJECTS),
        })
    }

    fn read(&mut self, tree: &dyn EventTree, entry: u64, count: usize) -> Result<()> {
        tree.read_array(self.handle, entry, &mut self.values)?;
        if self.values.len() < count {
            return Err(Error::ColumnMismatch {
                tree: tree.name().to_string(),
                column: self.name.clone(),
                reason: format!(
                    "entry {entry}: {} values for {count} objects",
                    self.values.len()
                ),
            });
        }
        self.values.truncate(count);
        Ok(())
    }
}

/// Bound columns and buffers of one object collection.
#[derive(Debug)]
pub struct ObjectBlock {
    count_name: String,
    count: usize,
    n: usize,
    pt: ArrayColumn,
    eta: ArrayColumn,
    phi: ArrayColumn,
    discriminator: ArrayColumn,
    flavour: ArrayColumn,
}

impl ObjectBlock {
    /// Resolve every column of the collection in `tree`.
    pub fn bind(tree: &dyn EventTree, columns: &ObjectColumns) -> Result<Self> {
        Ok(Self {
            count_name: columns.count.clone(),
            count: bind_column(tree, &columns.count)?,
            n: 0,
            pt: ArrayColumn::bind(tree, &columns.pt)?,
            eta: ArrayColumn::bind(tree, &columns.eta)?,
            phi: ArrayColumn::bind(tree, &columns.phi)?,
            discriminator: ArrayColumn::bind(tree, &columns.discriminator)?,
            flavour: ArrayColumn::bind(tree, &columns.flavour)?,
        })
    }

    /// Decode `entry`. Returns the number of objects in the event.
    pub fn read(&mut self, tree: &dyn EventTree, entry: u64) -> Result<usize> {
        let raw = tree.read_scalar(self.count, entry)?;
        if !(raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0) {
            return Err(Error::ColumnMismatch {
                tree: tree.name().to_string(),
                column: self.count_name.clone(),
                reason: format!("entry {entry}: invalid object count {raw}"),
            });
        }
        let n = raw as usize;
        for col in [
            &mut self.pt,
            &mut self.eta,
            &mut self.phi,
            &mut self.discriminator,
            &mut self.flavour,
        ] {
            col.read(tree, entry, n)?;
        }
        self.n = n;
        Ok(n)
    }

    /// Number of objects of the last decoded event.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the last decoded event had no objects.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Objects of the last decoded event, in storage order.
    pub fn rows(&self) -> impl Iterator<Item = ObjectRow> + '_ {
        (0..self.n).map(|i| ObjectRow {
            pt: self.pt.values[i],
            eta: self.eta.values[i],
            phi: self.phi.values[i],
            discriminator: self.discriminator.values[i],
            flavour: self.flavour.values[i] as i32,
        })
    }
}

/// Bound columns of a missing-energy vector.
#[derive(Debug, Clone, Copy)]
pub struct MetBlock {
    pt: usize,
    phi: usize,
}

impl MetBlock {
    /// Resolve both columns in `tree`.
    pub fn bind(tree: &dyn EventTree, columns: &MetColumns) -> Result<Self> {
        Ok(Self { pt: bind_column(tree, &columns.pt)?, phi: bind_column(tree, &columns.phi)? })
    }

    /// Decode `(pt, phi)` at `entry`.
    pub fn read(&self, tree: &dyn EventTree, entry: u64) -> Result<(f64, f64)> {
        Ok((tree.read_scalar(self.pt, entry)?, tree.read_scalar(self.phi, entry)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ColumnLayout;
    use crate::store::{Column, JaggedCol, MemoryTree};

    fn tree(counts: Vec<f64>, pts: Vec<Vec<f64>>) -> MemoryTree {
        let jagged = |v: f64| {
            Column::Jagged(JaggedCol::from_rows(pts.iter().map(|r| vec![v; r.len()])))
        };
        MemoryTree::from_columns(
            "T",
            [
                ("njets".to_string(), Column::Scalar(counts)),
                ("jet_pt".to_string(), Column::Jagged(JaggedCol::from_rows(pts.clone()))),
                ("jet_eta".to_string(), jagged(0.5)),
                ("jet_phi".to_string(), jagged(0.1)),
                ("jet_btagdiscri".to_string(), jagged(0.7)),
                ("jet_flav".to_string(), jagged(5.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reads_and_reuses_buffers() {
        let t = tree(vec![2.0, 70.0], vec![vec![40.0, 30.0], (0..70).map(f64::from).collect()]);
        let mut block = ObjectBlock::bind(&t, &ColumnLayout::default().jets).unwrap();
        assert_eq!(block.read(&t, 0).unwrap(), 2);
        let rows: Vec<_> = block.rows().collect();
        assert_eq!(rows[1].pt, 30.0);
        assert_eq!(rows[1].flavour, 5);
        // more objects than the preallocation hint
        assert_eq!(block.read(&t, 1).unwrap(), 70);
        assert_eq!(block.rows().last().unwrap().pt, 69.0);
        assert_eq!(block.len(), 70);
    }

    #[test]
    fn count_larger_than_arrays_is_rejected() {
        let t = tree(vec![3.0], vec![vec![40.0, 30.0]]);
        let mut block = ObjectBlock::bind(&t, &ColumnLayout::default().jets).unwrap();
        let err = block.read(&t, 0).unwrap_err();
        assert!(err.to_string().contains("jet_pt"), "{err}");
    }

    #[test]
    fn missing_column_is_named() {
        let t = tree(vec![0.0], vec![vec![]]);
        let err = ObjectBlock::bind(&t, &ColumnLayout::default().leptons).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { ref column, .. } if column == "nlepton"));
    }
}
