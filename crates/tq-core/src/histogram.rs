//! 1D histogram with ROOT bin-numbering conventions.
//!
//! Bin numbers follow ROOT: bin `0` is the underflow, bins `1..=n_bins` are the regular bins and
//! bin `n_bins + 1` is the overflow. Regular bins are stored in `bin_content`, the flows are kept
//! separately.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 1D histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    #[serde(default)]
    pub name: String,
    /// Histogram title.
    #[serde(default)]
    pub title: String,
    /// Bin edges (length = n_bins + 1, strictly increasing).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sumw2: Option<Vec<f64>>,
    /// Underflow bin content.
    #[serde(default)]
    pub underflow: f64,
    /// Overflow bin content.
    #[serde(default)]
    pub overflow: f64,
    /// Number of fill calls, including flows.
    #[serde(default)]
    pub entries: f64,
    /// Uniform binning allows the O(1) bin lookup.
    #[serde(skip)]
    uniform: bool,
}

impl Histogram {
    /// Create an empty histogram with `n_bins` equal-width bins on `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 || !(x_max > x_min) {
            return Err(Error::Validation(format!(
                "invalid uniform binning: n_bins={n_bins}, range=[{x_min}, {x_max})"
            )));
        }
        let width = (x_max - x_min) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| x_min + i as f64 * width).collect();
        edges.push(x_max);
        let mut h = Self::from_edges(name, edges)?;
        h.uniform = true;
        Ok(h)
    }

    /// Create an empty histogram from explicit bin edges.
    pub fn from_edges(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        let n_bins = bin_edges.len().saturating_sub(1);
        let h = Self {
            name: name.into(),
            title: String::new(),
            bin_content: vec![0.0; n_bins],
            sumw2: Some(vec![0.0; n_bins]),
            bin_edges,
            underflow: 0.0,
            overflow: 0.0,
            entries: 0.0,
            uniform: false,
        };
        h.validate()?;
        Ok(h)
    }

    /// Create a histogram with given contents, e.g. a calibration table.
    pub fn with_contents(
        name: impl Into<String>,
        bin_edges: Vec<f64>,
        bin_content: Vec<f64>,
    ) -> Result<Self> {
        let mut h = Self::from_edges(name, bin_edges)?;
        if bin_content.len() != h.n_bins() {
            return Err(Error::Validation(format!(
                "histogram '{}': {} bin contents for {} bins",
                h.name,
                bin_content.len(),
                h.n_bins()
            )));
        }
        h.entries = bin_content.iter().sum();
        h.bin_content = bin_content;
        h.sumw2 = None;
        Ok(h.prepared())
    }

    /// Check internal consistency. Histograms read from external files must pass this before use.
    pub fn validate(&self) -> Result<()> {
        let n_bins = self.n_bins();
        if n_bins == 0 {
            return Err(Error::Validation(format!("histogram '{}' has no bins", self.name)));
        }
        if self.bin_content.len() != n_bins {
            return Err(Error::Validation(format!(
                "histogram '{}': len(bin_content)={} but len(bin_edges)={}",
                self.name,
                self.bin_content.len(),
                self.bin_edges.len()
            )));
        }
        if let Some(sw2) = &self.sumw2
            && sw2.len() != n_bins
        {
            return Err(Error::Validation(format!(
                "histogram '{}': len(sumw2)={} but n_bins={}",
                self.name,
                sw2.len(),
                n_bins
            )));
        }
        if self.bin_edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::Validation(format!(
                "histogram '{}': bin edges are not strictly increasing",
                self.name
            )));
        }
        Ok(())
    }

    /// Detect uniform binning after deserialization.
    pub fn prepared(mut self) -> Self {
        let n = self.n_bins();
        self.uniform = n > 0 && {
            let width = (self.x_max() - self.x_min()) / n as f64;
            self.bin_edges
                .iter()
                .enumerate()
                .all(|(i, &e)| (e - (self.x_min() + i as f64 * width)).abs() <= 1e-12 * width.max(1.0))
        };
        self
    }

    /// Number of regular bins.
    pub fn n_bins(&self) -> usize {
        self.bin_edges.len().saturating_sub(1)
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.bin_edges.first().copied().unwrap_or(0.0)
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.bin_edges.last().copied().unwrap_or(0.0)
    }

    /// Bin number containing `x`, following ROOT's `FindFixBin`.
    ///
    /// Lower edges are inclusive. Values below the range map to 0, values at or above the upper
    /// edge to `n_bins + 1`. NaN maps to the underflow.
    pub fn find_bin(&self, x: f64) -> usize {
        let n = self.n_bins();
        if !(x >= self.x_min()) {
            return 0;
        }
        if x >= self.x_max() {
            return n + 1;
        }
        if self.uniform {
            let pos = n as f64 * (x - self.x_min()) / (self.x_max() - self.x_min());
            return (1 + pos as usize).min(n);
        }
        // Index of the last edge <= x.
        self.bin_edges.partition_point(|&e| e <= x)
    }

    /// Content of bin `bin` in ROOT numbering. Bins past the overflow read as 0.
    pub fn content(&self, bin: usize) -> f64 {
        let n = self.n_bins();
        match bin {
            0 => self.underflow,
            b if b <= n => self.bin_content[b - 1],
            b if b == n + 1 => self.overflow,
            _ => 0.0,
        }
    }

    /// Fill `x` with weight `w`.
    pub fn fill(&mut self, x: f64, w: f64) {
        let n = self.n_bins();
        let bin = self.find_bin(x);
        self.entries += 1.0;
        if bin == 0 {
            self.underflow += w;
        } else if bin == n + 1 {
            self.overflow += w;
        } else {
            self.bin_content[bin - 1] += w;
            if let Some(sw2) = &mut self.sumw2 {
                sw2[bin - 1] += w * w;
            }
        }
    }

    /// Sum of regular-bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}
