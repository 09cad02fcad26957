//! Phase-space binning of the calibration tables.

/// Lower pt edges of the heavy-flavour bins, GeV. The last bin is open-ended.
pub const PT_EDGES: [f64; 6] = [20.0, 30.0, 40.0, 60.0, 100.0, 160.0];

/// Edges of the |eta| bins. Jets with |eta| at or above the last edge are out of acceptance.
pub const ETA_EDGES: [f64; 4] = [0.0, 0.8, 1.6, 2.4];

/// Number of pt bins in the heavy-flavour tables.
pub const N_PT_BINS_HF: usize = 6;

/// Number of pt bins in the light-flavour tables. Higher bins are clipped onto the last one.
pub const N_PT_BINS_LF: usize = 4;

/// Number of |eta| bins in the light-flavour tables.
pub const N_ETA_BINS_LF: usize = 3;

/// Heavy-flavour tables are inclusive in |eta|.
pub const N_ETA_BINS_HF: usize = 1;

/// Discriminator bin used when the discriminator is not available (negative).
pub const FALLBACK_BIN: usize = 1;

/// Number of leading thresholds that are `<= value`, minus one.
fn bin_index(value: f64, thresholds: &[f64], n_bins: usize) -> Option<usize> {
    let passed = thresholds.iter().take_while(|&&cut| value >= cut).count();
    let idx = passed.checked_sub(1)?;
    (idx < n_bins).then_some(idx)
}

/// pt bin of a jet, or `None` below the first threshold.
pub fn pt_bin(pt: f64) -> Option<usize> {
    bin_index(pt, &PT_EDGES, N_PT_BINS_HF)
}

/// |eta| bin of a jet, or `None` outside the tracker acceptance.
pub fn eta_bin(eta: f64) -> Option<usize> {
    bin_index(eta.abs(), &ETA_EDGES, N_ETA_BINS_LF)
}
