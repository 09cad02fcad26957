//! Top-quark mass reconstruction in lepton+jets events.

use tq_core::{Jet, Lepton, MissingEnergy};

use crate::kinematics::{LorentzVector, W_MASS, neutrino_p4};

/// Reconstructed masses of the two top-quark candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopMasses {
    /// b jet + hadronically decaying W.
    pub hadronic: f64,
    /// b jet + lepton + neutrino.
    pub leptonic: f64,
}

/// Pair of untagged jets whose mass is closest to the W mass.
fn hadronic_w(untagged: &[Jet]) -> Option<LorentzVector> {
    let mut best: Option<(f64, LorentzVector)> = None;
    for (i, a) in untagged.iter().enumerate() {
        for b in &untagged[i + 1..] {
            let w = LorentzVector::of(a) + LorentzVector::of(b);
            let distance = (w.mass() - W_MASS).abs();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, w));
            }
        }
    }
    best.map(|(_, w)| w)
}

/// Reconstruct both top-quark candidates.
///
/// The hadronic W is the pair of untagged jets with mass closest to the W mass; the leptonic W is
/// the lepton plus the neutrino solution. The two b jets are assigned so that the two top masses
/// are as close as possible. Returns `None` unless there are exactly two b jets and at least two
/// untagged jets.
pub fn reconstruct_top(
    b_jets: &[Jet],
    untagged: &[Jet],
    lepton: &Lepton,
    met: &MissingEnergy,
) -> Option<TopMasses> {
    let [b1, b2] = b_jets else {
        return None;
    };
    let w_had = hadronic_w(untagged)?;
    let w_lep = LorentzVector::of(lepton) + neutrino_p4(lepton, met);
    let (b1, b2) = (LorentzVector::of(b1), LorentzVector::of(b2));

    let had1 = (b1 + w_had).mass();
    let had2 = (b2 + w_had).mass();
    let lep1 = (b1 + w_lep).mass();
    let lep2 = (b2 + w_lep).mass();

    Some(if (had1 - lep2).abs() < (had2 - lep1).abs() {
        TopMasses { hadronic: had1, leptonic: lep2 }
    } else {
        TopMasses { hadronic: had2, leptonic: lep1 }
    })
}
