//! Envelope of the event weight over the b-tagging systematic sources.

use tq_core::{SystDirection, SystType};
use tq_reader::Reader;

/// Event weight range spanned by the b-tagging variations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Weight without any variation.
    pub nominal: f64,
    /// Smallest weight over all b-tagging variations.
    pub min: f64,
    /// Largest weight over all b-tagging variations.
    pub max: f64,
}

/// Evaluate the weight of the current event under every b-tagging source, up and down.
///
/// The reader's systematic selection is restored before returning.
pub fn btag_envelope(reader: &mut Reader) -> Envelope {
    let (kind, direction) = reader.systematics();

    reader.set_systematics(SystType::Nominal, SystDirection::Up);
    let nominal = reader.weight();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for dir in SystDirection::BOTH {
        for source in SystType::BTAG {
            reader.set_systematics(source, dir);
            let w = reader.weight();
            min = min.min(w);
            max = max.max(w);
        }
    }

    reader.set_systematics(kind, direction);
    Envelope { nominal, min, max }
}
