//! Physics object model: reconstructed leptons, jets and missing transverse energy.
//!
//! Every object carries a four-momentum in (pt, eta, phi, m) coordinates. The shared kinematic
//! capability set lives in the [`Kinematics`] trait; species-specific fields (flavour, isolation,
//! b-tagging discriminator) live in the species structs.

use std::cmp::Ordering;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Electron mass, GeV.
pub const ELECTRON_MASS: f64 = 0.511e-3;
/// Muon mass, GeV.
pub const MUON_MASS: f64 = 105.7e-3;
/// Tau-lepton mass, GeV.
pub const TAU_MASS: f64 = 1776.8e-3;

/// A four-momentum in collider coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pt: f64,
    eta: f64,
    phi: f64,
    m: f64,
}

impl Candidate {
    /// Create a candidate from transverse momentum, pseudorapidity, azimuthal angle and mass.
    pub fn new(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        Self { pt, eta, phi, m }
    }

    /// x component of the momentum.
    pub fn px(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    /// y component of the momentum.
    pub fn py(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    /// z component of the momentum.
    pub fn pz(&self) -> f64 {
        self.pt * self.eta.sinh()
    }

    /// Energy.
    pub fn energy(&self) -> f64 {
        let p = self.pt * self.eta.cosh();
        (p * p + self.m * self.m).sqrt()
    }
}

/// Wrap an azimuthal difference into `[-pi, pi)`.
///
/// Non-finite input gives NaN.
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let d = (a - b + PI).rem_euclid(2.0 * PI) - PI;
    // rem_euclid may round up to exactly 2pi
    if d >= PI { d - 2.0 * PI } else { d }
}

/// Kinematic accessors shared by all physics objects.
pub trait Kinematics {
    /// The underlying four-momentum.
    fn p4(&self) -> &Candidate;

    /// Transverse momentum.
    fn pt(&self) -> f64 {
        self.p4().pt
    }

    /// Pseudorapidity.
    fn eta(&self) -> f64 {
        self.p4().eta
    }

    /// Azimuthal angle.
    fn phi(&self) -> f64 {
        self.p4().phi
    }

    /// Mass.
    fn m(&self) -> f64 {
        self.p4().m
    }

    /// Angular separation `sqrt(deta^2 + dphi^2)`.
    fn delta_r<K: Kinematics + ?Sized>(&self, other: &K) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = delta_phi(self.phi(), other.phi());
        (deta * deta + dphi * dphi).sqrt()
    }

    /// Ordering by ascending transverse momentum.
    fn pt_cmp<K: Kinematics + ?Sized>(&self, other: &K) -> Ordering {
        self.pt().total_cmp(&other.pt())
    }
}

impl Kinematics for Candidate {
    #[inline]
    fn p4(&self) -> &Candidate {
        self
    }
}

/// Sort a collection into descending transverse-momentum order.
///
/// The sort is stable, so objects with equal pt keep their source order.
pub fn sort_by_pt_descending<T: Kinematics>(objects: &mut [T]) {
    objects.sort_by(|a, b| b.pt_cmp(a));
}

/// A reconstructed charged lepton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lepton {
    p4: Candidate,
    flavour: i32,
    isolation: f64,
}

impl Lepton {
    /// Create a lepton. The mass is deduced from the flavour.
    pub fn new(flavour: i32, pt: f64, eta: f64, phi: f64, isolation: f64) -> Self {
        let m = match flavour.abs() {
            11 => ELECTRON_MASS,
            13 => MUON_MASS,
            15 => TAU_MASS,
            _ => 0.0,
        };
        Self { p4: Candidate::new(pt, eta, phi, m), flavour, isolation }
    }

    /// Lepton flavour, encoded with PDG ID codes.
    pub fn flavour(&self) -> i32 {
        self.flavour
    }

    /// Relative isolation. Smaller values mean less activity around the lepton.
    pub fn isolation(&self) -> f64 {
        self.isolation
    }
}

impl Kinematics for Lepton {
    #[inline]
    fn p4(&self) -> &Candidate {
        &self.p4
    }
}

/// A reconstructed jet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    p4: Candidate,
    flavour: i32,
    btag: f64,
}

impl Jet {
    /// Create a massless jet.
    pub fn new(pt: f64, eta: f64, phi: f64, btag: f64, flavour: i32) -> Self {
        Self { p4: Candidate::new(pt, eta, phi, 0.0), flavour, btag }
    }

    /// Jet flavour (PDG ID of the originating parton); zero when unknown.
    ///
    /// Only available in simulation.
    pub fn flavour(&self) -> i32 {
        self.flavour
    }

    /// Value of the b-tagging discriminator. Negative values mean it could not be computed.
    pub fn btag(&self) -> f64 {
        self.btag
    }
}

impl Kinematics for Jet {
    #[inline]
    fn p4(&self) -> &Candidate {
        &self.p4
    }
}

/// Missing transverse energy. Pseudorapidity and mass are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingEnergy {
    p4: Candidate,
}

impl MissingEnergy {
    /// Create from magnitude and azimuthal angle.
    pub fn new(pt: f64, phi: f64) -> Self {
        Self { p4: Candidate::new(pt, 0.0, phi, 0.0) }
    }

    /// Update in place.
    pub fn set(&mut self, pt: f64, phi: f64) {
        self.p4 = Candidate::new(pt, 0.0, phi, 0.0);
    }
}

impl Kinematics for MissingEnergy {
    #[inline]
    fn p4(&self) -> &Candidate {
        &self.p4
    }
}
