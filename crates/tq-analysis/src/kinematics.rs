//! Four-vector arithmetic and W-boson kinematics.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use tq_core::Kinematics;

/// Mass of the W boson, GeV, used as the reconstruction constraint.
pub const W_MASS: f64 = 80.4;

/// A four-momentum in Cartesian coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LorentzVector {
    /// x component of the momentum.
    pub px: f64,
    /// y component of the momentum.
    pub py: f64,
    /// z component of the momentum.
    pub pz: f64,
    /// Energy.
    pub e: f64,
}

impl LorentzVector {
    /// Create from components.
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Four-momentum of a physics object.
    pub fn of<K: Kinematics + ?Sized>(object: &K) -> Self {
        let c = object.p4();
        Self::new(c.px(), c.py(), c.pz(), c.energy())
    }

    /// Squared invariant mass. Negative for space-like vectors.
    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.px * self.px - self.py * self.py - self.pz * self.pz
    }

    /// Invariant mass. Space-like vectors get `-sqrt(-m2)`.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }
}

impl Add for LorentzVector {
    type Output = LorentzVector;

    fn add(self, rhs: LorentzVector) -> LorentzVector {
        LorentzVector::new(self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz, self.e + rhs.e)
    }
}

impl AddAssign for LorentzVector {
    fn add_assign(&mut self, rhs: LorentzVector) {
        *self = *self + rhs;
    }
}

impl Sum for LorentzVector {
    fn sum<I: Iterator<Item = LorentzVector>>(iter: I) -> Self {
        iter.fold(LorentzVector::default(), Add::add)
    }
}

/// Invariant mass of a system of objects.
pub fn invariant_mass<'a, K, I>(objects: I) -> f64
where
    K: Kinematics + 'a,
    I: IntoIterator<Item = &'a K>,
{
    objects.into_iter().map(LorentzVector::of).sum::<LorentzVector>().mass()
}

/// Transverse mass of the lepton + missing-energy system.
pub fn transverse_mass<L: Kinematics + ?Sized, M: Kinematics + ?Sized>(lepton: &L, met: &M) -> f64 {
    let l = lepton.p4();
    let m = met.p4();
    let et = l.pt() + m.pt();
    let px = l.px() + m.px();
    let py = l.py() + m.py();
    (et * et - px * px - py * py).max(0.0).sqrt()
}

/// Neutrino four-momentum, with the longitudinal component fixed by requiring that the
/// lepton + neutrino system has the W mass.
///
/// Of the two solutions the one with the smaller |pz| is taken. When the quadratic has no real
/// solution (the transverse mass exceeds the W mass) the real part is used.
pub fn neutrino_p4<L: Kinematics + ?Sized, M: Kinematics + ?Sized>(
    lepton: &L,
    met: &M,
) -> LorentzVector {
    let l = LorentzVector::of(lepton);
    let m = met.p4();
    let (nx, ny) = (m.px(), m.py());

    let mu = W_MASS * W_MASS / 2.0 + l.px * nx + l.py * ny;
    // E^2 - pz^2 of the lepton, i.e. its squared transverse mass
    let denom = l.e * l.e - l.pz * l.pz;
    let pz = if denom > 0.0 {
        let a = mu * l.pz / denom;
        let b = (l.e * l.e * m.pt() * m.pt() - mu * mu) / denom;
        let disc = a * a - b;
        if disc < 0.0 {
            a
        } else {
            let root = disc.sqrt();
            let (p1, p2) = (a + root, a - root);
            if p1.abs() < p2.abs() { p1 } else { p2 }
        }
    } else {
        0.0
    };

    LorentzVector::new(nx, ny, pz, (m.pt() * m.pt() + pz * pz).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tq_core::{Jet, Lepton, MissingEnergy};

    #[test]
    fn back_to_back_transverse_mass() {
        let mu = Lepton::new(13, 40.0, 0.5, 0.0, 0.0);
        let met = MissingEnergy::new(40.0, std::f64::consts::PI);
        assert_relative_eq!(transverse_mass(&mu, &met), 80.0, epsilon = 1e-9);
        let collinear = MissingEnergy::new(40.0, 0.0);
        assert_relative_eq!(transverse_mass(&mu, &collinear), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn neutrino_restores_w_mass() {
        let mu = Lepton::new(13, 35.0, 0.7, 0.3, 0.0);
        let met = MissingEnergy::new(30.0, 2.5);
        assert!(transverse_mass(&mu, &met) < W_MASS);
        let nu = neutrino_p4(&mu, &met);
        let w = LorentzVector::of(&mu) + nu;
        // the muon mass makes the constraint approximate at the 1e-4 level
        assert_relative_eq!(w.mass(), W_MASS, max_relative = 1e-3);
        assert_relative_eq!(nu.pt(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn complex_solution_takes_real_part() {
        let mu = Lepton::new(13, 60.0, 0.2, 0.0, 0.0);
        let met = MissingEnergy::new(60.0, std::f64::consts::PI);
        assert!(transverse_mass(&mu, &met) > W_MASS);
        let nu = neutrino_p4(&mu, &met);
        let l = LorentzVector::of(&mu);
        let mu_term = W_MASS * W_MASS / 2.0 + l.px * nu.px + l.py * nu.py;
        assert_relative_eq!(nu.pz, mu_term * l.pz / (l.e * l.e - l.pz * l.pz), epsilon = 1e-9);
    }

    #[test]
    fn dijet_mass() {
        let a = Jet::new(50.0, 0.0, 0.0, 0.0, 0);
        let b = Jet::new(50.0, 0.0, std::f64::consts::PI, 0.0, 0);
        assert_relative_eq!(invariant_mass([&a, &b]), 100.0, epsilon = 1e-9);
        assert_relative_eq!(invariant_mass([&a]), 0.0, epsilon = 1e-6);
    }
}
