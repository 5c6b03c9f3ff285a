use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

/// Nonbonded energy split into its van der Waals and electrostatic parts (kcal/mol).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub vdw: f64,
    pub elec: f64,
}

impl EnergyTerm {
    pub fn new(vdw: f64, elec: f64) -> Self {
        Self { vdw, elec }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.vdw + self.elec
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            vdw: self.vdw + rhs.vdw,
            elec: self.elec + rhs.elec,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.vdw += rhs.vdw;
        self.elec += rhs.elec;
    }
}

impl Mul<f64> for EnergyTerm {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            vdw: self.vdw * rhs,
            elec: self.elec * rhs,
        }
    }
}

impl Sum for EnergyTerm {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, term| acc + term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_energy_term_with_specified_values() {
        let term = EnergyTerm::new(1.0, 2.0);
        assert_eq!(term.vdw, 1.0);
        assert_eq!(term.elec, 2.0);
    }

    #[test]
    fn total_returns_sum_of_all_terms() {
        let term = EnergyTerm::new(1.5, -1.5);
        assert_eq!(term.total(), 0.0);
    }

    #[test]
    fn add_sums_each_field_correctly() {
        let a = EnergyTerm::new(1.0, 2.0);
        let b = EnergyTerm::new(4.0, 5.0);
        assert_eq!(a + b, EnergyTerm::new(5.0, 7.0));
    }

    #[test]
    fn add_assign_accumulates_each_field_correctly() {
        let mut a = EnergyTerm::new(1.0, 2.0);
        a += EnergyTerm::new(-4.0, 5.0);
        assert_eq!(a, EnergyTerm::new(-3.0, 7.0));
    }

    #[test]
    fn mul_scales_both_fields() {
        assert_eq!(EnergyTerm::new(2.0, -4.0) * 0.5, EnergyTerm::new(1.0, -2.0));
    }

    #[test]
    fn sum_of_empty_iterator_is_zero() {
        let total: EnergyTerm = Vec::<EnergyTerm>::new().into_iter().sum();
        assert_eq!(total, EnergyTerm::default());
    }

    #[test]
    fn sum_accumulates_all_terms() {
        let total: EnergyTerm = (1..=3).map(|i| EnergyTerm::new(i as f64, 1.0)).sum();
        assert_eq!(total, EnergyTerm::new(6.0, 3.0));
    }
}
