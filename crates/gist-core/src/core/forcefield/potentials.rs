use statrs::function::erf::erfc;

/// Conversion from elementary charges to internal units, so that `q_i q_j / r`
/// comes out in kcal/mol with `r` in Å.
pub const CHARGE_SCALE: f64 = 18.2223;
pub const COULOMB_CONSTANT: f64 = CHARGE_SCALE * CHARGE_SCALE; // In kcal·Å/(mol·e²)

/// `A/r^12 - B/r^6` from the squared distance.
#[inline]
pub fn lennard_jones_ab(dist2: f64, a: f64, b: f64) -> f64 {
    let inv_r6 = 1.0 / (dist2 * dist2 * dist2);
    (a * inv_r6 - b) * inv_r6
}

/// Plain Coulomb energy of a pair of scaled charges.
#[inline]
pub fn coulomb(dist: f64, qi: f64, qj: f64) -> f64 {
    qi * qj / dist
}

/// Real-space Ewald energy `q_i q_j erfc(beta r) / r`.
#[inline]
pub fn ewald_direct(dist: f64, qi: f64, qj: f64, beta: f64) -> f64 {
    qi * qj * erfc(beta * dist) / dist
}

/// Removes the reciprocal-space interaction of an excluded pair:
/// `q_i q_j (erfc(beta r) - 1) / r`, i.e. `-q_i q_j erf(beta r) / r`.
#[inline]
pub fn ewald_exclusion_adjust(dist: f64, qi: f64, qj: f64, beta: f64) -> f64 {
    qi * qj * (erfc(beta * dist) - 1.0) / dist
}

/// Smooth switching function between `switch_on2` and `cutoff2`.
#[inline]
pub fn switch_factor(dist2: f64, switch_on2: f64, cutoff2: f64) -> f64 {
    if dist2 <= switch_on2 {
        1.0
    } else if dist2 >= cutoff2 {
        0.0
    } else {
        let width = cutoff2 - switch_on2;
        let outer = cutoff2 - dist2;
        outer * outer * (cutoff2 + 2.0 * dist2 - 3.0 * switch_on2) / (width * width * width)
    }
}

/// Ewald splitting coefficient for which `erfc(beta * cutoff) / cutoff`
/// equals `tolerance`.
pub fn ewald_coefficient(cutoff: f64, tolerance: f64) -> f64 {
    let residual = |beta: f64| erfc(beta * cutoff) / cutoff;

    let mut high = 0.5;
    let mut steps = 0;
    while residual(high) > tolerance && steps < 60 {
        high *= 2.0;
        steps += 1;
    }

    let mut low = 0.0;
    for _ in 0..50 {
        let mid = 0.5 * (low + high);
        if residual(mid) > tolerance {
            low = mid;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn lennard_jones_ab_matches_explicit_powers() {
        let (a, b) = (1.0e6, 1.0e3);
        let r: f64 = 3.2;
        let expected = a / r.powi(12) - b / r.powi(6);
        assert!(f64_approx_equal(lennard_jones_ab(r * r, a, b), expected));
    }

    #[test]
    fn lennard_jones_ab_is_zero_for_zero_coefficients() {
        assert_eq!(lennard_jones_ab(4.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn coulomb_with_scaled_unit_charges_gives_coulomb_constant() {
        let energy = coulomb(1.0, CHARGE_SCALE, CHARGE_SCALE);
        assert!(f64_approx_equal(energy, COULOMB_CONSTANT));
    }

    #[test]
    fn coulomb_calculates_attractive_energy_correctly() {
        let energy = coulomb(2.0, CHARGE_SCALE, -CHARGE_SCALE);
        assert!(f64_approx_equal(energy, -COULOMB_CONSTANT / 2.0));
    }

    #[test]
    fn ewald_direct_minus_exclusion_adjust_recovers_coulomb() {
        let (r, qi, qj, beta) = (1.3, 5.0, -3.0, 0.35);
        let direct = ewald_direct(r, qi, qj, beta);
        let adjust = ewald_exclusion_adjust(r, qi, qj, beta);
        assert!(f64_approx_equal(direct - adjust, coulomb(r, qi, qj)));
    }

    #[test]
    fn switch_factor_is_one_inside_and_zero_outside() {
        assert_eq!(switch_factor(4.0, 49.0, 64.0), 1.0);
        assert_eq!(switch_factor(64.0, 49.0, 64.0), 0.0);
        assert_eq!(switch_factor(100.0, 49.0, 64.0), 0.0);
    }

    #[test]
    fn switch_factor_is_half_at_midpoint_of_squared_range() {
        let mid = 0.5 * (49.0 + 64.0);
        assert!(f64_approx_equal(switch_factor(mid, 49.0, 64.0), 0.5));
    }

    #[test]
    fn ewald_coefficient_satisfies_tolerance() {
        let cutoff = 8.0;
        let beta = ewald_coefficient(cutoff, 1e-5);
        let residual = erfc(beta * cutoff) / cutoff;
        assert!((residual - 1e-5).abs() < 1e-10);
        assert!((beta - 0.3486).abs() < 2e-3);
    }
}
