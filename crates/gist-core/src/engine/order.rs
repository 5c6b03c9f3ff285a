use crate::core::space::unit_cell::UnitCell;
use nalgebra::{Point3, Vector3};

const NEIGHBORS: usize = 4;

/// Minimum-image vectors from oxygen `index` to its four nearest other
/// oxygens, nearest first. Equal distances keep the earlier molecule.
fn nearest_four(index: usize, oxygens: &[Point3<f64>], cell: &UnitCell) -> Option<[Vector3<f64>; 4]> {
    let center = oxygens[index];
    let mut best: [(f64, Vector3<f64>); NEIGHBORS] = [(f64::INFINITY, Vector3::zeros()); NEIGHBORS];

    for (other, position) in oxygens.iter().enumerate() {
        if other == index {
            continue;
        }
        let delta = cell.minimum_image(&(position - center));
        let dist2 = delta.norm_squared();
        if dist2 >= best[NEIGHBORS - 1].0 {
            continue;
        }
        let mut slot = NEIGHBORS - 1;
        while slot > 0 && dist2 < best[slot - 1].0 {
            best[slot] = best[slot - 1];
            slot -= 1;
        }
        best[slot] = (dist2, delta);
    }

    if best[NEIGHBORS - 1].0.is_finite() {
        Some(best.map(|(_, v)| v))
    } else {
        None
    }
}

/// Tetrahedral order parameter `q = 1 - 3/8 Σ (cos ψ_jk + 1/3)²` over the six
/// angles the four nearest oxygens subtend at oxygen `index`.
///
/// Returns `None` when fewer than four other oxygens exist.
pub fn tetrahedral_order(index: usize, oxygens: &[Point3<f64>], cell: &UnitCell) -> Option<f64> {
    let neighbors = nearest_four(index, oxygens, cell)?;
    let mut sum = 0.0;
    for j in 0..NEIGHBORS - 1 {
        for k in (j + 1)..NEIGHBORS {
            let (a, b) = (&neighbors[j], &neighbors[k]);
            let cos = a.dot(b) / (a.norm_squared() * b.norm_squared()).sqrt();
            sum += (cos + 1.0 / 3.0).powi(2);
        }
    }
    Some(1.0 - 0.375 * sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn big_cell() -> UnitCell {
        UnitCell::orthorhombic(40.0, 40.0, 40.0).unwrap()
    }

    #[test]
    fn perfect_tetrahedron_gives_one() {
        let c = Point3::new(20.0, 20.0, 20.0);
        let s = 2.8 / 3.0f64.sqrt();
        let oxygens = vec![
            c,
            c + Vector3::new(s, s, s),
            c + Vector3::new(s, -s, -s),
            c + Vector3::new(-s, s, -s),
            c + Vector3::new(-s, -s, s),
            c + Vector3::new(9.0, 0.0, 0.0),
        ];
        let q = tetrahedral_order(0, &oxygens, &big_cell()).unwrap();
        assert!(f64_approx_equal(q, 1.0));
    }

    #[test]
    fn square_planar_neighbors_give_one_half() {
        // cos = 0 for four pairs and -1 for two: 1 - 3/8 (4 * 1/9 + 2 * 4/9) = 1/2.
        let c = Point3::new(20.0, 20.0, 20.0);
        let oxygens = vec![
            c,
            c + Vector3::new(2.8, 0.0, 0.0),
            c + Vector3::new(-2.8, 0.0, 0.0),
            c + Vector3::new(0.0, 2.8, 0.0),
            c + Vector3::new(0.0, -2.8, 0.0),
        ];
        let q = tetrahedral_order(0, &oxygens, &big_cell()).unwrap();
        assert!(f64_approx_equal(q, 0.5));
    }

    #[test]
    fn neighbors_are_found_through_periodic_images() {
        let s = 2.8 / 3.0f64.sqrt();
        let c = Point3::new(0.5, 0.5, 0.5);
        let wrap = |v: Vector3<f64>| {
            let p = c + v;
            Point3::new(p.x.rem_euclid(40.0), p.y.rem_euclid(40.0), p.z.rem_euclid(40.0))
        };
        let oxygens = vec![
            c,
            wrap(Vector3::new(s, s, s)),
            wrap(Vector3::new(s, -s, -s)),
            wrap(Vector3::new(-s, s, -s)),
            wrap(Vector3::new(-s, -s, s)),
        ];
        let q = tetrahedral_order(0, &oxygens, &big_cell()).unwrap();
        assert!(f64_approx_equal(q, 1.0));
    }

    #[test]
    fn fewer_than_four_neighbors_yields_none() {
        let oxygens = vec![Point3::origin(), Point3::new(3.0, 0.0, 0.0)];
        assert_eq!(tetrahedral_order(0, &oxygens, &big_cell()), None);
    }
}
