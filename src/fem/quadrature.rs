//! Gaussian quadrature rules for tetrahedral and triangular elements

/// Quadrature rule on the reference tetrahedron
///
/// Points are stored in barycentric form [L0, L1, L2, L3]; weights sum to
/// the reference volume 1/6.
pub struct TetQuadrature {
    pub points: Vec<[f64; 4]>,
    pub weights: Vec<f64>,
}

impl TetQuadrature {
    /// 1-point centroid rule, exact for linear polynomials
    ///
    /// The natural choice for Tet4 elements
    pub fn one_point() -> Self {
        Self {
            points: vec![[0.25, 0.25, 0.25, 0.25]],
            weights: vec![1.0 / 6.0],
        }
    }

    /// 4-point rule, exact for quadratic polynomials
    ///
    /// The natural choice for Tet10 elements
    pub fn four_point() -> Self {
        let a = 0.5854101966249685; // (5 + 3 sqrt(5)) / 20
        let b = 0.1381966011250105; // (5 - sqrt(5)) / 20
        let w = 1.0 / 24.0;

        Self {
            points: vec![[a, b, b, b], [b, a, b, b], [b, b, a, b], [b, b, b, a]],
            weights: vec![w, w, w, w],
        }
    }
}

/// Quadrature rule on the reference triangle
///
/// Points in barycentric form [L0, L1, L2]; weights sum to the reference
/// area 1/2.
pub struct TriQuadrature {
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

impl TriQuadrature {
    /// 1-point centroid rule, exact for linear polynomials
    pub fn one_point() -> Self {
        Self {
            points: vec![[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]],
            weights: vec![0.5],
        }
    }

    /// 3-point rule, exact for quadratic polynomials
    pub fn three_point() -> Self {
        let a = 2.0 / 3.0;
        let b = 1.0 / 6.0;
        let w = 1.0 / 6.0;

        Self {
            points: vec![[a, b, b], [b, a, b], [b, b, a]],
            weights: vec![w, w, w],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tet_weights_sum_to_reference_volume() {
        for rule in [TetQuadrature::one_point(), TetQuadrature::four_point()] {
            let sum: f64 = rule.weights.iter().sum();
            assert_relative_eq!(sum, 1.0 / 6.0, epsilon = 1e-12);
            assert_eq!(rule.points.len(), rule.weights.len());
        }
    }

    #[test]
    fn tri_weights_sum_to_reference_area() {
        for rule in [TriQuadrature::one_point(), TriQuadrature::three_point()] {
            let sum: f64 = rule.weights.iter().sum();
            assert_relative_eq!(sum, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn tet_four_point_integrates_quadratics() {
        // Integrate L1^2 over the reference tet; exact value is 1/60
        let rule = TetQuadrature::four_point();
        let integral: f64 = rule
            .points
            .iter()
            .zip(rule.weights.iter())
            .map(|(p, w)| w * p[1] * p[1])
            .sum();
        assert_relative_eq!(integral, 1.0 / 60.0, epsilon = 1e-12);
    }
}
