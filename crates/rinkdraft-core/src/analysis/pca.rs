// Principal-component analysis over nalgebra's symmetric eigen solver.
//
// Rows arrive as `Vec<f64>` records from the standardizer and are packed into
// a dense `DMatrix` here; results go back out as plain vectors so the rest of
// the engine never touches nalgebra types.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Iteration cap handed to the eigen solver.
const MAX_EIGEN_ITERATIONS: usize = 1_000;

/// Eigenvalues (descending) and matching unit eigenvectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPairs {
    pub values: Vec<f64>,
    /// `vectors[i]` is the eigenvector for `values[i]`.
    pub vectors: Vec<Vec<f64>>,
}

/// Pack row-major records into an `n x d` matrix.
pub fn to_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, EngineError> {
    let Some(first) = rows.first() else {
        return Err(EngineError::EmptyPopulation);
    };
    let dims = first.len();
    if rows.iter().any(|r| r.len() != dims) {
        return Err(EngineError::Decomposition("ragged input matrix".into()));
    }
    Ok(DMatrix::from_fn(rows.len(), dims, |r, c| rows[r][c]))
}

fn column_means(data: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(data.ncols(), data.column_iter().map(|c| c.mean()))
}

/// Sample covariance (N - 1 denominator) of the columns of `data`.
pub fn covariance_matrix(data: &DMatrix<f64>) -> DMatrix<f64> {
    let means = column_means(data);
    let mut centered = data.clone();
    for (mut col, mean) in centered.column_iter_mut().zip(means.iter()) {
        col.iter_mut().for_each(|x| *x -= *mean);
    }
    let denom = data.nrows().saturating_sub(1).max(1) as f64;
    (centered.transpose() * &centered) / denom
}

/// Flip `v` so its largest-magnitude entry is positive.
///
/// Eigenvectors are only defined up to sign; this makes a single fit
/// deterministic without claiming the sign means anything.
fn normalize_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}

/// Eigen decomposition of a real symmetric matrix, strongest axis first.
pub fn symmetric_eigen(matrix: &DMatrix<f64>) -> Result<EigenPairs, EngineError> {
    if matrix.is_empty() || !matrix.is_square() {
        return Err(EngineError::Decomposition(
            "matrix must be square and non-empty".into(),
        ));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(EngineError::Decomposition("matrix has non-finite entries".into()));
    }

    let eigen = SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, MAX_EIGEN_ITERATIONS)
        .ok_or_else(|| {
            EngineError::Decomposition(format!(
                "eigen solver did not converge in {MAX_EIGEN_ITERATIONS} iterations"
            ))
        })?;

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = order
        .iter()
        .map(|&i| {
            let mut col: Vec<f64> = eigen.eigenvectors.column(i).iter().copied().collect();
            normalize_sign(&mut col);
            col
        })
        .collect();

    Ok(EigenPairs { values, vectors })
}

// ---------------------------------------------------------------------------
// Fitted projection
// ---------------------------------------------------------------------------

/// The top-k principal axes of a data matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalComponents {
    /// Column means subtracted before projecting.
    pub mean: Vec<f64>,
    /// Unit component vectors, strongest first.
    pub components: Vec<Vec<f64>>,
    /// Variance captured by each component.
    pub explained_variance: Vec<f64>,
}

impl PrincipalComponents {
    /// Fit `n_components` axes on a row-major matrix.
    pub fn fit(rows: &[Vec<f64>], n_components: usize) -> Result<Self, EngineError> {
        let data = to_matrix(rows)?;
        let dims = data.ncols();
        if n_components == 0 || n_components > dims {
            return Err(EngineError::Decomposition(format!(
                "requested {n_components} components from {dims} features"
            )));
        }
        let eigen = symmetric_eigen(&covariance_matrix(&data))?;
        Ok(PrincipalComponents {
            mean: column_means(&data).iter().copied().collect(),
            components: eigen.vectors.into_iter().take(n_components).collect(),
            explained_variance: eigen.values.into_iter().take(n_components).collect(),
        })
    }

    /// Coordinates of `row` along each fitted component.
    pub fn project(&self, row: &[f64]) -> Vec<f64> {
        self.components
            .iter()
            .map(|c| {
                c.iter()
                    .zip(row.iter().zip(&self.mean))
                    .map(|(w, (x, m))| w * (x - m))
                    .sum()
            })
            .collect()
    }
}

/// The first principal component of `rows`.
pub fn first_principal_component(rows: &[Vec<f64>]) -> Result<Vec<f64>, EngineError> {
    let mut pcs = PrincipalComponents::fit(rows, 1)?;
    Ok(pcs.components.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn eigen_of_diagonal_matrix() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 3.0]);
        let eig = symmetric_eigen(&m).unwrap();
        for (got, want) in eig.values.iter().zip([5.0, 3.0, 1.0]) {
            assert!(approx_eq(*got, want, 1e-12), "{got} vs {want}");
        }
        for (got, want) in eig.vectors[0].iter().zip([0.0, 1.0, 0.0]) {
            assert!(approx_eq(*got, want, 1e-12), "{got} vs {want}");
        }
    }

    #[test]
    fn eigen_of_two_by_two() {
        // [[2, 1], [1, 2]] has eigenpairs (3, [1, 1]/sqrt2) and (1, [1, -1]/sqrt2).
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let eig = symmetric_eigen(&m).unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!(approx_eq(eig.values[0], 3.0, 1e-12));
        assert!(approx_eq(eig.values[1], 1.0, 1e-12));
        assert!(approx_eq(eig.vectors[0][0], h, 1e-12));
        assert!(approx_eq(eig.vectors[0][1], h, 1e-12));
        assert!(approx_eq(eig.vectors[1][0].abs(), h, 1e-12));
        assert!(approx_eq(eig.vectors[1][0], -eig.vectors[1][1], 1e-12));
    }

    #[test]
    fn eigen_reconstructs_matrix() {
        #[rustfmt::skip]
        let m = DMatrix::from_row_slice(4, 4, &[
            4.0, 1.0, -2.0, 0.5,
            1.0, 3.0, 0.0, 1.5,
            -2.0, 0.0, 5.0, -1.0,
            0.5, 1.5, -1.0, 2.0,
        ]);
        let eig = symmetric_eigen(&m).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                let rebuilt: f64 = (0..4)
                    .map(|k| eig.values[k] * eig.vectors[k][i] * eig.vectors[k][j])
                    .sum();
                assert!(approx_eq(rebuilt, m[(i, j)], 1e-9), "({i},{j}) {rebuilt} vs {}", m[(i, j)]);
            }
        }
        for k in 0..4 {
            let norm: f64 = eig.vectors[k].iter().map(|x| x * x).sum();
            assert!(approx_eq(norm, 1.0, 1e-12));
        }
        assert!(eig.values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn rejects_non_square() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(matches!(symmetric_eigen(&m), Err(EngineError::Decomposition(_))));
    }

    #[test]
    fn rejects_non_finite() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, 1.0]);
        assert!(matches!(symmetric_eigen(&m), Err(EngineError::Decomposition(_))));
    }

    #[test]
    fn ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(to_matrix(&rows), Err(EngineError::Decomposition(_))));
        assert!(matches!(to_matrix(&[]), Err(EngineError::EmptyPopulation)));
    }

    #[test]
    fn covariance_of_known_data() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let cov = covariance_matrix(&to_matrix(&rows).unwrap());
        assert!(approx_eq(cov[(0, 0)], 1.0, 1e-12));
        assert!(approx_eq(cov[(0, 1)], 2.0, 1e-12));
        assert!(approx_eq(cov[(1, 0)], 2.0, 1e-12));
        assert!(approx_eq(cov[(1, 1)], 4.0, 1e-12));
    }

    #[test]
    fn first_component_of_correlated_data() {
        // Second column is an exact linear function of the first.
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| {
                let x = i as f64;
                vec![x, 2.0 * x + 1.0]
            })
            .collect();
        let pc = first_principal_component(&rows).unwrap();
        let norm = (1.0_f64 + 4.0).sqrt();
        assert!(approx_eq(pc[0], 1.0 / norm, 1e-9));
        assert!(approx_eq(pc[1], 2.0 / norm, 1e-9));
    }

    #[test]
    fn largest_entry_is_positive() {
        let rows: Vec<Vec<f64>> = (0..8)
            .map(|i| {
                let x = i as f64;
                vec![-3.0 * x, x]
            })
            .collect();
        let pc = first_principal_component(&rows).unwrap();
        assert!(pc[0] > 0.0);
        assert!(pc[1] < 0.0);
    }

    #[test]
    fn projection_reduces_dimensionality() {
        let rows = vec![
            vec![1.0, 1.0, 0.0],
            vec![2.0, 2.1, 0.1],
            vec![3.0, 2.9, -0.1],
            vec![4.0, 4.2, 0.0],
        ];
        let pcs = PrincipalComponents::fit(&rows, 2).unwrap();
        assert_eq!(pcs.components.len(), 2);
        assert!(pcs.explained_variance[0] >= pcs.explained_variance[1]);
        assert_eq!(pcs.project(&rows[0]).len(), 2);
        // The mean row projects to the origin.
        let origin = pcs.project(&pcs.mean);
        assert!(origin.iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn too_many_components_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(matches!(
            PrincipalComponents::fit(&rows, 3),
            Err(EngineError::Decomposition(_))
        ));
    }
}
