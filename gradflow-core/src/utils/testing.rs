use crate::mat::Matrix;

/// Checks that a matrix has the expected shape and data within tolerance.
/// Panics with the offending index on mismatch.
pub fn check_matrix_near(
    actual: &Matrix<f32>,
    expected_shape: (usize, usize),
    expected_data: &[f32],
    tolerance: f32,
) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    assert_eq!(
        actual.len(),
        expected_data.len(),
        "Data length mismatch"
    );
    for (i, (a, e)) in actual.data().iter().zip(expected_data.iter()).enumerate() {
        let diff = (*a - *e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}
