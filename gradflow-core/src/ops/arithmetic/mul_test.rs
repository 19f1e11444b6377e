use super::*;
use crate::graph::grad_check::check_grad;
use crate::ops;
use crate::utils::testing::check_matrix_near;

#[test]
fn test_mul_forward() {
    let mut g = Graph::new();
    let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0, 3.0]), false);
    let b = g.new_leaf(Matrix::vector(vec![4.0_f32, 5.0, 6.0]), false);
    let c = mul(&mut g, a, b).unwrap();
    g.forward(false).unwrap();
    check_matrix_near(&g.value(c).unwrap(), (3, 1), &[4.0, 10.0, 18.0], 1e-6);
}

#[test]
fn test_mul_backward() {
    let mut g = Graph::new();
    let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0, 3.0]), true);
    let b = g.new_leaf(Matrix::vector(vec![4.0_f32, 5.0, 6.0]), true);
    let c = mul(&mut g, a, b).unwrap();
    g.forward(false).unwrap();
    g.backward(c, false).unwrap();
    check_matrix_near(&g.grad(a).unwrap(), (3, 1), &[4.0, 5.0, 6.0], 1e-6);
    check_matrix_near(&g.grad(b).unwrap(), (3, 1), &[1.0, 2.0, 3.0], 1e-6);
}

#[test]
fn test_mul_frozen_operand_gets_no_grad() {
    let mut g = Graph::new();
    let a = g.new_leaf(Matrix::vector(vec![1.0_f32, 2.0]), true);
    let b = g.new_leaf(Matrix::vector(vec![3.0_f32, 4.0]), false);
    let c = mul(&mut g, a, b).unwrap();
    g.forward(false).unwrap();
    g.backward(c, false).unwrap();
    assert!(g.grad(a).is_some());
    assert_eq!(g.grad(b), None);
}

#[test]
fn test_mul_grad_check() {
    let inputs = [
        Matrix::vector(vec![0.4_f64, -1.2, 2.0]),
        Matrix::vector(vec![1.5_f64, 0.3, -0.7]),
    ];
    check_grad(
        |g, ids| ops::mul(g, ids[0], ids[1]),
        &inputs,
        1e-5,
        1e-4,
    )
    .unwrap();
}
