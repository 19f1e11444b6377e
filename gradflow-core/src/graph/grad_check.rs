// src/graph/grad_check.rs
//
// Numerical verification of operator gradients: compares the analytical
// gradients a backward pass produces against central-difference estimates on
// a scalarized loss (the sum of the output node's elements).

use super::{Graph, NodeId};
use crate::error::GradFlowError;
use crate::mat::{Element, Matrix};
use approx::relative_eq;
use num_traits::ToPrimitive;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("gradient check failed for input {input_index}, element {element_index}: analytical {analytical:?} != numerical {numerical:?} (difference {difference:?})")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },

    #[error("input {input_index} requires grad but has no gradient after backward")]
    MissingAnalyticalGrad { input_index: usize },

    #[error("numerical gradient is not finite for input {input_index}, element {element_index} (loss+ {loss_plus:?}, loss- {loss_minus:?})")]
    NonFiniteNumericalGrad {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },

    #[error("graph error during gradient check: {0}")]
    Graph(#[from] GradFlowError),
}

/// Checks the analytical gradients of the graph built by `build` against
/// central-difference estimates.
///
/// `build` receives a fresh graph and one leaf id per entry of `inputs` (all
/// requiring gradients) and returns the output node. The loss is the sum of
/// the output's elements, so the analytical pass seeds backward with the
/// default all-ones gradient. Every element of every input is perturbed by
/// `+/- epsilon`; the comparison uses a relative tolerance.
pub fn check_grad<T, F>(
    build: F,
    inputs: &[Matrix<T>],
    epsilon: T,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    T: Element,
    F: Fn(&mut Graph<T>, &[NodeId]) -> Result<NodeId, GradFlowError>,
{
    // Analytical pass.
    let mut g = Graph::new();
    let leaf_ids: Vec<NodeId> = inputs
        .iter()
        .map(|m| g.new_leaf(m.clone(), true))
        .collect();
    let output = build(&mut g, &leaf_ids)?;
    g.forward(false)?;
    g.backward(output, false)?;

    let mut analytical = Vec::with_capacity(inputs.len());
    for (i, &id) in leaf_ids.iter().enumerate() {
        analytical.push(
            g.grad(id)
                .ok_or(GradCheckError::MissingAnalyticalGrad { input_index: i })?,
        );
    }

    let loss = |perturbed: &[Matrix<T>]| -> Result<f64, GradCheckError> {
        let mut g = Graph::new();
        let ids: Vec<NodeId> = perturbed
            .iter()
            .map(|m| g.new_leaf(m.clone(), true))
            .collect();
        let output = build(&mut g, &ids)?;
        g.forward(false)?;
        let value = g.operand_value(output).map_err(GradCheckError::from)?;
        Ok(value.sum().to_f64().unwrap_or(f64::NAN))
    };

    for (i, input) in inputs.iter().enumerate() {
        for e in 0..input.len() {
            let (r, c) = (e / input.cols(), e % input.cols());

            let mut plus = inputs.to_vec();
            plus[i].set(r, c, input.get(r, c) + epsilon);
            let loss_plus = loss(&plus)?;

            let mut minus = inputs.to_vec();
            minus[i].set(r, c, input.get(r, c) - epsilon);
            let loss_minus = loss(&minus)?;

            let numerical =
                (loss_plus - loss_minus) / (2.0 * epsilon.to_f64().unwrap_or(f64::NAN));
            if !numerical.is_finite() {
                return Err(GradCheckError::NonFiniteNumericalGrad {
                    input_index: i,
                    element_index: e,
                    loss_plus,
                    loss_minus,
                });
            }

            let analytical_v = analytical[i].get(r, c).to_f64().unwrap_or(f64::NAN);
            if !relative_eq!(
                analytical_v,
                numerical,
                epsilon = tolerance,
                max_relative = tolerance
            ) {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: e,
                    analytical: analytical_v,
                    numerical,
                    difference: (analytical_v - numerical).abs(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn test_check_grad_passes_on_composite_graph() {
        // sum(tanh(a) * b) exercises fan-out of gy across two op kinds
        let inputs = [
            Matrix::vector(vec![0.5_f64, -0.3, 1.1]),
            Matrix::vector(vec![1.2_f64, 0.8, -0.6]),
        ];
        check_grad(
            |g, ids| {
                let t = ops::tanh(g, ids[0])?;
                let m = ops::mul(g, t, ids[1])?;
                ops::sum(g, m)
            },
            &inputs,
            1e-6,
            1e-4,
        )
        .unwrap();
    }

    #[test]
    fn test_check_grad_reports_missing_grad_for_disconnected_input() {
        let inputs = [
            Matrix::vector(vec![1.0_f64]),
            Matrix::vector(vec![2.0_f64]),
        ];
        // input 1 never participates, so it accumulates no gradient
        let err = check_grad(|g, ids| ops::square(g, ids[0]), &inputs, 1e-6, 1e-4);
        assert_eq!(
            err,
            Err(GradCheckError::MissingAnalyticalGrad { input_index: 1 })
        );
    }
}
