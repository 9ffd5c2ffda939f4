//! Jacobian computation: analytic seed propagation and finite differences.

use crate::error::SolverResult;
use crate::newton::NewtonSystem;
use hf_core::Real;
use hf_model::{Context, JacobianBuffers, JacobianMeta};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Evaluate an analytic Jacobian via its color groups.
///
/// Every column of a color group gets a unit seed in one shared buffer; one
/// evaluation of the column callback then yields the directional
/// derivatives of all of them, scattered back through each column's row
/// pattern. Groups are independent and read the context immutably, so they
/// evaluate in parallel when there is more than one.
pub fn analytic_jacobian(ctx: &Context, meta: &JacobianMeta) -> SolverResult<DMatrix<Real>> {
    let eval_group = |group: &Vec<usize>| -> SolverResult<Vec<(usize, usize, Real)>> {
        let mut buf = JacobianBuffers::for_meta(meta);
        for &c in group {
            buf.seed[c] = 1.0;
        }
        (meta.column)(ctx, &mut buf)?;

        let mut entries = Vec::new();
        for &c in group {
            for &r in meta.sparsity.col_rows(c) {
                entries.push((r, c, buf.result[r]));
            }
        }
        Ok(entries)
    };

    let groups: Vec<Vec<(usize, usize, Real)>> = if meta.colors.len() > 1 {
        meta.colors
            .par_iter()
            .map(eval_group)
            .collect::<SolverResult<_>>()?
    } else {
        meta.colors
            .iter()
            .map(eval_group)
            .collect::<SolverResult<_>>()?
    };

    let mut jac = DMatrix::zeros(meta.rows, meta.cols);
    for entries in groups {
        for (r, c, v) in entries {
            jac[(r, c)] = v;
        }
    }
    Ok(jac)
}

/// Compute a Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
/// Fallback for torn systems without an analytic Jacobian, and the
/// verification reference for those with one.
pub fn finite_difference_jacobian<S: NewtonSystem>(
    sys: &mut S,
    x: &DVector<Real>,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>> {
    let n = x.len();
    let mut f_x = vec![0.0; sys.dim()];
    sys.residual(x.as_slice(), &mut f_x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut f_perturbed = vec![0.0; m];

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        sys.residual(x_perturbed.as_slice(), &mut f_perturbed)?;

        for i in 0..m {
            jac[(i, j)] = (f_perturbed[i] - f_x[i]) / dx;
        }
    }

    // leave the state consistent with the unperturbed point
    sys.residual(x.as_slice(), &mut f_x)?;

    Ok(jac)
}
