//! Analytic Jacobian descriptions: seed propagation over side buffers.

use crate::context::Context;
use crate::error::{ModelError, ModelResult};
use hf_core::{JacId, Real};

/// Column evaluation callback.
///
/// Receives the store read-only and writes only into the side buffers, so a
/// derivative evaluation can never corrupt the current solution state. The
/// callback propagates whatever seeds are set through the hand-expanded
/// chain rule of the residual computation, leaving directional derivatives
/// in `result`.
pub type ColumnFn = Box<dyn Fn(&Context, &mut JacobianBuffers) -> ModelResult<()> + Send + Sync>;

/// Compressed sparse-column structure: `col_starts[c]..col_starts[c + 1]`
/// indexes the `row_indices` occupied by column `c`.
#[derive(Clone, Debug)]
pub struct SparsityPattern {
    pub col_starts: Vec<usize>,
    pub row_indices: Vec<usize>,
}

impl SparsityPattern {
    /// Fully dense pattern.
    pub fn dense(rows: usize, cols: usize) -> Self {
        let col_starts = (0..=cols).map(|c| c * rows).collect();
        let row_indices = (0..cols).flat_map(|_| 0..rows).collect();
        Self {
            col_starts,
            row_indices,
        }
    }

    /// Rows occupied by column `c`.
    pub fn col_rows(&self, c: usize) -> &[usize] {
        &self.row_indices[self.col_starts[c]..self.col_starts[c + 1]]
    }

    pub fn validate(&self, rows: usize, cols: usize) -> ModelResult<()> {
        if self.col_starts.len() != cols + 1 {
            return Err(ModelError::Invalid {
                what: format!(
                    "sparsity col_starts length {} != cols + 1 = {}",
                    self.col_starts.len(),
                    cols + 1
                ),
            });
        }
        if self.col_starts.windows(2).any(|w| w[0] > w[1]) {
            return Err(ModelError::Invalid {
                what: "sparsity col_starts not monotone".into(),
            });
        }
        if *self.col_starts.last().unwrap_or(&0) != self.row_indices.len() {
            return Err(ModelError::Invalid {
                what: "sparsity col_starts does not cover row_indices".into(),
            });
        }
        if self.row_indices.iter().any(|&r| r >= rows) {
            return Err(ModelError::Invalid {
                what: "sparsity row index out of range".into(),
            });
        }
        Ok(())
    }
}

/// Description of one torn-system Jacobian.
pub struct JacobianMeta {
    pub id: JacId,
    pub rows: usize,
    pub cols: usize,
    /// Number of intermediate chain-rule slots the column callback uses.
    pub n_tmp: usize,
    pub sparsity: SparsityPattern,
    /// Color groups: columns within one group have disjoint row patterns,
    /// so a single evaluation with all their seeds set serves every column
    /// of the group.
    pub colors: Vec<Vec<usize>>,
    pub column: ColumnFn,
}

impl JacobianMeta {
    /// Dense square Jacobian, one column per color group.
    pub fn dense(
        id: u32,
        n: usize,
        n_tmp: usize,
        column: impl Fn(&Context, &mut JacobianBuffers) -> ModelResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: JacId::from_index(id),
            rows: n,
            cols: n,
            n_tmp,
            sparsity: SparsityPattern::dense(n, n),
            colors: (0..n).map(|c| vec![c]).collect(),
            column: Box::new(column),
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        self.sparsity.validate(self.rows, self.cols)?;

        let mut seen = vec![false; self.cols];
        for group in &self.colors {
            let mut rows_taken = vec![false; self.rows];
            for &c in group {
                if c >= self.cols || seen[c] {
                    return Err(ModelError::Invalid {
                        what: format!("jacobian {} color groups do not partition columns", self.id),
                    });
                }
                seen[c] = true;
                for &r in self.sparsity.col_rows(c) {
                    if rows_taken[r] {
                        return Err(ModelError::Invalid {
                            what: format!(
                                "jacobian {} color group shares row {} between columns",
                                self.id, r
                            ),
                        });
                    }
                    rows_taken[r] = true;
                }
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(ModelError::Invalid {
                what: format!("jacobian {} color groups miss a column", self.id),
            });
        }
        Ok(())
    }
}

/// Side buffers scoped to one Jacobian evaluation.
#[derive(Clone, Debug)]
pub struct JacobianBuffers {
    pub seed: Vec<Real>,
    pub tmp: Vec<Real>,
    pub result: Vec<Real>,
}

impl JacobianBuffers {
    pub fn for_meta(meta: &JacobianMeta) -> Self {
        Self {
            seed: vec![0.0; meta.cols],
            tmp: vec![0.0; meta.n_tmp],
            result: vec![0.0; meta.rows],
        }
    }

    pub fn clear(&mut self) {
        self.seed.fill(0.0);
        self.tmp.fill(0.0);
        self.result.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_pattern_shape() {
        let p = SparsityPattern::dense(2, 3);
        assert_eq!(p.col_starts, vec![0, 2, 4, 6]);
        assert_eq!(p.col_rows(1), &[0, 1]);
        p.validate(2, 3).unwrap();
    }

    #[test]
    fn validate_rejects_shared_rows_in_color() {
        let meta = JacobianMeta {
            id: JacId::from_index(0),
            rows: 2,
            cols: 2,
            n_tmp: 0,
            sparsity: SparsityPattern::dense(2, 2),
            // dense columns share rows, so one group holding both is invalid
            colors: vec![vec![0, 1]],
            column: Box::new(|_, _| Ok(())),
        };
        assert!(meta.validate().is_err());
    }

    #[test]
    fn validate_accepts_disjoint_color_group() {
        // diag([a, b]): columns touch distinct rows, one color suffices
        let meta = JacobianMeta {
            id: JacId::from_index(1),
            rows: 2,
            cols: 2,
            n_tmp: 0,
            sparsity: SparsityPattern {
                col_starts: vec![0, 1, 2],
                row_indices: vec![0, 1],
            },
            colors: vec![vec![0, 1]],
            column: Box::new(|_, _| Ok(())),
        };
        meta.validate().unwrap();
    }
}
