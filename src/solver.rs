//! Greedy weighted set cover.
//!
//! At each step, the solver selects the sample that covers the most currently uncovered variants
//! per unit of cost. Ties are broken in favor of the lowest sample id.
//! One step takes O(number of nonzero matrix entries), so the whole solution takes at most
//! O(rows × columns × iterations).

use std::fmt;
use crate::{
    err::validate_param,
    cost::CostVector,
    matrix::{AlleleCountMatrix, SampleId, VariantKey},
};

/// Samples, selected by the solver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// Selected samples in the order of selection.
    pub selected: Vec<SampleId>,
    /// Variants that remained uncovered (empty if the cover is complete).
    pub uncovered: Vec<VariantKey>,
    /// Number of performed iterations (equal to the number of selected samples).
    pub iterations: u32,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}

/// Single-use solver context: constructed for one matrix and consumed by `finish`.
pub struct GreedySolver<'a> {
    matrix: &'a AlleleCountMatrix,
    /// Costs in the matrix column order.
    costs: Vec<f64>,
    /// For each column, rows with nonzero dosage.
    col_rows: Vec<Vec<u32>>,
    /// Columns, sorted by sample id. Candidates are examined in this order, so the first best column wins ties.
    tie_order: Vec<usize>,
    is_uncovered: Vec<bool>,
    n_uncovered: usize,
    is_selected: Vec<bool>,
    selected: Vec<usize>,
    iterations: u32,
    is_finished: bool,
}

impl<'a> GreedySolver<'a> {
    /// Creates solver. Cost vector must contain all matrix samples.
    pub fn new(matrix: &'a AlleleCountMatrix, costs: &CostVector) -> crate::Result<Self> {
        let costs = costs.restrict(matrix.samples())?.costs().to_vec();
        let n_cols = matrix.n_cols();
        let mut col_rows = vec![Vec::new(); n_cols];
        for i in 0..matrix.n_rows() {
            for j in matrix.carriers(i) {
                col_rows[j].push(i as u32);
            }
        }
        let mut tie_order: Vec<usize> = (0..n_cols).collect();
        tie_order.sort_by(|&j, &k| matrix.sample(j).cmp(matrix.sample(k)));

        let n_uncovered = matrix.n_rows();
        Ok(Self {
            matrix, costs, col_rows, tie_order,
            is_uncovered: vec![true; n_uncovered],
            n_uncovered,
            is_selected: vec![false; n_cols],
            selected: Vec::new(),
            iterations: 0,
            // Without columns, nothing can be covered.
            is_finished: n_uncovered == 0 || n_cols == 0,
        })
    }

    /// Number of currently uncovered rows, carried by column `j`.
    fn new_coverage(&self, j: usize) -> usize {
        self.col_rows[j].iter().filter(|&&i| self.is_uncovered[i as usize]).count()
    }

    /// Performs one iteration and returns the selected column.
    /// Returns None if no column can cover any new rows. In that case, the solver is finished.
    pub fn step(&mut self) -> Option<usize> {
        if self.is_finished {
            log::warn!("GreedySolver is finished, but `step` is called one more time.");
            return None;
        }
        let mut best: Option<(usize, usize, f64)> = None;
        for &j in self.tie_order.iter() {
            if self.is_selected[j] {
                continue;
            }
            let count = self.new_coverage(j);
            if count == 0 {
                continue;
            }
            let gain = count as f64 / self.costs[j];
            if best.map(|(_, _, best_gain)| gain > best_gain).unwrap_or(true) {
                best = Some((j, count, gain));
            }
        }

        let Some((j, count, gain)) = best else {
            self.is_finished = true;
            return None;
        };
        for &i in self.col_rows[j].iter() {
            self.is_uncovered[i as usize] = false;
        }
        self.n_uncovered -= count;
        self.is_selected[j] = true;
        self.selected.push(j);
        self.iterations += 1;
        self.is_finished = self.n_uncovered == 0;
        log::trace!("        [{:3}] {}: +{} variants (gain {:.4}), {} remain",
            self.iterations, self.matrix.sample(j), count, gain, self.n_uncovered);
        Some(j)
    }

    /// Returns true if all rows are covered, or if no more rows can be covered.
    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn n_uncovered(&self) -> usize {
        self.n_uncovered
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Consumes solver and returns selected samples.
    pub fn finish(self) -> Selection {
        let matrix = self.matrix;
        Selection {
            selected: self.selected.iter().map(|&j| matrix.sample(j).clone()).collect(),
            uncovered: self.is_uncovered.iter().enumerate()
                .filter(|&(_, &unc)| unc)
                .map(|(i, _)| matrix.variant(i).key().clone())
                .collect(),
            iterations: self.iterations,
        }
    }
}

impl<'a> fmt::Display for GreedySolver<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Greedy({} variants x {} samples)", self.matrix.n_rows(), self.matrix.n_cols())
    }
}

/// Runs greedy solver for at most `max_iters` iterations.
/// If the iterations are exhausted before all rows are covered, returns partial selection
/// together with uncovered rows.
pub fn solve(matrix: &AlleleCountMatrix, costs: &CostVector, max_iters: u32) -> crate::Result<Selection> {
    validate_param!(max_iters > 0, "Maximal number of iterations ({}) must be positive", max_iters);
    let mut solver = GreedySolver::new(matrix, costs)?;
    while !solver.is_finished() && solver.iterations() < max_iters {
        solver.step();
    }
    log::debug!("    {} finished after {} iterations, {} variants uncovered",
        solver, solver.iterations(), solver.n_uncovered());
    let selection = solver.finish();
    if !selection.is_complete() {
        log::warn!("    Could not cover {} variants in {} iterations", selection.uncovered.len(), max_iters);
    }
    Ok(selection)
}
