//! Preprocessing: samples, that are the only carriers of some variant, are selected unconditionally.

use crate::matrix::{AlleleCountMatrix, SampleId, VariantKey};

/// Result of the singleton reduction.
#[derive(Clone, Debug)]
pub struct SingletonReduction {
    /// Variants with a single alternative allele across all samples.
    pub singletons: Vec<VariantKey>,
    /// Carriers of the singleton variants, in the column order of the input matrix.
    pub forced_samples: Vec<SampleId>,
    /// All variants, carried by at least one forced sample × forced samples.
    pub forced: AlleleCountMatrix,
    /// Remaining variants (not carried by any forced sample) × remaining samples, cleaned.
    pub residual: AlleleCountMatrix,
    /// Samples, that were not forced, but carry no remaining variant.
    pub redundant_samples: Vec<SampleId>,
}

impl SingletonReduction {
    /// True if forced samples already cover all variants, and the solver can be skipped.
    pub fn is_complete(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Finds singleton variants (total dosage of exactly one) and forces their carriers into the solution.
/// A variant, carried by a single homozygous sample, is not a singleton.
/// Input matrix is expected to be cleaned.
///
/// Rows covered by forced samples and forced columns are removed from the residual matrix,
/// which is then cleaned again.
pub fn reduce_singletons(matrix: &AlleleCountMatrix) -> SingletonReduction {
    let mut is_forced = vec![false; matrix.n_cols()];
    let mut singletons = Vec::new();
    for i in 0..matrix.n_rows() {
        if matrix.row_sum(i) != 1 {
            continue;
        }
        if let Some(j) = matrix.carriers(i).next() {
            is_forced[j] = true;
            singletons.push(matrix.variant(i).key().clone());
        }
    }

    let (forced_cols, rem_cols): (Vec<usize>, Vec<usize>) = (0..matrix.n_cols()).partition(|&j| is_forced[j]);
    let (covered_rows, rem_rows): (Vec<usize>, Vec<usize>) = (0..matrix.n_rows())
        .partition(|&i| forced_cols.iter().any(|&j| matrix.at(i, j) > 0));
    let forced = matrix.select(&covered_rows, &forced_cols);
    let cleaned = matrix.select(&rem_rows, &rem_cols).clean();
    if cleaned.dropped_variants.n_rows() > 0 {
        log::warn!("    {} variants have no carriers, input matrix was not cleaned", cleaned.dropped_variants.n_rows());
    }

    log::info!("    Singleton reduction: {} singleton variants force {} samples, covering {} variants",
        singletons.len(), forced_cols.len(), covered_rows.len());
    log::debug!("    Residual problem: {} variants x {} samples ({} redundant samples)",
        cleaned.matrix.n_rows(), cleaned.matrix.n_cols(), cleaned.dropped_samples.len());
    SingletonReduction {
        singletons,
        forced_samples: forced.samples().to_vec(),
        forced,
        residual: cleaned.matrix,
        redundant_samples: cleaned.dropped_samples,
    }
}
