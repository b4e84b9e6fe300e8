//! Final cover set: forced samples joined with solver-selected samples.

use std::io::{self, Write};
use crate::{
    solver::Selection,
    matrix::{AlleleCountMatrix, SampleId, VariantKey},
};

/// Selected samples and their dosages at all target variants.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    /// Target variants × selected samples.
    matrix: AlleleCountMatrix,
    /// Samples, forced by the singleton reduction.
    forced: Vec<SampleId>,
    /// Samples, selected by the solver, in the order of selection.
    selected: Vec<SampleId>,
    /// Number of selected samples carrying each variant, sorted in descending order.
    variant_coverage: Vec<(VariantKey, u32)>,
    /// Total number of alternative alleles, contributed by each selected sample.
    sample_coverage: Vec<(SampleId, u32)>,
}

impl Solution {
    /// Solution without samples and variants.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Joins forced sub-matrix with the columns of `cleaned`, selected by the solver
    /// (outer join on variants and samples, missing cells are filled with zeros).
    /// Rows follow the order of `cleaned`.
    pub fn assemble(forced: &AlleleCountMatrix, selection: &Selection, cleaned: &AlleleCountMatrix)
        -> crate::Result<Self>
    {
        let solver_part = cleaned.select_samples(&selection.selected)?;
        let joined = forced.outer_join(&solver_part);
        let mut rows: Vec<usize> = (0..joined.n_rows()).collect();
        rows.sort_by_key(|&i| cleaned.row_index(joined.variant(i).key()).unwrap_or(usize::MAX));
        let cols: Vec<usize> = (0..joined.n_cols()).collect();
        let matrix = joined.select(&rows, &cols);

        let mut variant_coverage: Vec<_> = (0..matrix.n_rows())
            .map(|i| (matrix.variant(i).key().clone(), matrix.carriers(i).count() as u32))
            .collect();
        // Stable sort: equally covered variants keep matrix order.
        variant_coverage.sort_by(|a, b| b.1.cmp(&a.1));
        let sample_coverage = matrix.samples().iter().cloned().zip(matrix.col_sums()).collect();

        Ok(Self {
            matrix,
            forced: forced.samples().to_vec(),
            selected: selection.selected.clone(),
            variant_coverage,
            sample_coverage,
        })
    }

    pub fn matrix(&self) -> &AlleleCountMatrix {
        &self.matrix
    }

    /// All selected samples: forced first, then solver-selected.
    pub fn samples(&self) -> &[SampleId] {
        self.matrix.samples()
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.n_cols()
    }

    pub fn n_variants(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn forced_samples(&self) -> &[SampleId] {
        &self.forced
    }

    pub fn solver_samples(&self) -> &[SampleId] {
        &self.selected
    }

    pub fn is_forced(&self, sample: &SampleId) -> bool {
        self.forced.contains(sample)
    }

    /// Number of selected samples, carrying each variant, most covered variants first.
    pub fn per_variant_coverage(&self) -> &[(VariantKey, u32)] {
        &self.variant_coverage
    }

    /// Number of target alternative alleles, contributed by each selected sample.
    pub fn per_sample_coverage(&self) -> &[(SampleId, u32)] {
        &self.sample_coverage
    }

    /// Total number of alternative alleles across the selected samples, for each variant (matrix row order).
    pub fn allele_cover(&self) -> Vec<(VariantKey, u32)> {
        (0..self.matrix.n_rows()).map(|i| (self.matrix.variant(i).key().clone(), self.matrix.row_sum(i))).collect()
    }

    /// Writes selected samples, one per line.
    pub fn write_samples(&self, f: &mut impl Write) -> io::Result<()> {
        for sample in self.samples() {
            writeln!(f, "{}", sample)?;
        }
        Ok(())
    }

    /// Writes `CHROM POS REF ALT ALLELE_COUNT` table.
    pub fn write_allele_cover(&self, f: &mut impl Write) -> io::Result<()> {
        writeln!(f, "CHROM\tPOS\tREF\tALT\tALLELE_COUNT")?;
        for (key, count) in self.allele_cover() {
            key.write_columns(f)?;
            writeln!(f, "\t{}", count)?;
        }
        Ok(())
    }

    /// Writes `CHROM POS REF ALT N_SAMPLES` table, most covered variants first.
    pub fn write_variant_coverage(&self, f: &mut impl Write) -> io::Result<()> {
        writeln!(f, "CHROM\tPOS\tREF\tALT\tN_SAMPLES")?;
        for (key, count) in self.variant_coverage.iter() {
            key.write_columns(f)?;
            writeln!(f, "\t{}", count)?;
        }
        Ok(())
    }

    /// Writes `SAMPLE ALLELES SOURCE` table, where source is either `forced` or `greedy`.
    pub fn write_sample_coverage(&self, f: &mut impl Write) -> io::Result<()> {
        writeln!(f, "SAMPLE\tALLELES\tSOURCE")?;
        for (sample, count) in self.sample_coverage.iter() {
            writeln!(f, "{}\t{}\t{}", sample, count, if self.is_forced(sample) { "forced" } else { "greedy" })?;
        }
        Ok(())
    }
}
