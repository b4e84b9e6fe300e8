//! Full cover set pipeline: cleaning, costs, singleton reduction, greedy solver and solution assembly.

use std::{
    io::Write,
    path::Path,
    time::Instant,
    thread,
    sync::{
        Arc,
        mpsc::{self, Sender, Receiver},
    },
};
use crate::{
    err::{error, validate_param, add_path},
    ext,
    params::Params,
    cost::CostVector,
    singleton::reduce_singletons,
    solver::{self, Selection},
    solution::Solution,
    matrix::{AlleleCountMatrix, SampleId, VariantKey},
};

/// Solver exhausted the iterations before all variants were covered.
/// This is not an error, partial solution is still returned.
#[derive(Clone, Debug, PartialEq)]
pub struct IncompleteCoverage {
    /// Variants that are not carried by any selected sample.
    pub uncovered: Vec<VariantKey>,
    /// Number of solver iterations.
    pub iterations: u32,
}

/// Cover set together with all removed data.
#[derive(Clone, Debug)]
pub struct CoverResult {
    pub solution: Solution,
    /// Variants without carriers in the input matrix (with their input values).
    pub dropped_variants: AlleleCountMatrix,
    /// Samples without any target alternative allele.
    pub dropped_samples: Vec<SampleId>,
    /// Samples, that carry only variants, already covered by the forced samples.
    pub redundant_samples: Vec<SampleId>,
    /// Variants with a single carrier (empty if singleton reduction was not used).
    pub singletons: Vec<VariantKey>,
    /// Allele frequency of each remaining variant.
    pub allele_freqs: Vec<(VariantKey, f64)>,
    /// Costs of all samples, that carry at least one target allele.
    pub costs: CostVector,
    /// Set if the solver did not cover all variants.
    pub incomplete: Option<IncompleteCoverage>,
}

impl CoverResult {
    /// Result with empty solution (all variants or all samples were removed during cleaning).
    fn empty(dropped_variants: AlleleCountMatrix, dropped_samples: Vec<SampleId>) -> Self {
        Self {
            solution: Solution::empty(),
            dropped_variants,
            dropped_samples,
            redundant_samples: Vec::new(),
            singletons: Vec::new(),
            allele_freqs: Vec::new(),
            costs: CostVector::default(),
            incomplete: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete.is_none()
    }

    /// Writes `CHROM POS REF ALT REASON` table with all variants, not covered by the solution.
    /// Reason is either `no_carrier` (removed during cleaning) or `not_covered` (solver ran out of iterations).
    pub fn write_uncovered(&self, f: &mut impl Write) -> std::io::Result<()> {
        writeln!(f, "CHROM\tPOS\tREF\tALT\tREASON")?;
        for variant in self.dropped_variants.variants() {
            variant.key().write_columns(f)?;
            writeln!(f, "\tno_carrier")?;
        }
        if let Some(incomplete) = &self.incomplete {
            for key in incomplete.uncovered.iter() {
                key.write_columns(f)?;
                writeln!(f, "\tnot_covered")?;
            }
        }
        Ok(())
    }

    /// Writes all output tables into `out_dir` (created if needed), gzip-compressed if needed.
    pub fn save(&self, out_dir: &Path, gzip: bool) -> crate::Result<()> {
        ext::sys::mkdir(out_dir).map_err(add_path!(out_dir))?;
        let suffix = if gzip { ".gz" } else { "" };
        let create = |name: &str| {
            let filename = ext::sys::append_path(&out_dir.join(name), suffix);
            ext::sys::create(&filename, gzip).map(|f| (f, filename.clone())).map_err(add_path!(filename))
        };

        let (mut f, filename) = create("solution.tsv")?;
        self.solution.matrix().write_tsv(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        let (mut f, filename) = create("samples.txt")?;
        self.solution.write_samples(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        let (mut f, filename) = create("allele_cover.tsv")?;
        self.solution.write_allele_cover(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        let (mut f, filename) = create("variant_coverage.tsv")?;
        self.solution.write_variant_coverage(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        let (mut f, filename) = create("sample_coverage.tsv")?;
        self.solution.write_sample_coverage(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        let (mut f, filename) = create("uncovered.tsv")?;
        self.write_uncovered(&mut f).and_then(|_| f.finish()).map_err(add_path!(filename))?;
        log::debug!("    Output tables written to {}", ext::fmt::path(out_dir));
        Ok(())
    }
}

/// Finds a cover set for the allele-count matrix.
///
/// Fails if the matrix has no rows or no columns, or if sample costs cannot be calculated.
/// If all variants or samples are removed during cleaning, returns an empty solution.
pub fn run(matrix: &AlleleCountMatrix, params: &Params) -> crate::Result<CoverResult> {
    params.validate()?;
    if matrix.is_empty() {
        return Err(error!(EmptyInput, "Allele-count matrix has {} variants and {} samples",
            matrix.n_rows(), matrix.n_cols()));
    }
    let timer = Instant::now();
    log::info!("Selecting cover set for {} variants and {} samples ({} costs, singleton reduction {})",
        matrix.n_rows(), matrix.n_cols(), params.cost_policy,
        if params.reduce_singletons { "on" } else { "off" });

    let cleaned = matrix.clean();
    if cleaned.dropped_variants.n_rows() > 0 {
        log::warn!("    {} variants have no carriers and cannot be covered", cleaned.dropped_variants.n_rows());
    }
    if !cleaned.dropped_samples.is_empty() {
        log::debug!("    {} samples carry no target alleles", cleaned.dropped_samples.len());
    }
    if cleaned.matrix.is_empty() {
        log::warn!("    No variants remain after cleaning, solution is empty");
        return Ok(CoverResult::empty(cleaned.dropped_variants, cleaned.dropped_samples));
    }
    let cmatrix = &cleaned.matrix;
    let costs = CostVector::compute(cmatrix, params.cost_policy, matrix.n_cols())?;

    let (forced, selection, redundant_samples, singletons) = if params.reduce_singletons {
        let reduction = reduce_singletons(cmatrix);
        let selection = if reduction.is_complete() {
            log::debug!("    Forced samples cover all variants, solver is skipped");
            Selection::default()
        } else {
            solver::solve(&reduction.residual, &costs, params.max_iters)?
        };
        (reduction.forced, selection, reduction.redundant_samples, reduction.singletons)
    } else {
        (AlleleCountMatrix::empty(), solver::solve(cmatrix, &costs, params.max_iters)?, Vec::new(), Vec::new())
    };

    let solution = Solution::assemble(&forced, &selection, cmatrix)?;
    let incomplete = if selection.is_complete() {
        None
    } else {
        Some(IncompleteCoverage {
            uncovered: selection.uncovered,
            iterations: selection.iterations,
        })
    };
    log::info!("    {} samples ({} forced) required to cover {} alleles{} [{}]",
        solution.n_samples(), solution.forced_samples().len(), solution.n_variants(),
        match &incomplete {
            Some(inc) => format!(", {} alleles remain uncovered", inc.uncovered.len()),
            None => String::new(),
        },
        ext::fmt::Duration(timer.elapsed()));

    let allele_freqs = cmatrix.variants().iter().map(|v| v.key().clone()).zip(cleaned.allele_freqs).collect();
    Ok(CoverResult {
        solution,
        dropped_variants: cleaned.dropped_variants,
        dropped_samples: cleaned.dropped_samples,
        redundant_samples,
        singletons,
        allele_freqs,
        costs,
        incomplete,
    })
}

/// Task, sent to the workers: task index + allele-count matrix.
type Task = (usize, AlleleCountMatrix);
/// Task index + cover set.
type TaskResult = (usize, crate::Result<CoverResult>);

/// Solves independent allele-count matrices in `threads` threads.
/// Output follows the order of the input tasks.
pub fn run_batch(
    tasks: Vec<(String, AlleleCountMatrix)>,
    params: &Params,
    threads: u16,
) -> crate::Result<Vec<(String, crate::Result<CoverResult>)>>
{
    validate_param!(threads > 0, "Number of threads ({}) must be positive", threads);
    params.validate()?;
    let (names, matrices): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let n_workers = usize::from(threads).min(matrices.len());
    log::info!("Solving {} cover set problems in {} threads", matrices.len(), n_workers.max(1));
    let timer = Instant::now();
    let results = if n_workers <= 1 {
        matrices.iter().map(|m| run(m, params)).collect()
    } else {
        MainWorker::new(params, n_workers).run(matrices)?
    };
    log::info!("Solved {} problems in {}", names.len(), ext::fmt::Duration(timer.elapsed()));
    Ok(names.into_iter().zip(results).collect())
}

struct MainWorker {
    senders: Vec<Sender<Task>>,
    receiver: Receiver<TaskResult>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl MainWorker {
    fn new(params: &Params, n_workers: usize) -> Self {
        let params = Arc::new(params.clone());
        let mut senders = Vec::with_capacity(n_workers);
        let mut handles = Vec::with_capacity(n_workers);
        let (res_sender, receiver) = mpsc::channel();
        for _ in 0..n_workers {
            let (task_sender, task_receiver) = mpsc::channel();
            let worker = Worker {
                params: Arc::clone(&params),
                receiver: task_receiver,
                sender: res_sender.clone(),
            };
            senders.push(task_sender);
            handles.push(thread::spawn(|| worker.run()));
        }
        Self { senders, receiver, handles }
    }

    /// Distributes tasks between workers, and collects results in the input order.
    fn run(self, matrices: Vec<AlleleCountMatrix>) -> crate::Result<Vec<crate::Result<CoverResult>>> {
        let n = matrices.len();
        let n_workers = self.senders.len();
        for (i, matrix) in matrices.into_iter().enumerate() {
            self.senders[i % n_workers].send((i, matrix))
                .map_err(|_| error!(RuntimeError, "Worker {} has stopped unexpectedly", i % n_workers))?;
        }
        // Workers stop after all their tasks are processed.
        std::mem::drop(self.senders);

        let mut results: Vec<Option<crate::Result<CoverResult>>> = (0..n).map(|_| None).collect();
        for (i, res) in self.receiver.iter().take(n) {
            results[i] = Some(res);
        }
        for handle in self.handles {
            if handle.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
        Ok(results.into_iter().enumerate()
            .map(|(i, res)| res.unwrap_or_else(|| Err(error!(RuntimeError, "Task {} produced no result", i))))
            .collect())
    }
}

struct Worker {
    params: Arc<Params>,
    receiver: Receiver<Task>,
    sender: Sender<TaskResult>,
}

impl Worker {
    fn run(self) {
        while let Ok((i, matrix)) = self.receiver.recv() {
            let res = run(&matrix, &self.params);
            if self.sender.send((i, res)).is_err() {
                log::error!("Cannot send result of task {}: main thread stopped", i);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error,
        cost::CostPolicy,
        matrix::tests::{build, key},
    };

    #[test]
    fn empty_input() {
        assert!(matches!(run(&AlleleCountMatrix::empty(), &Params::default()), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn uncovered_table() {
        let m = build(&["A", "B"], &[("V1", &[1, 0]), ("V2", &[0, 0]), ("V3", &[1, 1])]);
        let res = run(&m, &Params { reduce_singletons: false, ..Params::default() }).unwrap();
        assert!(res.is_complete());
        let mut out = Vec::new();
        res.write_uncovered(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "CHROM\tPOS\tREF\tALT\tREASON\nV2\t2\tA\tG\tno_carrier\n");
    }

    #[test]
    fn logit_pipeline_errors_are_reported() {
        let m = build(&["A", "B"], &[("V1", &[2, 2])]);
        let params = Params { cost_policy: CostPolicy::LogitWeighted, ..Params::default() };
        assert!(matches!(run(&m, &params), Err(Error::DegenerateCost(_))));
    }

    #[test]
    fn allele_freqs_use_all_samples() {
        let m = build(&["A", "B"], &[("V1", &[1, 0])]);
        let res = run(&m, &Params::default()).unwrap();
        assert_eq!(res.allele_freqs, vec![(key("V1", 1), 0.25)]);
        assert_eq!(res.dropped_samples, vec![SampleId::from("B")]);
    }
}
