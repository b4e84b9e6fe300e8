use std::{
    fs,
    io::Read,
    path::PathBuf,
};
use flate2::read::GzDecoder;
use varcover::{
    AlleleCountMatrix, CostPolicy, Params, SampleId, Variant, VariantKey, Dosage, Error,
    run, run_batch,
};

fn key(name: &str) -> VariantKey {
    VariantKey::new("chr1", name[1..].parse().unwrap(), "C", "T")
}

fn build(samples: &[&str], rows: &[(&str, &[Dosage])]) -> AlleleCountMatrix {
    AlleleCountMatrix::from_rows(
        samples.iter().map(|&s| SampleId::from(s)).collect(),
        rows.iter().map(|(name, row)| (Variant::new(key(name)), row.to_vec())),
    ).unwrap()
}

fn ids(names: &[&str]) -> Vec<SampleId> {
    names.iter().map(|&s| SampleId::from(s)).collect()
}

fn example() -> AlleleCountMatrix {
    // A:(1,0,0), B:(0,1,1), C:(1,1,0).
    build(&["A", "B", "C"], &[("V1", &[1, 0, 1]), ("V2", &[0, 1, 1]), ("V3", &[0, 1, 0])])
}

fn no_reduction() -> Params {
    Params { reduce_singletons: false, ..Params::default() }
}

fn tmp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("varcover-test-{}-{}", name, std::process::id()))
}

#[test]
fn three_samples_uniform() {
    let res = run(&example(), &no_reduction()).unwrap();
    assert!(res.is_complete());
    assert_eq!(res.solution.solver_samples(), &ids(&["B", "A"])[..]);
    let mut samples = res.solution.samples().to_vec();
    samples.sort();
    assert_eq!(samples, ids(&["A", "B"]));
    assert!(res.solution.per_variant_coverage().iter().all(|&(_, n)| n >= 1));
}

#[test]
fn singleton_is_forced() {
    let m = build(&["A", "B", "C"], &[("V1", &[1, 0, 0]), ("V2", &[0, 1, 1]), ("V3", &[1, 1, 1])]);
    let res = run(&m, &Params::default()).unwrap();
    assert_eq!(res.singletons, vec![key("V1")]);
    assert_eq!(res.solution.forced_samples(), &ids(&["A"])[..]);
    // Solver only saw V2 over samples B and C.
    assert_eq!(res.solution.solver_samples(), &ids(&["B"])[..]);
    assert_eq!(res.solution.samples(), &ids(&["A", "B"])[..]);
    assert!(res.is_complete());
}

#[test]
fn singleton_carriers_always_selected() {
    let m = build(&["A", "B", "C", "D"], &[
        ("V1", &[0, 0, 2, 0]),
        ("V2", &[1, 1, 1, 0]),
        ("V3", &[0, 0, 0, 1]),
        ("V4", &[1, 0, 0, 1]),
        ("V5", &[0, 1, 0, 0]),
    ]);
    for reduce in [true, false] {
        let params = Params { reduce_singletons: reduce, ..Params::default() };
        let res = run(&m, &params).unwrap();
        for sample in ids(&["C", "D", "B"]) {
            assert!(res.solution.samples().contains(&sample), "{} missing (reduce = {})", sample, reduce);
        }
        assert!(res.is_complete());
    }
}

#[test]
fn homozygous_single_carrier_is_left_to_solver() {
    let m = build(&["A", "B", "C"], &[("V1", &[2, 0, 0]), ("V2", &[0, 1, 1]), ("V3", &[0, 1, 1])]);
    let res = run(&m, &Params { max_iters: 1, ..Params::default() }).unwrap();
    assert!(res.singletons.is_empty());
    assert!(res.solution.forced_samples().is_empty());
    assert_eq!(res.solution.solver_samples(), &ids(&["B"])[..]);
    let incomplete = res.incomplete.as_ref().expect("cover must be incomplete");
    assert_eq!(incomplete.uncovered, vec![key("V1")]);
    assert_eq!(incomplete.iterations, 1);

    let res = run(&m, &Params::default()).unwrap();
    assert!(res.is_complete());
    assert_eq!(res.solution.solver_samples(), &ids(&["B", "A"])[..]);
}

#[test]
fn all_zero_matrix_gives_empty_solution() {
    let m = build(&["A", "B"], &[("V1", &[0, 0]), ("V2", &[0, 0])]);
    let res = run(&m, &Params::default()).unwrap();
    assert_eq!(res.solution.n_variants(), 0);
    assert_eq!(res.solution.n_samples(), 0);
    assert_eq!(res.dropped_variants.n_rows(), 2);
    assert_eq!(res.dropped_samples, ids(&["A", "B"]));
    assert!(res.is_complete());
}

#[test]
fn empty_input_is_an_error() {
    let no_samples = AlleleCountMatrix::from_rows(Vec::new(), vec![(Variant::new(key("V1")), Vec::new())]).unwrap();
    assert!(matches!(run(&no_samples, &Params::default()), Err(Error::EmptyInput(_))));
}

#[test]
fn iteration_limit_reports_uncovered() {
    let m = build(&["A", "B", "C"],
        &[("V1", &[1, 0, 0]), ("V2", &[0, 1, 0]), ("V3", &[0, 0, 1]), ("V4", &[1, 1, 0])]);
    let params = Params { reduce_singletons: false, max_iters: 2, ..Params::default() };
    let res = run(&m, &params).unwrap();
    let incomplete = res.incomplete.as_ref().expect("cover must be incomplete");
    assert_eq!(incomplete.iterations, 2);
    assert_eq!(incomplete.uncovered, vec![key("V3")]);
    assert_eq!(res.solution.solver_samples(), &ids(&["A", "B"])[..]);
    // With singleton reduction, all three samples are forced.
    let res = run(&m, &Params { max_iters: 2, ..Params::default() }).unwrap();
    assert!(res.is_complete());
    assert_eq!(res.solution.n_samples(), 3);
}

#[test]
fn repeated_runs_are_identical() {
    let m = build(&["S5", "S3", "S1", "S4", "S2"], &[
        ("V1", &[1, 1, 0, 0, 0]),
        ("V2", &[0, 1, 1, 0, 0]),
        ("V3", &[0, 0, 1, 1, 0]),
        ("V4", &[0, 0, 0, 1, 1]),
        ("V5", &[1, 0, 0, 0, 1]),
    ]);
    let params = no_reduction();
    let first = run(&m, &params).unwrap();
    let second = run(&m, &params).unwrap();
    assert_eq!(first.solution.solver_samples(), second.solution.solver_samples());
    assert_eq!(first.solution.solver_samples(), &ids(&["S1", "S2", "S3"])[..]);
}

#[test]
fn logit_costs_prefer_rare_carriers() {
    // D carries both rarer variants, B carries only the most common one.
    let m = build(&["A", "B", "C", "D"], &[
        ("V1", &[1, 1, 1, 0]),
        ("V2", &[0, 0, 1, 1]),
        ("V3", &[1, 0, 0, 1]),
    ]);
    let params = Params { cost_policy: CostPolicy::LogitWeighted, reduce_singletons: false, ..Params::default() };
    let res = run(&m, &params).unwrap();
    assert!(res.is_complete());
    assert_eq!(res.costs.len(), 4);
    let cost = |s: &str| res.costs.get(&SampleId::from(s)).unwrap();
    assert!(cost("D") < cost("B"));
    assert_eq!(res.solution.solver_samples()[0], SampleId::from("D"));
}

#[test]
fn batch_equals_sequential() {
    let tasks: Vec<_> = (0..6).map(|i| {
        let m = if i % 2 == 0 {
            example()
        } else {
            build(&["A", "B"], &[("V1", &[1, 0]), ("V2", &[0, 2])])
        };
        (format!("task{}", i), m)
    }).collect();
    let params = no_reduction();
    let sequential: Vec<_> = tasks.iter().map(|(_, m)| run(m, &params).unwrap()).collect();
    let batch = run_batch(tasks, &params, 3).unwrap();
    assert_eq!(batch.len(), 6);
    for (i, ((name, res), seq)) in batch.into_iter().zip(sequential).enumerate() {
        assert_eq!(name, format!("task{}", i));
        assert_eq!(res.unwrap().solution.samples(), seq.solution.samples());
    }
    assert!(matches!(run_batch(Vec::new(), &params, 0), Err(Error::InvalidInput(_))));
}

#[test]
fn tsv_input_and_saved_tables() {
    let text = "CHROM\tPOS\tREF\tALT\tA\tB\tC\n\
        chr1\t1\tC\tT\t1\t0\t1\n\
        chr1\t2\tC\tT\t0\t1\t1\n\
        chr1\t3\tC\tT\t0\t1\t0\n\
        chr1\t4\tC\tT\t0\t0\t0\n";
    let m = AlleleCountMatrix::load_tsv(text.as_bytes()).unwrap();
    let res = run(&m, &no_reduction()).unwrap();

    let dir = tmp_dir("plain");
    res.save(&dir, false).unwrap();
    let samples = fs::read_to_string(dir.join("samples.txt")).unwrap();
    assert_eq!(samples, "B\nA\n");
    let uncovered = fs::read_to_string(dir.join("uncovered.tsv")).unwrap();
    assert_eq!(uncovered, "CHROM\tPOS\tREF\tALT\tREASON\nchr1\t4\tC\tT\tno_carrier\n");
    let solution = AlleleCountMatrix::load_tsv(fs::read(dir.join("solution.tsv")).unwrap().as_slice()).unwrap();
    assert_eq!(solution.n_rows(), 3);
    assert_eq!(solution.samples(), &ids(&["B", "A"])[..]);
    fs::remove_dir_all(&dir).unwrap();

    let dir = tmp_dir("gzip");
    res.save(&dir, true).unwrap();
    let mut s = String::new();
    GzDecoder::new(fs::File::open(dir.join("allele_cover.tsv.gz")).unwrap()).read_to_string(&mut s).unwrap();
    assert_eq!(s, "CHROM\tPOS\tREF\tALT\tALLELE_COUNT\nchr1\t1\tC\tT\t1\nchr1\t2\tC\tT\t1\nchr1\t3\tC\tT\t1\n");
    fs::remove_dir_all(&dir).unwrap();
}
