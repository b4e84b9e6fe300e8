//! Per-sample costs for the weighted set cover.

use std::{
    fmt,
    str::FromStr,
    collections::HashMap,
};
use crate::{
    Error,
    err::error,
    ext::vec::F64Ext,
    matrix::{AlleleCountMatrix, SampleId},
};

/// How sample costs are calculated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CostPolicy {
    /// Every sample costs 1.
    #[default]
    Uniform,
    /// Cost is inversely proportional to the sum of logit-transformed allele frequencies
    /// of the variants, carried by the sample (normalized by the median across samples).
    /// Carriers of rare alleles become cheaper.
    LogitWeighted,
}

impl CostPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::LogitWeighted => "logit",
        }
    }
}

impl FromStr for CostPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase() as &str {
            "uniform" | "standard" => Ok(Self::Uniform),
            "logit" | "logit-weighted" | "logitweighted" => Ok(Self::LogitWeighted),
            _ => Err(error!(InvalidInput, "Unknown cost policy '{}' (allowed: uniform, logit)", s)),
        }
    }
}

impl fmt::Display for CostPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log-odds transform `ln(p / (1 - p))`.
#[inline]
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Strictly positive finite cost for each sample.
#[derive(Clone, Debug, Default)]
pub struct CostVector {
    samples: Vec<SampleId>,
    costs: Vec<f64>,
    index: HashMap<SampleId, usize>,
}

impl CostVector {
    /// Creates cost vector, all costs must be positive and finite.
    pub fn new(samples: Vec<SampleId>, costs: Vec<f64>) -> crate::Result<Self> {
        if samples.len() != costs.len() {
            return Err(error!(InvalidInput, "Number of costs ({}) does not match the number of samples ({})",
                costs.len(), samples.len()));
        }
        for (sample, &cost) in samples.iter().zip(&costs) {
            if !(cost > 0.0 && cost.is_finite()) {
                return Err(error!(InvalidCost, "Sample '{}' has cost {}, must be positive and finite",
                    sample, cost));
            }
        }
        let mut index = HashMap::with_capacity(samples.len());
        for (j, sample) in samples.iter().enumerate() {
            if index.insert(sample.clone(), j).is_some() {
                return Err(error!(InvalidInput, "Sample '{}' has several costs", sample));
            }
        }
        Ok(Self { samples, costs, index })
    }

    /// Cost 1 for every sample.
    pub fn uniform(samples: &[SampleId]) -> Self {
        Self {
            samples: samples.to_vec(),
            costs: vec![1.0; samples.len()],
            index: samples.iter().enumerate().map(|(j, s)| (s.clone(), j)).collect(),
        }
    }

    /// Calculates costs for all matrix columns.
    /// `total_samples`: number of samples in the input matrix, before cleaning.
    pub fn compute(matrix: &AlleleCountMatrix, policy: CostPolicy, total_samples: usize) -> crate::Result<Self> {
        match policy {
            CostPolicy::Uniform => Ok(Self::uniform(matrix.samples())),
            CostPolicy::LogitWeighted => Self::logit_weighted(matrix, total_samples),
        }
    }

    /// Population frequency of each variant is `p = row sum / (4 × total_samples)`.
    /// Sample score = sum of `dosage × logit(p)` across variants, and cost = `median(score) / score`.
    ///
    /// Fails with `DegenerateCost` if some `p` is not within (0, 1), if the median score is zero,
    /// or if some normalized score `score / median` is not positive.
    pub fn logit_weighted(matrix: &AlleleCountMatrix, total_samples: usize) -> crate::Result<Self> {
        if matrix.n_cols() == 0 {
            return Ok(Self::default());
        }
        let n_alleles = 4.0 * total_samples as f64;
        let mut logits = Vec::with_capacity(matrix.n_rows());
        for (i, row_sum) in matrix.row_sums().into_iter().enumerate() {
            let p = f64::from(row_sum) / n_alleles;
            if !(p > 0.0 && p < 1.0) {
                return Err(error!(DegenerateCost, "Variant {} has population frequency {} (logit is undefined)",
                    matrix.variant(i).key(), p));
            }
            logits.push(logit(p));
        }

        let mut scores = vec![0.0; matrix.n_cols()];
        for (i, &l) in logits.iter().enumerate() {
            for (score, &x) in scores.iter_mut().zip(matrix.row(i)) {
                *score += f64::from(x) * l;
            }
        }
        let median = F64Ext::median(&scores);
        if median == 0.0 || !median.is_finite() {
            return Err(error!(DegenerateCost, "Median sample score is {}, cannot normalize scores", median));
        }

        let mut costs = Vec::with_capacity(scores.len());
        for (j, &score) in scores.iter().enumerate() {
            let norm_score = score / median;
            if !(norm_score > 0.0 && norm_score.is_finite()) {
                return Err(error!(DegenerateCost,
                    "Sample '{}' has score {:.5} (normalized {:.5}), cannot calculate cost",
                    matrix.sample(j), score, norm_score));
            }
            costs.push(1.0 / norm_score);
        }
        log::debug!("    Logit-weighted costs within [{:.4}, {:.4}], mean {:.4} (median score {:.4})",
            F64Ext::min(&costs), F64Ext::max(&costs), F64Ext::mean(&costs), median);
        Self::new(matrix.samples().to_vec(), costs)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn get(&self, sample: &SampleId) -> Option<f64> {
        self.index.get(sample).map(|&j| self.costs[j])
    }

    /// Cost vector for a subset of samples, in the given order.
    pub fn restrict(&self, samples: &[SampleId]) -> crate::Result<Self> {
        let costs = samples.iter()
            .map(|s| self.get(s).ok_or_else(|| error!(InvalidInput, "Sample '{}' has no cost", s)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(samples.to_vec(), costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::tests::build;

    fn example() -> AlleleCountMatrix {
        // Columns A, B, C; A:(1,0,0), B:(0,1,1), C:(1,1,0).
        build(&["A", "B", "C"], &[("V1", &[1, 0, 1]), ("V2", &[0, 1, 1]), ("V3", &[0, 1, 0])])
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("standard".parse::<CostPolicy>().unwrap(), CostPolicy::Uniform);
        assert_eq!("Logit".parse::<CostPolicy>().unwrap(), CostPolicy::LogitWeighted);
        assert!(matches!("power".parse::<CostPolicy>(), Err(Error::InvalidInput(_))));
        assert_eq!(CostPolicy::LogitWeighted.to_string(), "logit");
    }

    #[test]
    fn uniform_costs() {
        let costs = CostVector::compute(&example(), CostPolicy::Uniform, 3).unwrap();
        assert_eq!(costs.costs(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn logit_costs() {
        let costs = CostVector::compute(&example(), CostPolicy::LogitWeighted, 3).unwrap();
        // p(V1) = p(V2) = 2/12, p(V3) = 1/12.
        let (l1, l3) = (logit(2.0 / 12.0), logit(1.0 / 12.0));
        let median = 2.0 * l1;
        assert!((costs.get(&SampleId::from("A")).unwrap() - 2.0).abs() < 1e-12);
        assert!((costs.get(&SampleId::from("B")).unwrap() - median / (l1 + l3)).abs() < 1e-12);
        assert!((costs.get(&SampleId::from("C")).unwrap() - 1.0).abs() < 1e-12);
        // Carrier of the rarest allele is the cheapest.
        assert!(costs.get(&SampleId::from("B")).unwrap() < 1.0);
    }

    #[test]
    fn logit_degenerate_frequency() {
        let m = build(&["A", "B"], &[("V1", &[2, 2])]);
        // p = 4 / 4 = 1.
        assert!(matches!(CostVector::compute(&m, CostPolicy::LogitWeighted, 1), Err(Error::DegenerateCost(_))));
        // p = 4 / 8 = 0.5, logit = 0 and all scores are zero.
        assert!(matches!(CostVector::compute(&m, CostPolicy::LogitWeighted, 2), Err(Error::DegenerateCost(_))));
    }

    #[test]
    fn logit_degenerate_sample_score() {
        // V1 has p = 0.5, so sample A has zero score, while the median is negative.
        let m = build(&["A", "B", "C"], &[("V1", &[2, 2, 2]), ("V2", &[0, 1, 1])]);
        match CostVector::compute(&m, CostPolicy::LogitWeighted, 3) {
            Err(Error::DegenerateCost(s)) => assert!(s.contains("'A'")),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn invalid_costs() {
        let samples = vec![SampleId::from("A"), SampleId::from("B")];
        assert!(CostVector::new(samples.clone(), vec![1.0, 0.5]).is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(CostVector::new(samples.clone(), vec![1.0, bad]), Err(Error::InvalidCost(_))));
        }
    }

    #[test]
    fn restrict_costs() {
        let samples = vec![SampleId::from("A"), SampleId::from("B"), SampleId::from("C")];
        let costs = CostVector::new(samples, vec![1.0, 2.0, 3.0]).unwrap();
        let sub = costs.restrict(&[SampleId::from("C"), SampleId::from("A")]).unwrap();
        assert_eq!(sub.costs(), &[3.0, 1.0]);
        assert!(costs.restrict(&[SampleId::from("D")]).is_err());
    }
}
