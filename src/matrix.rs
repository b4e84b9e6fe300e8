//! Variant × sample allele-count matrix.

use std::{
    fmt,
    io::{self, BufRead, Write},
    collections::{HashMap, hash_map::Entry},
};
use crate::{
    Error,
    err::error,
};

/// Number of alternative alleles, carried by a sample at a variant: 0, 1 or 2.
pub type Dosage = u8;

/// Maximal allowed dosage (homozygous alternative).
pub const MAX_DOSAGE: Dosage = 2;

/// Variant identity: chromosome, position, reference and alternative alleles.
/// Ordered lexicographically in this field order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    chrom: String,
    pos: u64,
    ref_allele: String,
    alt_allele: String,
}

impl VariantKey {
    pub fn new(chrom: impl Into<String>, pos: u64, ref_allele: impl Into<String>, alt_allele: impl Into<String>)
        -> Self
    {
        Self {
            chrom: chrom.into(),
            pos,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }

    /// Writes key as four tab-separated columns `CHROM POS REF ALT`.
    pub fn write_columns(&self, f: &mut impl Write) -> io::Result<()> {
        write!(f, "{}\t{}\t{}\t{}", self.chrom, self.pos, self.ref_allele, self.alt_allele)
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}>{}", self.chrom, self.pos, self.ref_allele, self.alt_allele)
    }
}

/// Variant class, inferred from allele lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantClass {
    Snp,
    Insertion,
    Deletion,
    Other,
}

impl VariantClass {
    pub fn infer(ref_allele: &str, alt_allele: &str) -> Self {
        match (ref_allele.len(), alt_allele.len()) {
            (1, 1) => Self::Snp,
            (r, a) if r < a && alt_allele.starts_with(ref_allele) => Self::Insertion,
            (r, a) if r > a && ref_allele.starts_with(alt_allele) => Self::Deletion,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snp => "SNP",
            Self::Insertion => "insertion",
            Self::Deletion => "deletion",
            Self::Other => "other",
        }
    }
}

/// Variant: identity key and optional metadata, not used for set cover.
#[derive(Clone, Debug)]
pub struct Variant {
    key: VariantKey,
    rsid: Option<String>,
    class: Option<VariantClass>,
}

impl Variant {
    pub fn new(key: VariantKey) -> Self {
        Self {
            key,
            rsid: None,
            class: None,
        }
    }

    pub fn with_rsid(mut self, rsid: impl Into<String>) -> Self {
        self.rsid = Some(rsid.into());
        self
    }

    pub fn with_class(mut self, class: VariantClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn key(&self) -> &VariantKey {
        &self.key
    }

    pub fn rsid(&self) -> Option<&str> {
        self.rsid.as_deref()
    }

    /// Returns stored class, or infers it from the alleles.
    pub fn class(&self) -> VariantClass {
        self.class.unwrap_or_else(|| VariantClass::infer(&self.key.ref_allele, &self.key.alt_allele))
    }
}

impl From<VariantKey> for Variant {
    fn from(key: VariantKey) -> Self {
        Self::new(key)
    }
}

/// Variants are compared only by their keys.
impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Variant {}

/// Opaque sample identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SampleId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for SampleId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense allele-count matrix: rows = unique variants, columns = unique samples.
/// Values are stored row-major.
#[derive(Clone, Debug, Default)]
pub struct AlleleCountMatrix {
    variants: Vec<Variant>,
    samples: Vec<SampleId>,
    row_ix: HashMap<VariantKey, usize>,
    col_ix: HashMap<SampleId, usize>,
    data: Vec<Dosage>,
}

fn index_samples(samples: &[SampleId]) -> Result<HashMap<SampleId, usize>, Error> {
    let mut col_ix = HashMap::with_capacity(samples.len());
    for (j, sample) in samples.iter().enumerate() {
        if col_ix.insert(sample.clone(), j).is_some() {
            return Err(error!(InvalidInput, "Sample '{}' appears at least twice", sample));
        }
    }
    Ok(col_ix)
}

impl AlleleCountMatrix {
    /// Creates a matrix from variants, samples and row-major dosages.
    pub fn new(variants: Vec<Variant>, samples: Vec<SampleId>, data: Vec<Dosage>) -> crate::Result<Self> {
        if data.len() != variants.len() * samples.len() {
            return Err(error!(InvalidInput, "Allele-count matrix has {} values, expected {} x {}",
                data.len(), variants.len(), samples.len()));
        }
        let col_ix = index_samples(&samples)?;
        let mut row_ix = HashMap::with_capacity(variants.len());
        for (i, variant) in variants.iter().enumerate() {
            if row_ix.insert(variant.key.clone(), i).is_some() {
                return Err(error!(InvalidInput, "Variant {} appears at least twice", variant.key));
            }
        }
        if samples.len() > 0 {
            for (i, row) in data.chunks_exact(samples.len()).enumerate() {
                if let Some(j) = row.iter().position(|&x| x > MAX_DOSAGE) {
                    return Err(error!(InvalidData, "Dosage {} at variant {}, sample {} is not in [0, {}]",
                        row[j], variants[i].key, samples[j], MAX_DOSAGE));
                }
            }
        }
        Ok(Self { variants, samples, row_ix, col_ix, data })
    }

    /// Creates a matrix from rows, each row must contain one dosage per sample.
    pub fn from_rows<I>(samples: Vec<SampleId>, rows: I) -> crate::Result<Self>
    where I: IntoIterator<Item = (Variant, Vec<Dosage>)>,
    {
        let mut variants = Vec::new();
        let mut data = Vec::new();
        for (variant, row) in rows {
            if row.len() != samples.len() {
                return Err(error!(InvalidInput, "Variant {} has {} dosages, expected {}",
                    variant.key, row.len(), samples.len()));
            }
            variants.push(variant);
            data.extend_from_slice(&row);
        }
        Self::new(variants, samples, data)
    }

    /// Matrix without rows and columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a matrix from already validated parts.
    fn from_parts(variants: Vec<Variant>, samples: Vec<SampleId>, data: Vec<Dosage>) -> Self {
        debug_assert_eq!(data.len(), variants.len() * samples.len());
        let row_ix = variants.iter().enumerate().map(|(i, v)| (v.key.clone(), i)).collect();
        let col_ix = samples.iter().enumerate().map(|(j, s)| (s.clone(), j)).collect();
        Self { variants, samples, row_ix, col_ix, data }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.variants.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty() || self.samples.is_empty()
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn variant(&self, i: usize) -> &Variant {
        &self.variants[i]
    }

    pub fn sample(&self, j: usize) -> &SampleId {
        &self.samples[j]
    }

    pub fn row_index(&self, key: &VariantKey) -> Option<usize> {
        self.row_ix.get(key).copied()
    }

    pub fn col_index(&self, sample: &SampleId) -> Option<usize> {
        self.col_ix.get(sample).copied()
    }

    /// Dosage by variant key and sample, None if either is absent.
    pub fn get(&self, key: &VariantKey, sample: &SampleId) -> Option<Dosage> {
        Some(self.at(self.row_index(key)?, self.col_index(sample)?))
    }

    /// Dosage by row and column indices.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> Dosage {
        self.data[i * self.samples.len() + j]
    }

    /// All dosages at row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[Dosage] {
        let m = self.samples.len();
        &self.data[i * m..(i + 1) * m]
    }

    /// All dosages at column `j`.
    pub fn column(&self, j: usize) -> impl Iterator<Item = Dosage> + '_ {
        (0..self.n_rows()).map(move |i| self.at(i, j))
    }

    pub fn row_sum(&self, i: usize) -> u32 {
        self.row(i).iter().map(|&x| u32::from(x)).sum()
    }

    pub fn col_sum(&self, j: usize) -> u32 {
        self.column(j).map(u32::from).sum()
    }

    pub fn row_sums(&self) -> Vec<u32> {
        (0..self.n_rows()).map(|i| self.row_sum(i)).collect()
    }

    pub fn col_sums(&self) -> Vec<u32> {
        let mut sums = vec![0_u32; self.n_cols()];
        for i in 0..self.n_rows() {
            for (s, &x) in sums.iter_mut().zip(self.row(i)) {
                *s += u32::from(x);
            }
        }
        sums
    }

    /// Columns, that carry variant `i` (nonzero dosage).
    pub fn carriers(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.row(i).iter().enumerate().filter(|&(_, &x)| x > 0).map(|(j, _)| j)
    }

    /// Rows, covered by sample `j` (nonzero dosage).
    pub fn covered_rows(&self, j: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_rows()).filter(move |&i| self.at(i, j) > 0)
    }

    /// Sub-matrix with the selected rows and columns (in the given order).
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        let variants = rows.iter().map(|&i| self.variants[i].clone()).collect();
        let samples = cols.iter().map(|&j| self.samples[j].clone()).collect();
        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &i in rows {
            let row = self.row(i);
            data.extend(cols.iter().map(|&j| row[j]));
        }
        Self::from_parts(variants, samples, data)
    }

    /// Sub-matrix with all rows and selected columns.
    pub fn select_cols(&self, cols: &[usize]) -> Self {
        let rows: Vec<_> = (0..self.n_rows()).collect();
        self.select(&rows, cols)
    }

    /// Sub-matrix with selected samples (in the given order). Unknown samples produce an error.
    pub fn select_samples<'a>(&self, samples: impl IntoIterator<Item = &'a SampleId>) -> crate::Result<Self> {
        let cols = samples.into_iter()
            .map(|s| self.col_index(s).ok_or_else(|| error!(InvalidInput, "Unknown sample '{}'", s)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.select_cols(&cols))
    }

    /// Outer join on the union of row and column keys.
    /// Rows and columns of `self` come first, followed by new keys from `other`.
    /// Cells, defined in neither matrix, are filled with zeros.
    /// Cells, defined in both, are taken from `self`.
    pub fn outer_join(&self, other: &Self) -> Self {
        let mut variants = self.variants.clone();
        let mut row_ix = self.row_ix.clone();
        for variant in other.variants.iter() {
            if let Entry::Vacant(entry) = row_ix.entry(variant.key.clone()) {
                entry.insert(variants.len());
                variants.push(variant.clone());
            }
        }
        let mut samples = self.samples.clone();
        let mut col_ix = self.col_ix.clone();
        for sample in other.samples.iter() {
            if let Entry::Vacant(entry) = col_ix.entry(sample.clone()) {
                entry.insert(samples.len());
                samples.push(sample.clone());
            }
        }

        let m = samples.len();
        let mut data = vec![0; variants.len() * m];
        for (i2, variant) in other.variants.iter().enumerate() {
            let i = row_ix[&variant.key];
            for (j2, sample) in other.samples.iter().enumerate() {
                data[i * m + col_ix[sample]] = other.at(i2, j2);
            }
        }
        for i in 0..self.n_rows() {
            data[i * m..i * m + self.n_cols()].copy_from_slice(self.row(i));
        }
        Self { variants, samples, row_ix, col_ix, data }
    }

    /// Removes all-zero rows, and then all-zero columns.
    /// Removed rows are kept (with their values) in `dropped_variants`.
    pub fn clean(&self) -> CleanedMatrix {
        let all_cols: Vec<_> = (0..self.n_cols()).collect();
        let (kept_rows, dropped_rows): (Vec<usize>, Vec<usize>) = (0..self.n_rows())
            .partition(|&i| self.row_sum(i) >= 1);
        let dropped_variants = self.select(&dropped_rows, &all_cols);
        let rows_cleaned = self.select(&kept_rows, &all_cols);

        // Diagnostic allele frequency, calculated before samples are removed.
        let n_alleles = 2.0 * rows_cleaned.n_cols() as f64;
        let allele_freqs = rows_cleaned.row_sums().into_iter().map(|s| f64::from(s) / n_alleles).collect();

        let col_sums = rows_cleaned.col_sums();
        let (kept_cols, dropped_cols): (Vec<usize>, Vec<usize>) = (0..rows_cleaned.n_cols())
            .partition(|&j| col_sums[j] >= 1);
        let dropped_samples = dropped_cols.iter().map(|&j| rows_cleaned.samples[j].clone()).collect();
        let matrix = rows_cleaned.select_cols(&kept_cols);

        CleanedMatrix { matrix, dropped_variants, dropped_samples, allele_freqs }
    }

    /// True if all rows and columns have at least one nonzero value.
    pub fn is_clean(&self) -> bool {
        (0..self.n_rows()).all(|i| self.row_sum(i) > 0) && self.col_sums().into_iter().all(|s| s > 0)
    }

    /// Loads matrix from a tab-separated table with header `CHROM POS REF ALT sample1 sample2 ...`.
    /// Dosages may be written as integers or as integral floats (`1.0`).
    pub fn load_tsv(reader: impl BufRead) -> crate::Result<Self> {
        const KEY_COLUMNS: usize = 4;
        let mut lines = reader.lines();
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(error!(ParsingError, "Allele-count table is empty")),
            }
        };
        let columns: Vec<_> = header.trim_end().split('\t').collect();
        let expected = ["CHROM", "POS", "REF", "ALT"];
        if columns.len() < KEY_COLUMNS || !columns.iter().zip(&expected)
                .all(|(col, exp)| col.trim_start_matches('#').eq_ignore_ascii_case(exp)) {
            return Err(error!(ParsingError, "Allele-count table header must start with {}, found '{}'",
                expected.join(", "), header));
        }
        let samples: Vec<SampleId> = columns[KEY_COLUMNS..].iter().map(|&s| SampleId::from(s)).collect();

        let mut variants = Vec::new();
        let mut data = Vec::new();
        for (line_num, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<_> = line.trim_end().split('\t').collect();
            if fields.len() != columns.len() {
                return Err(error!(ParsingError, "Line {} has {} columns, expected {}",
                    line_num + 2, fields.len(), columns.len()));
            }
            let pos = fields[1].parse::<u64>().map_err(|_|
                error!(ParsingError, "Cannot parse position '{}' on line {}", fields[1], line_num + 2))?;
            variants.push(Variant::new(VariantKey::new(fields[0], pos, fields[2], fields[3])));
            for &field in &fields[KEY_COLUMNS..] {
                data.push(parse_dosage(field).ok_or_else(||
                    error!(ParsingError, "Cannot parse dosage '{}' on line {}", field, line_num + 2))?);
            }
        }
        Self::new(variants, samples, data)
    }

    /// Writes matrix as a tab-separated table with header `CHROM POS REF ALT sample1 sample2 ...`.
    pub fn write_tsv(&self, f: &mut impl Write) -> io::Result<()> {
        write!(f, "CHROM\tPOS\tREF\tALT")?;
        for sample in self.samples.iter() {
            write!(f, "\t{}", sample)?;
        }
        writeln!(f)?;
        for (i, variant) in self.variants.iter().enumerate() {
            variant.key.write_columns(f)?;
            for x in self.row(i) {
                write!(f, "\t{}", x)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses dosage, written either as integer or as an integral float.
/// Values above `MAX_DOSAGE` are returned and rejected later.
fn parse_dosage(s: &str) -> Option<Dosage> {
    let s = s.trim();
    if let Ok(x) = s.parse::<Dosage>() {
        return Some(x);
    }
    let x = s.parse::<f64>().ok()?;
    if x >= 0.0 && x.fract() == 0.0 && x <= f64::from(Dosage::MAX) {
        Some(x as Dosage)
    } else {
        None
    }
}

/// Matrix without all-zero rows and columns, together with removed parts.
#[derive(Clone, Debug)]
pub struct CleanedMatrix {
    /// Every row and column has at least one nonzero value (or the matrix is empty).
    pub matrix: AlleleCountMatrix,
    /// Variants without any carrier, across all input samples.
    pub dropped_variants: AlleleCountMatrix,
    /// Samples without any alternative allele at the remaining variants.
    pub dropped_samples: Vec<SampleId>,
    /// Allele frequency for each row of `matrix`: `row sum / (2 × number of samples)`,
    /// where the number of samples includes samples from `dropped_samples`.
    pub allele_freqs: Vec<f64>,
}
