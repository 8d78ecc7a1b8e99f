//! Assembly of results into report tables.
//!
//! Reports have a canonical layout independent of the order in which results were computed:
//! diversity rows are sorted by sample, and overlap rows by the ordered pair of samples.
//! Reports are written as tab-separated tables with a header line.

use std::io;

use crate::{diversity::DiversityResult, overlap::OverlapMetric, overlap::OverlapResult};

mod format;
pub use format::NumberFormat;

/// Header of the sample identifier column of diversity reports.
pub const SAMPLE_ID: &str = "sampleId";

/// Headers of the sample identifier columns of overlap reports.
pub const PAIR_IDS: [&str; 2] = ["1_sample_id", "2_sample_id"];

fn tsv_writer<W>(writer: W) -> csv::Writer<W>
where
    W: io::Write,
{
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

/// A column of a diversity report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiversityColumn {
    /// Chao1 estimate.
    Chao1,
    /// Standard deviation of the Chao1 estimate.
    Chao1Std,
    /// d50.
    D50,
    /// Efron-Thisted estimate.
    EfronThisted,
    /// Standard deviation of the Efron-Thisted estimate.
    EfronThistedStd,
    /// Gini index.
    Gini,
    /// Inverse Simpson index.
    InverseSimpson,
    /// Normalized Shannon-Wiener index.
    NormalizedShannonWiener,
    /// Observed diversity.
    Observed,
    /// Shannon-Wiener diversity.
    ShannonWiener,
}

impl DiversityColumn {
    const BASIC: [DiversityColumn; 8] = [
        DiversityColumn::Observed,
        DiversityColumn::ShannonWiener,
        DiversityColumn::NormalizedShannonWiener,
        DiversityColumn::InverseSimpson,
        DiversityColumn::Gini,
        DiversityColumn::Chao1,
        DiversityColumn::D50,
        DiversityColumn::EfronThisted,
    ];

    const EXTENDED: [DiversityColumn; 2] =
        [DiversityColumn::Chao1Std, DiversityColumn::EfronThistedStd];

    /// Returns the columns of a report, sorted by header.
    ///
    /// If `extended` is set, the standard deviations of the richness estimates are included.
    pub fn columns(extended: bool) -> Vec<DiversityColumn> {
        let mut columns = Self::BASIC.to_vec();
        if extended {
            columns.extend(Self::EXTENDED);
        }
        columns.sort_by_key(|column| column.header());
        columns
    }

    /// Returns the header of the column.
    pub fn header(&self) -> &'static str {
        match self {
            DiversityColumn::Chao1 => "Chao1 estimate",
            DiversityColumn::Chao1Std => "Chao1 std",
            DiversityColumn::D50 => "d50",
            DiversityColumn::EfronThisted => "Efron-Thisted estimate",
            DiversityColumn::EfronThistedStd => "Efron-Thisted std",
            DiversityColumn::Gini => "Gini index",
            DiversityColumn::InverseSimpson => "Inverse Simpson index",
            DiversityColumn::NormalizedShannonWiener => "Normalized Shannon-Wiener index",
            DiversityColumn::Observed => "Observed diversity",
            DiversityColumn::ShannonWiener => "Shannon-Wiener diversity",
        }
    }

    fn format(&self, result: &DiversityResult, format: &NumberFormat) -> String {
        match self {
            DiversityColumn::Chao1 => format.real(result.chao1.estimate),
            DiversityColumn::Chao1Std => format.real(result.chao1.std),
            DiversityColumn::D50 => format.count(result.d50.0),
            DiversityColumn::EfronThisted => format.real(result.efron_thisted.estimate),
            DiversityColumn::EfronThistedStd => format.real(result.efron_thisted.std),
            DiversityColumn::Gini => format.real(result.gini.0),
            DiversityColumn::InverseSimpson => format.real(result.inverse_simpson.0),
            DiversityColumn::NormalizedShannonWiener => {
                format.real(result.normalized_shannon_wiener.0)
            }
            DiversityColumn::Observed => format.count(result.observed.0),
            DiversityColumn::ShannonWiener => format.real(result.shannon_wiener.0),
        }
    }
}

/// A report of the diversity of several samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DiversityReport {
    results: Vec<DiversityResult>,
    columns: Vec<DiversityColumn>,
}

impl DiversityReport {
    /// Assembles a report, sorting results by sample.
    pub fn new<I>(results: I, extended: bool) -> Self
    where
        I: IntoIterator<Item = DiversityResult>,
    {
        let mut results = results.into_iter().collect::<Vec<_>>();
        results.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));

        Self {
            results,
            columns: DiversityColumn::columns(extended),
        }
    }

    /// Returns the report header.
    pub fn header(&self) -> Vec<&'static str> {
        std::iter::once(SAMPLE_ID)
            .chain(self.columns.iter().map(DiversityColumn::header))
            .collect()
    }

    /// Returns the results in report order.
    pub fn results(&self) -> &[DiversityResult] {
        &self.results
    }

    /// Writes the report.
    pub fn write<W>(&self, writer: W, format: &NumberFormat) -> io::Result<()>
    where
        W: io::Write,
    {
        let mut writer = tsv_writer(writer);

        writer.write_record(self.header())?;
        for result in self.results.iter() {
            let row = std::iter::once(result.sample_id.clone()).chain(
                self.columns
                    .iter()
                    .map(|column| column.format(result, format)),
            );
            writer.write_record(row)?;
        }

        writer.flush()
    }
}

/// A report of the overlap between ordered pairs of samples.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapReport {
    results: Vec<OverlapResult>,
}

impl OverlapReport {
    /// Assembles a report, sorting results by ordered pair of samples.
    pub fn new<I>(results: I) -> Self
    where
        I: IntoIterator<Item = OverlapResult>,
    {
        let mut results = results.into_iter().collect::<Vec<_>>();
        results.sort_by(|a, b| {
            (&a.sample_id_1, &a.sample_id_2).cmp(&(&b.sample_id_1, &b.sample_id_2))
        });

        Self { results }
    }

    /// Returns the results in report order.
    pub fn results(&self) -> &[OverlapResult] {
        &self.results
    }

    fn format(result: &OverlapResult, metric: OverlapMetric, format: &NumberFormat) -> String {
        match metric {
            OverlapMetric::SharedClonotypes => format.count(result.shared_clonotypes),
            metric => format.real(result.get(metric)),
        }
    }

    /// Writes the table of a single metric.
    pub fn write_metric<W>(
        &self,
        writer: W,
        metric: OverlapMetric,
        format: &NumberFormat,
    ) -> io::Result<()>
    where
        W: io::Write,
    {
        self.write_metrics(writer, &[metric], format)
    }

    /// Writes a table with one column per metric.
    pub fn write_metrics<W>(
        &self,
        writer: W,
        metrics: &[OverlapMetric],
        format: &NumberFormat,
    ) -> io::Result<()>
    where
        W: io::Write,
    {
        let mut writer = tsv_writer(writer);

        let header = PAIR_IDS
            .iter()
            .copied()
            .chain(metrics.iter().map(OverlapMetric::name));
        writer.write_record(header)?;

        for result in self.results.iter() {
            let row = [result.sample_id_1.clone(), result.sample_id_2.clone()]
                .into_iter()
                .chain(
                    metrics
                        .iter()
                        .map(|&metric| Self::format(result, metric, format)),
                );
            writer.write_record(row)?;
        }

        writer.flush()
    }
}
