use std::{
    fs::{self, File},
    io::{self, BufWriter},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Error};

use clap::Parser;

use clonal_core::{
    batch,
    overlap::OverlapMetric,
    report::{NumberFormat, OverlapReport},
    table::io::Builder,
    IdentityCriterion,
};

use crate::samples;

/// Calculate overlap metrics between all ordered pairs of samples.
#[derive(Debug, Parser)]
pub struct Overlap {
    /// Input clonotype tables.
    ///
    /// Each file holds a single sample, named after the file up to its first '.'. Files may be
    /// gzipped. At least two samples are required.
    #[arg(required = true, num_args = 2.., value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Criterion for matching clonotypes between samples.
    ///
    /// One of 'CDR3|nt', 'CDR3|aa', 'CDR3|nt|V|J', or 'CDR3|aa|V|J'.
    #[arg(
        short = 'c',
        long,
        default_value_t = IdentityCriterion::default(),
        value_parser = IdentityCriterion::from_str,
        value_name = "CRITERION"
    )]
    criterion: IdentityCriterion,

    /// Metrics to calculate.
    ///
    /// More than one metric can be output. Use comma to separate metrics.
    #[arg(
        short = 'm',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        default_values_t = OverlapMetric::ALL,
        value_parser = OverlapMetric::from_str,
        value_name = "METRIC,..."
    )]
    metrics: Vec<OverlapMetric>,

    /// Output directory.
    ///
    /// If provided, one table is written per metric, named '<DOWNSAMPLING>.<METRIC>.tsv'.
    /// Otherwise, a single table with a column per metric is written to stdout.
    #[arg(short = 'O', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Name of the downsampling applied to the inputs.
    #[arg(long, default_value = "none", value_name = "NAME")]
    downsampling: String,

    /// Precision to use when printing metrics.
    ///
    /// By default, the shortest representation that identifies each value is used.
    #[arg(short = 'p', long, value_name = "INT")]
    precision: Option<usize>,

    /// Suffix appended to each sample identifier.
    #[arg(long, value_name = "STR")]
    sample_suffix: Option<String>,

    /// Number of threads to use.
    #[arg(short = 't', long, default_value_t = NonZeroUsize::new(4).unwrap(), value_name = "INT")]
    threads: NonZeroUsize,
}

impl Overlap {
    pub fn run(self) -> Result<(), Error> {
        let sources = samples::sources(&self.inputs, self.sample_suffix.as_deref())?;
        log::info!(
            "Computing overlap of {} samples grouped by {} with '{}' downsampling",
            sources.len(),
            self.criterion,
            self.downsampling
        );

        let builder = Builder::default().set_criterion(self.criterion);

        let (loaded, computed) = samples::thread_pool(self.threads)?.install(|| {
            let loaded = batch::load(&sources, &builder);
            let computed = batch::overlap(&loaded.successes);
            (loaded, computed)
        });

        let report = OverlapReport::new(computed.successes);
        let format = self.precision.map(NumberFormat::fixed).unwrap_or_default();

        match &self.output_dir {
            Some(dir) => self.write_per_metric(&report, dir, &format)?,
            None => report.write_metrics(io::stdout().lock(), &self.metrics, &format)?,
        }

        samples::check_failures(loaded.failures.into_iter().chain(computed.failures))
    }

    fn write_per_metric(
        &self,
        report: &OverlapReport,
        dir: &Path,
        format: &NumberFormat,
    ) -> Result<(), Error> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;

        for &metric in self.metrics.iter() {
            let path = dir.join(format!("{}.{metric}.tsv", self.downsampling));
            let file = File::create(&path)
                .with_context(|| format!("failed to create '{}'", path.display()))?;

            report.write_metric(BufWriter::new(file), metric, format)?;
            log::info!(
                "Wrote {metric} of {} pairs to '{}'",
                report.results().len(),
                path.display()
            );
        }

        Ok(())
    }
}
