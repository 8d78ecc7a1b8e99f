use std::{
    fs::File,
    io::{self, BufWriter},
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
};

use anyhow::{Context, Error};

use clap::Parser;

use clonal_core::{
    batch,
    diversity::EfronThistedParams,
    report::{DiversityReport, NumberFormat},
    table::io::Builder,
    DiversityEstimator, IdentityCriterion,
};

use crate::samples;

/// Calculate diversity indices of samples.
#[derive(Debug, Parser)]
pub struct Diversity {
    /// Input clonotype tables.
    ///
    /// Each file holds a single sample, named after the file up to its first '.'. Files may be
    /// gzipped.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Criterion for grouping rows into clonotypes.
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

    /// Precision to use when printing indices.
    ///
    /// By default, the shortest representation that identifies each value is used.
    #[arg(short = 'p', long, value_name = "INT")]
    precision: Option<usize>,

    /// Include standard deviations of the richness estimates.
    #[arg(short = 'e', long)]
    extended: bool,

    /// Output file.
    ///
    /// If no file is provided, the report is written to stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Name of the downsampling applied to the inputs.
    #[arg(long, default_value = "none", value_name = "NAME")]
    downsampling: String,

    /// Suffix appended to each sample identifier.
    #[arg(long, value_name = "STR")]
    sample_suffix: Option<String>,

    /// Maximum extrapolation depth of the Efron-Thisted estimator.
    #[arg(
        long,
        default_value_t = NonZeroUsize::new(EfronThistedParams::DEFAULT_MAX_DEPTH).unwrap(),
        value_name = "INT"
    )]
    efron_thisted_depth: NonZeroUsize,

    /// Coefficient of variation at which Efron-Thisted extrapolation stops.
    #[arg(long, default_value_t = EfronThistedParams::DEFAULT_CV_THRESHOLD, value_name = "FLOAT")]
    efron_thisted_cv: f64,

    /// Number of threads to use.
    #[arg(short = 't', long, default_value_t = NonZeroUsize::new(4).unwrap(), value_name = "INT")]
    threads: NonZeroUsize,
}

impl Diversity {
    pub fn run(self) -> Result<(), Error> {
        let sources = samples::sources(&self.inputs, self.sample_suffix.as_deref())?;
        log::info!(
            "Computing diversity of {} samples grouped by {} with '{}' downsampling",
            sources.len(),
            self.criterion,
            self.downsampling
        );

        let builder = Builder::default().set_criterion(self.criterion);
        let estimator = DiversityEstimator::new(EfronThistedParams::new(
            self.efron_thisted_depth,
            self.efron_thisted_cv,
        ));

        let (loaded, computed) = samples::thread_pool(self.threads)?.install(|| {
            let loaded = batch::load(&sources, &builder);
            let computed = batch::diversity(&loaded.successes, &estimator);
            (loaded, computed)
        });

        let report = DiversityReport::new(computed.successes, self.extended);
        let format = self.precision.map(NumberFormat::fixed).unwrap_or_default();

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create '{}'", path.display()))?;
                report.write(BufWriter::new(file), &format)?;
                log::info!(
                    "Wrote diversity of {} samples to '{}'",
                    report.results().len(),
                    path.display()
                );
            }
            None => report.write(io::stdout().lock(), &format)?,
        }

        samples::check_failures(loaded.failures.into_iter().chain(computed.failures))
    }
}
