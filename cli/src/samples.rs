use std::{collections::HashMap, num::NonZeroUsize, path::PathBuf};

use anyhow::{anyhow, bail, Context, Error};

use clonal_core::{
    batch::{Failure, Source},
    table::io::sample_id_from_path,
};

/// Resolves the sample of each input path.
///
/// The sample identifier is the file name up to the first '.', followed by `suffix` if provided.
/// Identifiers must be unique across inputs.
pub fn sources(paths: &[PathBuf], suffix: Option<&str>) -> Result<Vec<Source>, Error> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::with_capacity(paths.len());

    paths
        .iter()
        .map(|path| {
            let mut sample_id = sample_id_from_path(path).ok_or_else(|| {
                anyhow!(
                    "failed to determine sample from path '{}'",
                    path.display()
                )
            })?;
            if let Some(suffix) = suffix {
                sample_id.push_str(suffix);
            }

            if let Some(other) = seen.insert(sample_id.clone(), path) {
                bail!(
                    "duplicate sample '{sample_id}' for paths '{}' and '{}'",
                    other.display(),
                    path.display()
                );
            }

            Ok(Source::new(sample_id, path))
        })
        .collect()
}

/// Builds the thread pool used for evaluating samples.
pub fn thread_pool(threads: NonZeroUsize) -> Result<rayon::ThreadPool, Error> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.get())
        .build()
        .context("failed to build thread pool")
}

/// Logs each failure, and returns an error listing the failed items if there are any.
pub fn check_failures<I>(failures: I) -> Result<(), Error>
where
    I: IntoIterator<Item = Failure>,
{
    let items = failures
        .into_iter()
        .map(|failure| {
            log::error!("{failure}");
            failure.item
        })
        .collect::<Vec<_>>();

    if items.is_empty() {
        Ok(())
    } else {
        bail!("failed to process {} item(s): {}", items.len(), items.join(", "))
    }
}
