//! Sample command implementation.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use dqpu_hal::{ExperimentResult, SamplerConfig};

use super::common::{load_circuit, print_counts, sampler_registry, write_output};

/// Sample a circuit file with a registered sampler.
pub async fn sample_file(
    input: &Path,
    shots: u64,
    sampler: &str,
    seed: Option<u64>,
) -> Result<ExperimentResult> {
    let circuit = load_circuit(input)?;
    let mut config = SamplerConfig::new(sampler);
    config.seed = seed;
    let sampler = sampler_registry().create(config)?;
    Ok(sampler.sample(&circuit, shots).await?)
}

/// Execute the sample command.
pub async fn execute(
    input: &Path,
    output: Option<&Path>,
    shots: u64,
    sampler: &str,
    seed: Option<u64>,
) -> Result<()> {
    eprintln!(
        "{} Sampling {} with {} ({} shots)",
        style("→").cyan().bold(),
        style(input.display()).green(),
        style(sampler).yellow(),
        shots
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Sampling...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = sample_file(input, shots, sampler, seed).await;
    spinner.finish_and_clear();
    let result = result?;

    if output.is_some() {
        print_counts(&result);
    }
    write_output(output, &result.to_json()?)
}
