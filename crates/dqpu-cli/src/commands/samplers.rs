//! Samplers command implementation.

use anyhow::Result;
use console::style;

use dqpu_hal::SamplerConfig;

use super::common::sampler_registry;

/// Execute the samplers command.
pub async fn execute(self_test: bool) -> Result<()> {
    let registry = sampler_registry();

    println!("{}", style("Available samplers:").bold());
    println!();

    for name in registry.available_samplers() {
        let sampler = registry.create(SamplerConfig::new(name.as_str()))?;
        let status = if !self_test {
            style("registered").dim()
        } else if sampler.self_test().await {
            style("self-test passed").green()
        } else {
            style("self-test failed").red()
        };
        println!(
            "  {:<14} {:>3} qubits  {}",
            style(&name).cyan(),
            sampler.max_qubits(),
            status
        );
    }

    Ok(())
}
