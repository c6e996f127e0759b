//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - Trap-verified distributed quantum sampling",
        style("DQPU").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  dqpu-ir           Circuit model and gate catalog");
    println!("  dqpu-qasm         OpenQASM 2 parser and serializer");
    println!("  dqpu-hal          Sampler abstraction and registry");
    println!("  dqpu-trap         Trap insertion and result verification");
    println!("  dqpu-node         Job lifecycle, verifier and sampler nodes");
    println!("  dqpu-adapter-sim  Statevector sampler");
    println!("  dqpu-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
