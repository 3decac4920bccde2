use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use mzgroup::manifest::split_by_column;

use super::print_status;

/// Split `input` into one manifest per distinct value of `column`
pub fn run(input: PathBuf, column: String, output_dir: PathBuf) -> Result<ExitCode> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    info!("Grouping {} by '{column}'", input.display());
    let groups = split_by_column(&input, &column, &output_dir)
        .with_context(|| format!("Failed to group {}", input.display()))?;

    for group in &groups {
        info!("  {} ({} rows)", group.path.display(), group.rows);
    }
    print_status(
        true,
        &format!(
            "Wrote {} group files to {}",
            groups.len(),
            output_dir.display()
        ),
    );
    Ok(ExitCode::SUCCESS)
}
