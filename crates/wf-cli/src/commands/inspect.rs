use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::run::print_report;
use crate::output::OutputFormat;
use crate::report::RunReport;

#[derive(Args)]
pub struct InspectArgs {
    /// Report file written by a previous `wf run --out`.
    pub file: PathBuf,
}

pub fn inspect(args: InspectArgs, output: OutputFormat) -> Result<()> {
    let report = RunReport::load(&args.file)?;
    print_report(&report, output);
    Ok(())
}
