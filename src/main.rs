//! imgpack CLI: re-encode the images of each subdirectory into `<subdir>.zip`.

use anyhow::Result;
use clap::Parser;
use imgpack::engine::arg_parser::Cli;
use imgpack::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
