//! CLI command handler: resolve options (defaults → `.imgpack.toml` → flags) and pack ROOT.

use anyhow::Result;
use log::{debug, info};

use crate::PackOpts;
use crate::engine::arg_parser::Cli;
use crate::pack::pack_root;
use crate::utils::config::PackagePaths;
use crate::utils::{ShutdownSignal, apply_file_to_opts, load_imgpack_toml, setup_logging};

fn setup_opts(cli: &Cli) -> PackOpts {
    let mut opts = PackOpts::default();
    if let Some(file) = load_imgpack_toml(&cli.root) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(format) = cli.format {
        opts.pipeline.format = format;
    }
    if let Some(quality) = cli.quality {
        opts.pipeline.quality = quality;
    }
    if let Some(max_width) = cli.max_width {
        opts.pipeline.max_width = max_width;
    }
    if let Some(policy) = cli.on_encode_failure {
        opts.pipeline.on_encode_failure = policy;
    }
    if let Some(naming) = cli.entry_naming {
        opts.entry_naming = naming;
    }
    if cli.threads.is_some() {
        opts.num_threads = cli.threads;
    }
    if cli.output.is_some() {
        opts.output_dir = cli.output.clone();
    }
    if let Some(verbose) = cli.verbose {
        opts.verbose = verbose;
    }
    if cli.quiet {
        opts.progress = false;
    }
    opts
}

/// Pack every subdirectory of ROOT. On shutdown the active archive is finalized by its sink
/// and the process exits with status 0.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose.unwrap_or(false));
    let opts = setup_opts(cli);
    opts.validate()?;
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    let shutdown = ShutdownSignal::install()?;
    let report = pack_root(&cli.root, &opts, &shutdown)?;
    if report.interrupted {
        // Abandoned enumerator/worker threads are torn down with the process.
        std::process::exit(0);
    }
    info!(
        "Done: {} archives written, {} directories failed",
        report.archives().len(),
        report.failed.len()
    );
    Ok(())
}
