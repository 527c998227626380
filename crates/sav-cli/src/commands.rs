use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, info_span};

use sav_format::WriterOptions;
use sav_repair::{AnalyzerConfig, ChangeReport, RepairEngine, RepairOptions, SaveSummary};

use crate::cli::{InspectArgs, RepairArgs};
use crate::files;

/// Which direction a repair run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairMode {
    Fix,
    Revert,
}

/// What a `fix` or `revert` run did.
#[derive(Debug)]
pub struct RunOutcome {
    pub save: PathBuf,
    pub report: ChangeReport,
    /// `--apply` was given.
    pub applied: bool,
    /// The save file was overwritten.
    pub written: bool,
    pub backup: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Map repair flags onto engine options.
pub fn repair_options(args: &RepairArgs) -> RepairOptions {
    let mut writer = WriterOptions::new();
    if let Some(level) = args.compression {
        writer = writer.with_compression_level(level);
    }
    RepairOptions::new()
        .with_analyzer(AnalyzerConfig::new().with_tolerance(args.tolerance))
        .with_writer(writer)
        .with_revert_radius(args.radius)
        .remove_dangling(!args.keep_dangling)
        .collect_garbage(!args.no_gc)
}

pub fn run_repair(args: &RepairArgs, mode: RepairMode) -> Result<RunOutcome> {
    let save = &args.save;
    let span = info_span!("run", save = %save.display(), ?mode);
    let _guard = span.enter();

    let input = fs::read(save).with_context(|| format!("read save {}", save.display()))?;
    let engine = RepairEngine::with_options(repair_options(args));

    let mut outcome = RunOutcome {
        save: save.clone(),
        report: ChangeReport::new(),
        applied: args.apply,
        written: false,
        backup: None,
        json: None,
    };

    // A dry run only analyzes; `--json` then exports the save as it is.
    if !args.apply {
        outcome.report = match mode {
            RepairMode::Fix => engine.analyze(&input),
            RepairMode::Revert => engine.analyze_revert(&input),
        }
        .with_context(|| format!("analyze {}", save.display()))?;
        if args.json {
            let current = engine
                .parse(&input)
                .with_context(|| format!("read {}", save.display()))?;
            outcome.json = Some(files::write_json(save, current.payload())?);
        }
        return Ok(outcome);
    }

    let (output, report) = match mode {
        RepairMode::Fix => engine.apply(&input),
        RepairMode::Revert => engine.apply_revert(&input),
    }
    .with_context(|| format!("repair {}", save.display()))?;
    outcome.report = report;

    if args.json {
        let repaired = engine
            .parse(&output)
            .context("re-read repaired save")?;
        outcome.json = Some(files::write_json(save, repaired.payload())?);
    }

    if args.apply && output != input {
        outcome.backup = Some(files::create_backup(save)?);
        write_save(save, &output)?;
        outcome.written = true;
        info!(bytes = output.len(), "wrote repaired save");
    }
    Ok(outcome)
}

pub fn run_inspect(args: &InspectArgs) -> Result<SaveSummary> {
    let input =
        fs::read(&args.save).with_context(|| format!("read save {}", args.save.display()))?;
    RepairEngine::new()
        .inspect(&input)
        .with_context(|| format!("inspect {}", args.save.display()))
}

fn write_save(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write save {}", path.display()))
}
