//! Repair pipeline: parse, index, analyze, rewrite, collect, serialize.

use sav_format::{
    ReaderOptions, SaveEdits, SaveFile, WriterOptions, check_edits, encode_save_with_options,
    parse_save_with_options,
};

use crate::analyzer::{AnalyzerConfig, JunctionAnalyzer};
use crate::classify::Classifier;
use crate::dangling;
use crate::error::Result;
use crate::gc;
use crate::graph::SplineGraph;
use crate::index::EntityIndex;
use crate::inspect::SaveSummary;
use crate::purge::{self, Purge};
use crate::report::{ChangeReport, RepairWarning};
use crate::revert::{self, DEFAULT_REVERT_RADIUS};
use crate::rewriter;
use crate::template;

/// Options for a repair run.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub reader: ReaderOptions,
    pub writer: WriterOptions,
    pub analyzer: AnalyzerConfig,
    pub classifier: Classifier,
    /// Delete splines whose endpoints are missing before analysis.
    pub remove_dangling: bool,
    /// Delete unreferenced poles and drones after rewriting.
    pub collect_garbage: bool,
    /// Largest pole-to-junction distance accepted when reverting.
    pub revert_radius: f64,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            reader: ReaderOptions::default(),
            writer: WriterOptions::default(),
            analyzer: AnalyzerConfig::default(),
            classifier: Classifier::default(),
            remove_dangling: true,
            collect_garbage: true,
            revert_radius: DEFAULT_REVERT_RADIUS,
        }
    }
}

impl RepairOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, reader: ReaderOptions) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_writer(mut self, writer: WriterOptions) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn remove_dangling(mut self, enabled: bool) -> Self {
        self.remove_dangling = enabled;
        self
    }

    pub fn collect_garbage(mut self, enabled: bool) -> Self {
        self.collect_garbage = enabled;
        self
    }

    pub fn with_revert_radius(mut self, radius: f64) -> Self {
        self.revert_radius = radius;
        self
    }
}

/// Edits and report produced by planning a run.
struct Prepared {
    edits: SaveEdits,
    report: ChangeReport,
}

/// Runs repairs over save buffers.
///
/// Analysis and application share one planning path; the only difference is
/// whether the planned edits are encoded into a new buffer. Either way the
/// edits are checked against the save, so a dry run fails exactly where a
/// real run would.
#[derive(Debug, Clone, Default)]
pub struct RepairEngine {
    options: RepairOptions,
}

impl RepairEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RepairOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RepairOptions {
        &self.options
    }

    pub fn parse(&self, buffer: &[u8]) -> Result<SaveFile> {
        Ok(parse_save_with_options(buffer, &self.options.reader)?)
    }

    /// Report what a junction repair would change, without producing output.
    pub fn analyze(&self, buffer: &[u8]) -> Result<ChangeReport> {
        let save = self.parse(buffer)?;
        let prepared = self.plan_fix(&save)?;
        check_edits(&save, &prepared.edits)?;
        Ok(prepared.report)
    }

    /// Repair junctions and return the new buffer with its report.
    pub fn apply(&self, buffer: &[u8]) -> Result<(Vec<u8>, ChangeReport)> {
        let save = self.parse(buffer)?;
        let prepared = self.plan_fix(&save)?;
        self.encode(&save, prepared)
    }

    /// Report what reverting a previous repair would change.
    pub fn analyze_revert(&self, buffer: &[u8]) -> Result<ChangeReport> {
        let save = self.parse(buffer)?;
        let prepared = self.plan_revert(&save)?;
        check_edits(&save, &prepared.edits)?;
        Ok(prepared.report)
    }

    /// Revert a previous repair and return the new buffer with its report.
    pub fn apply_revert(&self, buffer: &[u8]) -> Result<(Vec<u8>, ChangeReport)> {
        let save = self.parse(buffer)?;
        let prepared = self.plan_revert(&save)?;
        self.encode(&save, prepared)
    }

    /// Count what a save contains.
    pub fn inspect(&self, buffer: &[u8]) -> Result<SaveSummary> {
        let save = self.parse(buffer)?;
        Ok(SaveSummary::new(&save, &self.options.classifier))
    }

    fn encode(&self, save: &SaveFile, prepared: Prepared) -> Result<(Vec<u8>, ChangeReport)> {
        let bytes = encode_save_with_options(save, &prepared.edits, &self.options.writer)?;
        Ok((bytes, prepared.report))
    }

    fn plan_fix(&self, save: &SaveFile) -> Result<Prepared> {
        let _span = tracing::info_span!("fix").entered();
        let mut index = EntityIndex::from_save(save, &self.options.classifier);
        let mut graph = SplineGraph::from_save(save);
        let mut report = ChangeReport::new();
        tracing::info!(
            entities = index.len(),
            splines = graph.len(),
            junctions = index.junctions().count(),
            "indexed save"
        );

        let dangling = if self.options.remove_dangling {
            dangling::remove_dangling(&mut index, &mut graph, &mut report)
        } else {
            Vec::new()
        };

        let plans = JunctionAnalyzer::new(self.options.analyzer).analyze(&index, &graph);
        if plans.is_empty() {
            report.warn(RepairWarning::NothingToRepair);
        }
        rewriter::rewrite(&plans, &mut index, &mut graph, &mut report)?;

        // A run that rewrites and removes nothing leaves the file untouched.
        if self.options.collect_garbage && !(plans.is_empty() && dangling.is_empty()) {
            gc::collect_garbage(&mut index, &graph, &mut report);
        }

        let purge = purge::purge_references(save, &index, &graph, &mut report);
        let edits = build_edits(&index, &graph, &purge)?;
        let counts = report.counts();
        tracing::info!(
            junctions = counts.junctions_repaired,
            poles = counts.poles_created,
            rewrites = counts.references_rewritten,
            deleted = counts.entities_deleted,
            "planned junction repair"
        );
        Ok(Prepared { edits, report })
    }

    fn plan_revert(&self, save: &SaveFile) -> Result<Prepared> {
        let _span = tracing::info_span!("revert").entered();
        let mut index = EntityIndex::from_save(save, &self.options.classifier);
        let mut graph = SplineGraph::from_save(save);
        let mut report = ChangeReport::new();

        let removed = revert::revert_poles(
            &mut index,
            &mut graph,
            self.options.revert_radius,
            &mut report,
        )?;
        if report.is_empty() && report.warnings().is_empty() {
            report.warn(RepairWarning::NothingToRepair);
        }

        let purge = purge::purge_references(save, &index, &graph, &mut report);
        let edits = build_edits(&index, &graph, &purge)?;
        tracing::info!(
            poles_removed = removed.len(),
            rewrites = report.counts().references_rewritten,
            "planned revert"
        );
        Ok(Prepared { edits, report })
    }
}

/// Translate the state of a run into positional edits.
fn build_edits(index: &EntityIndex, graph: &SplineGraph, purge: &Purge) -> Result<SaveEdits> {
    let mut edits = SaveEdits::new();
    for record in index.deleted_records() {
        edits.entities.remove(record);
    }
    for spline in graph.modified() {
        edits
            .entities
            .replace_fragment(spline.record, spline.fragment, spline.text());
    }
    for patch in &purge.fragments {
        edits
            .entities
            .replace_fragment(patch.record, patch.fragment, patch.text.as_str());
    }
    for entity in index.created() {
        edits.entities.append(entity.id.key(), template::render(entity)?);
    }
    for &idx in &purge.connectors {
        edits.connectors.remove(idx);
    }
    Ok(edits)
}

/// Report what a junction repair would change, with default options.
pub fn analyze(buffer: &[u8]) -> Result<ChangeReport> {
    RepairEngine::new().analyze(buffer)
}

/// Repair junctions with default options.
pub fn apply(buffer: &[u8]) -> Result<(Vec<u8>, ChangeReport)> {
    RepairEngine::new().apply(buffer)
}
