//! Inference Engine
//!
//! One complete pass over a document: open it, wire the DTD resolver, walk the
//! event stream into a [`ShapeTree`] while snapshotting, then write the final
//! report.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dtd::FixedDtdResolver;
use crate::error::Result;
use crate::events::{EventSource, XmlEventSource};
use crate::output::ReportSink;
use crate::shape::ShapeTree;
use crate::walker::TreeWalker;

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub events: u64,
    /// Distinct (parent, tag) nodes, not counting the synthetic root
    pub nodes: usize,
    /// Distinct (node, attribute) observations
    pub attributes: usize,
    pub elapsed: Duration,
    pub snapshots: u64,
    /// Final report, `None` when the document had no elements
    pub report: Option<PathBuf>,
}

pub struct InferenceEngine {
    config: Config,
}

impl InferenceEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn new_tree(&self) -> ShapeTree {
        let inference = &self.config.inference;
        ShapeTree::new(inference.attribute_policy(), inference.text_policy())
    }

    fn new_walker(&self, total_bytes: Option<u64>) -> TreeWalker {
        TreeWalker::new(self.new_tree(), self.config.inference.renderer())
            .with_cadence(self.config.progress.cadence())
            .with_total_bytes(total_bytes)
            .with_snapshot_hint(self.config.output.snapshot_prefix.as_str())
    }

    /// Analyze the document at `path`, handing snapshots and the final report to `sink`
    pub fn run<K>(&self, path: &Path, sink: &mut K) -> Result<PassSummary>
    where
        K: ReportSink + ?Sized,
    {
        let total_bytes = match self.config.progress.total_bytes {
            Some(total) => Some(total),
            None => Some(std::fs::metadata(path)?.len()),
        };
        info!("Analyzing {}", path.display());

        let mut source = XmlEventSource::open(path)?;
        if let Some(dtd) = &self.config.input.dtd {
            debug!("Resolving external DTDs to {}", dtd.display());
            source = source.with_resolver(Box::new(FixedDtdResolver::new(dtd.clone())));
        }

        self.run_source(&mut source, total_bytes, sink)
    }

    /// Walk an already opened event source
    pub fn run_source<S, K>(
        &self,
        source: &mut S,
        total_bytes: Option<u64>,
        sink: &mut K,
    ) -> Result<PassSummary>
    where
        S: EventSource + ?Sized,
        K: ReportSink + ?Sized,
    {
        let started = Instant::now();
        let mut walker = self.new_walker(total_bytes);
        walker.walk(source, sink)?;

        let tree = walker.tree();
        let report = if tree.document_element().is_some() {
            let lines = walker.renderer().render(tree);
            Some(sink.write_report(&lines, &self.config.output.final_prefix)?)
        } else {
            warn!("Document contains no elements; no report written");
            None
        };

        let summary = PassSummary {
            events: walker.events(),
            nodes: tree.len() - 1,
            attributes: tree.attribute_count(),
            elapsed: started.elapsed(),
            snapshots: walker.snapshots(),
            report,
        };
        info!(
            "Processed {} events into {} nodes and {} attributes in {:.2?} ({} snapshots)",
            summary.events, summary.nodes, summary.attributes, summary.elapsed, summary.snapshots
        );
        Ok(summary)
    }
}

/// Infer the shape of an in-memory document without writing any report
pub fn infer_str(xml: &str, config: &Config) -> Result<ShapeTree> {
    let engine = InferenceEngine::new(config.clone());
    let mut source = XmlEventSource::from_xml(xml);
    let mut walker = engine.new_walker(None).with_cadence(None);
    walker.walk(&mut source, &mut NullSink)?;
    Ok(walker.into_tree())
}

/// Sink for passes without snapshots
struct NullSink;

impl ReportSink for NullSink {
    fn write_report(&mut self, _lines: &[String], hint: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(hint))
    }

    fn report_progress(&mut self, _progress: &crate::progress::Progress) {}
}
