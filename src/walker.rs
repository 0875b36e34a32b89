//! Tree Walker
//!
//! Drives a [`ShapeTree`] from an [`EventSource`] with a single cursor: an
//! enter event moves the cursor to the (possibly new) child, an exit event
//! folds the element's observations into the cursor node and moves back to its
//! parent. Every so many events the walker renders the partial tree and hands
//! it to a [`ReportSink`] so long passes can be watched while they run.

use tracing::{debug, info};

use crate::error::{Result, ShapeError};
use crate::events::{EventSource, ShapeEvent};
use crate::output::ReportSink;
use crate::progress::Progress;
use crate::report::ReportRenderer;
use crate::shape::{NodeId, ShapeTree};

/// Report name hint used for intermediate snapshots
pub const SNAPSHOT_HINT: &str = "structure";

/// Number of events between snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCadence {
    /// Events before the first snapshot
    pub first_after: u64,
    /// Events between later snapshots
    pub every: u64,
}

impl Default for SnapshotCadence {
    fn default() -> Self {
        Self {
            first_after: 1_000_000,
            every: 15_000_000,
        }
    }
}

pub struct TreeWalker {
    tree: ShapeTree,
    current: NodeId,
    renderer: ReportRenderer,
    cadence: Option<SnapshotCadence>,
    countdown: u64,
    events: u64,
    snapshots: u64,
    total_bytes: Option<u64>,
    snapshot_hint: String,
}

impl TreeWalker {
    pub fn new(tree: ShapeTree, renderer: ReportRenderer) -> Self {
        let current = tree.root();
        let cadence = SnapshotCadence::default();
        Self {
            tree,
            current,
            renderer,
            cadence: Some(cadence),
            countdown: cadence.first_after,
            events: 0,
            snapshots: 0,
            total_bytes: None,
            snapshot_hint: SNAPSHOT_HINT.to_string(),
        }
    }

    /// Set the snapshot cadence; `None` disables snapshots
    pub fn with_cadence(mut self, cadence: Option<SnapshotCadence>) -> Self {
        self.cadence = cadence;
        self.countdown = cadence.map_or(0, |c| c.first_after);
        self
    }

    /// Document size used for progress percentages
    pub fn with_total_bytes(mut self, total_bytes: Option<u64>) -> Self {
        self.total_bytes = total_bytes;
        self
    }

    pub fn with_snapshot_hint(mut self, hint: impl Into<String>) -> Self {
        self.snapshot_hint = hint.into();
        self
    }

    pub fn tree(&self) -> &ShapeTree {
        &self.tree
    }

    pub fn into_tree(self) -> ShapeTree {
        self.tree
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Node the cursor currently points at
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Events processed so far
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Snapshots handed to the sink so far
    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }

    /// Apply one event to the tree and move the cursor
    pub fn apply(&mut self, event: ShapeEvent) -> Result<()> {
        match event {
            ShapeEvent::Enter { tag } => {
                self.current = self.tree.enter_child(self.current, &tag);
            }
            ShapeEvent::Exit {
                tag,
                attributes,
                text,
            } => {
                let Some(parent) = self.tree.parent(self.current) else {
                    return Err(ShapeError::UnbalancedExit { tag });
                };
                let expected = &self.tree.node(self.current).tag;
                if *expected != tag {
                    return Err(ShapeError::MismatchedExit {
                        expected: expected.clone(),
                        found: tag,
                    });
                }
                self.tree.fold_attributes(self.current, &attributes);
                self.tree.fold_text(self.current, &text);
                self.current = parent;
            }
        }
        self.events += 1;
        Ok(())
    }

    /// Consume `source` to the end, snapshotting into `sink` on the way
    pub fn walk<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<()>
    where
        S: EventSource + ?Sized,
        K: ReportSink + ?Sized,
    {
        while let Some(event) = source.next_event()? {
            self.apply(event)?;
            if self.tick() {
                self.snapshot(source.byte_offset(), sink)?;
            }
        }
        self.finish()
    }

    /// Check that every entered element was exited
    pub fn finish(&self) -> Result<()> {
        if self.current != self.tree.root() {
            return Err(ShapeError::UnclosedElements {
                open: self.tree.depth(self.current),
            });
        }
        debug!(
            "Pass finished after {} events with {} nodes",
            self.events,
            self.tree.len() - 1
        );
        Ok(())
    }

    /// Count one event down; true when a snapshot is due
    fn tick(&mut self) -> bool {
        let Some(cadence) = self.cadence else {
            return false;
        };
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = cadence.every;
            true
        } else {
            false
        }
    }

    /// Render the tree as it stands and hand it to `sink`
    pub fn snapshot<K>(&mut self, byte_offset: u64, sink: &mut K) -> Result<()>
    where
        K: ReportSink + ?Sized,
    {
        let progress = Progress::new(self.events, byte_offset, self.total_bytes);
        sink.report_progress(&progress);

        let lines = self.renderer.render(&self.tree);
        let path = sink.write_report(&lines, &self.snapshot_hint)?;
        self.snapshots += 1;
        info!("Snapshot {} at {}: {}", self.snapshots, progress, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RawEvent, ScriptedSource};
    use crate::output::MockReportSink;
    use std::path::PathBuf;

    fn walker() -> TreeWalker {
        TreeWalker::new(ShapeTree::default(), ReportRenderer::default()).with_cadence(None)
    }

    fn silent_sink() -> MockReportSink {
        let mut sink = MockReportSink::new();
        sink.expect_write_report().never();
        sink.expect_report_progress().never();
        sink
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_child_counts() {
        let mut source = ScriptedSource::new(vec![
            ShapeEvent::enter("A"),
            ShapeEvent::enter("B"),
            ShapeEvent::exit("B"),
            ShapeEvent::enter("B"),
            ShapeEvent::exit("B"),
            ShapeEvent::exit("A"),
        ]);
        let mut walker = walker();
        walker.walk(&mut source, &mut silent_sink()).unwrap();

        let tree = walker.tree();
        let a = tree.document_element().unwrap();
        let b = tree.node(a).child("B").unwrap();
        assert_eq!(tree.node(a).occurrences, 1);
        assert_eq!(tree.node(b).occurrences, 2);
        assert_eq!(walker.current(), tree.root());
        assert_eq!(walker.events(), 6);
        assert_eq!(
            walker.renderer().render(tree),
            vec!["- A required", " - B multiple"]
        );
    }

    #[test]
    fn test_required_attribute_across_occurrences() {
        let mut events = vec![ShapeEvent::enter("doc")];
        for i in 0..5 {
            let mut attributes = pairs(&[("id", i.to_string().as_str())]);
            if i == 3 {
                attributes.push(("lang".to_string(), "en".to_string()));
            }
            events.push(ShapeEvent::enter("X"));
            events.push(ShapeEvent::exit_with("X", attributes, ""));
        }
        events.push(ShapeEvent::exit("doc"));

        let mut walker = walker();
        walker
            .walk(&mut ScriptedSource::new(events), &mut silent_sink())
            .unwrap();

        let lines = walker.renderer().render(walker.tree());
        assert_eq!(
            lines[1],
            " - X multiple [Attrs=id|required|enum[0; 1; 2; 3; 4], lang|enum[en]]"
        );
    }

    #[test]
    fn test_attribute_missing_once_is_optional() {
        let mut events = vec![ShapeEvent::enter("doc")];
        for i in 0..5 {
            let attributes = if i == 2 {
                vec![]
            } else {
                pairs(&[("id", "same")])
            };
            events.push(ShapeEvent::enter("X"));
            events.push(ShapeEvent::exit_with("X", attributes, ""));
        }
        events.push(ShapeEvent::exit("doc"));

        let mut walker = walker();
        walker
            .walk(&mut ScriptedSource::new(events), &mut silent_sink())
            .unwrap();
        let lines = walker.renderer().render(walker.tree());
        assert_eq!(lines[1], " - X multiple [Attrs=id|enum[same]]");
    }

    #[test]
    fn test_exit_folds_text_into_current_node() {
        let mut walker = walker();
        walker.apply(ShapeEvent::enter("author")).unwrap();
        walker
            .apply(ShapeEvent::exit_with("author", vec![], "  Jane Doe \n"))
            .unwrap();
        let author = walker.tree().document_element().unwrap();
        assert_eq!(
            walker.tree().node(author).texts.values(),
            &["Jane Doe".to_string()]
        );
    }

    #[test]
    fn test_exit_at_root_is_fatal() {
        let mut walker = walker();
        let err = walker.apply(ShapeEvent::exit("stray")).unwrap_err();
        assert!(matches!(err, ShapeError::UnbalancedExit { ref tag } if tag == "stray"));
        assert!(err.is_malformed_stream());
    }

    #[test]
    fn test_mismatched_exit_is_fatal() {
        let mut walker = walker();
        walker.apply(ShapeEvent::enter("a")).unwrap();
        let err = walker.apply(ShapeEvent::exit("b")).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::MismatchedExit { ref expected, ref found } if expected == "a" && found == "b"
        ));
    }

    #[test]
    fn test_unclosed_elements_at_end() {
        let mut source = ScriptedSource::new(vec![ShapeEvent::enter("a"), ShapeEvent::enter("b")]);
        let err = walker()
            .walk(&mut source, &mut silent_sink())
            .unwrap_err();
        assert!(matches!(err, ShapeError::UnclosedElements { open: 2 }));
    }

    #[test]
    fn test_unknown_event_aborts_walk() {
        let mut source = ScriptedSource::from_raw(vec![
            RawEvent::new("enter", "a"),
            RawEvent::new("comment", "a"),
            RawEvent::new("exit", "a"),
        ]);
        let mut walker = walker();
        let err = walker.walk(&mut source, &mut silent_sink()).unwrap_err();
        assert!(matches!(err, ShapeError::UnknownEvent { .. }));
        assert_eq!(walker.events(), 1);
    }

    #[test]
    fn test_snapshot_cadence() {
        // 8 events, first snapshot after 2, then every 3: events 2, 5 and 8
        let mut events = vec![ShapeEvent::enter("doc")];
        for _ in 0..3 {
            events.push(ShapeEvent::enter("item"));
            events.push(ShapeEvent::exit("item"));
        }
        events.push(ShapeEvent::exit("doc"));

        let mut sink = MockReportSink::new();
        sink.expect_report_progress().times(3).return_const(());
        sink.expect_write_report()
            .withf(|_: &[String], hint: &str| hint == "structure")
            .times(3)
            .returning(|_, _| Ok(PathBuf::from("structure-TEST.txt")));

        let mut walker = TreeWalker::new(ShapeTree::default(), ReportRenderer::default())
            .with_cadence(Some(SnapshotCadence {
                first_after: 2,
                every: 3,
            }));
        walker
            .walk(&mut ScriptedSource::new(events), &mut sink)
            .unwrap();
        assert_eq!(walker.snapshots(), 3);
    }

    #[test]
    fn test_snapshot_renders_partial_tree() {
        let events = vec![
            ShapeEvent::enter("doc"),
            ShapeEvent::enter("item"),
            ShapeEvent::exit("item"),
            ShapeEvent::exit("doc"),
        ];

        let mut sink = MockReportSink::new();
        sink.expect_report_progress()
            .withf(|p: &Progress| p.events == 2 && p.byte_offset == 2 && p.total_bytes == Some(4))
            .times(1)
            .return_const(());
        sink.expect_write_report()
            .withf(|lines: &[String], hint: &str| {
                lines.len() == 2
                    && lines[0] == "- doc required"
                    && lines[1] == " - item required"
                    && hint == "partial"
            })
            .times(1)
            .returning(|_, _| Ok(PathBuf::from("partial-TEST.txt")));

        let mut walker = TreeWalker::new(ShapeTree::default(), ReportRenderer::default())
            .with_cadence(Some(SnapshotCadence {
                first_after: 2,
                every: 100,
            }))
            .with_total_bytes(Some(4))
            .with_snapshot_hint("partial");
        walker
            .walk(&mut ScriptedSource::new(events), &mut sink)
            .unwrap();
    }

    #[test]
    fn test_sink_failure_aborts_walk() {
        let mut sink = MockReportSink::new();
        sink.expect_report_progress().return_const(());
        sink.expect_write_report().times(1).returning(|_, _| {
            Err(ShapeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });

        let mut walker = TreeWalker::new(ShapeTree::default(), ReportRenderer::default())
            .with_cadence(Some(SnapshotCadence {
                first_after: 1,
                every: 1,
            }));
        let mut source = ScriptedSource::new(vec![ShapeEvent::enter("a"), ShapeEvent::exit("a")]);
        let err = walker.walk(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, ShapeError::Io(_)));
    }
}
