//! # xml-shape Library
//!
//! Single-pass structure inference for XML documents too large to load into
//! memory. The document is streamed as enter/exit events and folded into a
//! tree of (parent, tag) nodes that records occurrence counts, attribute
//! presence and small samples of attribute values and texts. The tree renders
//! as an indented outline report.

pub mod cli;
pub mod config;
pub mod dtd;
pub mod engine;
pub mod error;
pub mod events;
pub mod output;
pub mod progress;
pub mod report;
pub mod shape;
pub mod walker;

pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager, EnvProvider, SystemEnvProvider};
pub use dtd::{DoctypeDecl, EntityResolver, EntityTable, FixedDtdResolver};
pub use engine::{InferenceEngine, PassSummary, infer_str};
pub use error::{Result, ShapeError};
pub use events::{EventSource, RawEvent, ScriptedSource, ShapeEvent, XmlEventSource};
pub use output::{FileReportWriter, ReportSink, random_label};
pub use progress::Progress;
pub use report::{Frequency, ReportRenderer};
pub use shape::{AttributeObservation, NodeId, SamplePolicy, SampleSet, ShapeNode, ShapeTree};
pub use walker::{SnapshotCadence, TreeWalker};
