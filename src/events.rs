//! Event Source
//!
//! Turns a document into the flat enter/exit stream the walker consumes. An
//! exit event carries everything the walker folds into the tree: the element's
//! attributes and the character data that precedes its first child.
//!
//! [`XmlEventSource`] reads with `quick-xml` and keeps only a stack of open
//! elements; an element's state is dropped as soon as its exit event is handed
//! out. [`ScriptedSource`] replays a prepared list of events.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::dtd::{DoctypeDecl, EntityResolver, EntityTable};
use crate::error::{Result, ShapeError};

/// One step of the forward pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeEvent {
    Enter {
        tag: String,
    },
    Exit {
        tag: String,
        attributes: Vec<(String, String)>,
        text: String,
    },
}

impl ShapeEvent {
    pub fn enter(tag: impl Into<String>) -> Self {
        ShapeEvent::Enter { tag: tag.into() }
    }

    /// Exit event without attributes or text
    pub fn exit(tag: impl Into<String>) -> Self {
        Self::exit_with(tag, Vec::new(), "")
    }

    pub fn exit_with(
        tag: impl Into<String>,
        attributes: Vec<(String, String)>,
        text: impl Into<String>,
    ) -> Self {
        ShapeEvent::Exit {
            tag: tag.into(),
            attributes,
            text: text.into(),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ShapeEvent::Enter { tag } | ShapeEvent::Exit { tag, .. } => tag,
        }
    }
}

/// An event as recorded outside the reader, with a free-form kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: String,
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl RawEvent {
    pub fn new(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            tag: tag.into(),
            attributes: Vec::new(),
            text: String::new(),
        }
    }
}

impl TryFrom<RawEvent> for ShapeEvent {
    type Error = ShapeError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        match raw.kind.as_str() {
            "enter" | "start" => Ok(ShapeEvent::Enter { tag: raw.tag }),
            "exit" | "end" => Ok(ShapeEvent::Exit {
                tag: raw.tag,
                attributes: raw.attributes,
                text: raw.text,
            }),
            _ => Err(ShapeError::UnknownEvent { kind: raw.kind }),
        }
    }
}

impl From<ShapeEvent> for RawEvent {
    fn from(event: ShapeEvent) -> Self {
        match event {
            ShapeEvent::Enter { tag } => RawEvent::new("enter", tag),
            ShapeEvent::Exit {
                tag,
                attributes,
                text,
            } => RawEvent {
                kind: "exit".to_string(),
                tag,
                attributes,
                text,
            },
        }
    }
}

/// Ordered, finite supply of events with a notion of how far it has read
pub trait EventSource {
    /// Next event, or `None` once the document is exhausted
    fn next_event(&mut self) -> Result<Option<ShapeEvent>>;

    /// Approximate byte offset reached in the underlying document
    fn byte_offset(&self) -> u64;
}

/// Replays a list of events. The offset is the number of events handed out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    events: VecDeque<RawEvent>,
    emitted: u64,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = ShapeEvent>) -> Self {
        Self::from_raw(events.into_iter().map(RawEvent::from))
    }

    pub fn from_raw(events: impl IntoIterator<Item = RawEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            emitted: 0,
        }
    }
}

impl EventSource for ScriptedSource {
    fn next_event(&mut self) -> Result<Option<ShapeEvent>> {
        match self.events.pop_front() {
            Some(raw) => {
                self.emitted += 1;
                ShapeEvent::try_from(raw).map(Some)
            }
            None => Ok(None),
        }
    }

    fn byte_offset(&self) -> u64 {
        self.emitted
    }
}

/// State of an element whose end tag has not been read yet
#[derive(Debug)]
struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    /// Character data still belongs to the element's leading text
    collecting: bool,
}

/// Streams enter/exit events out of an XML document
pub struct XmlEventSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<OpenElement>,
    pending_exit: Option<ShapeEvent>,
    entities: EntityTable,
    resolver: Option<Box<dyn EntityResolver>>,
}

impl XmlEventSource<BufReader<File>> {
    /// Open a document on disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<'a> XmlEventSource<&'a [u8]> {
    pub fn from_xml(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlEventSource<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            open: Vec::new(),
            pending_exit: None,
            entities: EntityTable::default(),
            resolver: None,
        }
    }

    /// Resolve the document's external subset through `resolver`
    pub fn with_resolver(mut self, resolver: Box<dyn EntityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// Number of elements currently open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn load_doctype(&mut self, content: &str) -> Result<()> {
        let decl = DoctypeDecl::parse(content);
        debug!("Document type {}", decl.name);

        if let Some(subset) = &decl.internal_subset {
            self.entities.declare_from_dtd(subset);
        }

        if let (Some(system_id), Some(resolver)) = (&decl.system_id, &self.resolver)
            && let Some(path) = resolver.resolve(system_id, decl.public_id.as_deref())
        {
            self.entities.load_dtd_file(&path)?;
        }
        Ok(())
    }

    /// Character data arriving after a child, comment or processing instruction
    /// is no longer the parent's leading text.
    fn close_leading_text(&mut self) {
        if let Some(parent) = self.open.last_mut() {
            parent.collecting = false;
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(element) = self.open.last_mut()
            && element.collecting
        {
            element.text.push_str(text);
        }
    }
}

fn read_element(start: &BytesStart, entities: &EntityTable, position: u64) -> Result<OpenElement> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ShapeError::xml(position, e))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value_with(|entity| entities.get(entity))
            .map_err(|e| ShapeError::xml(position, e))?
            .into_owned();
        attributes.push((name, value));
    }

    Ok(OpenElement {
        tag,
        attributes,
        text: String::new(),
        collecting: true,
    })
}

/// What one reader event means for the open-element stack, detached from the read buffer
enum Step {
    Start(OpenElement),
    Empty(OpenElement),
    End(String),
    Text(String),
    Boundary,
    Doctype(String),
    Skip,
    Eof,
}

impl<R: BufRead> XmlEventSource<R> {
    fn read_step(&mut self, position: u64) -> Result<Step> {
        self.buf.clear();
        let event = self
            .reader
            .read_event_into(&mut self.buf)
            .map_err(|e| ShapeError::xml(position, e))?;

        let entities = &self.entities;
        Ok(match event {
            Event::Start(start) => Step::Start(read_element(&start, entities, position)?),
            Event::Empty(start) => Step::Empty(read_element(&start, entities, position)?),
            Event::End(end) => Step::End(String::from_utf8_lossy(end.name().as_ref()).into_owned()),
            Event::Text(text) => Step::Text(
                text.unescape_with(|entity| entities.get(entity))
                    .map_err(|e| ShapeError::xml(position, e))?
                    .into_owned(),
            ),
            Event::CData(cdata) => {
                Step::Text(String::from_utf8_lossy(&cdata.into_inner()).into_owned())
            }
            Event::Comment(_) | Event::PI(_) => Step::Boundary,
            Event::DocType(doctype) => {
                Step::Doctype(String::from_utf8_lossy(&doctype.into_inner()).into_owned())
            }
            Event::Decl(_) => Step::Skip,
            Event::Eof => Step::Eof,
        })
    }
}

impl<R: BufRead> EventSource for XmlEventSource<R> {
    fn next_event(&mut self) -> Result<Option<ShapeEvent>> {
        if let Some(exit) = self.pending_exit.take() {
            return Ok(Some(exit));
        }

        loop {
            let position = self.position();
            match self.read_step(position)? {
                Step::Start(element) => {
                    let tag = element.tag.clone();
                    self.close_leading_text();
                    self.open.push(element);
                    return Ok(Some(ShapeEvent::Enter { tag }));
                }
                Step::Empty(element) => {
                    self.close_leading_text();
                    self.pending_exit = Some(ShapeEvent::Exit {
                        tag: element.tag.clone(),
                        attributes: element.attributes,
                        text: String::new(),
                    });
                    return Ok(Some(ShapeEvent::Enter { tag: element.tag }));
                }
                Step::End(name) => {
                    return Ok(Some(match self.open.pop() {
                        Some(element) => ShapeEvent::Exit {
                            tag: element.tag,
                            attributes: element.attributes,
                            text: element.text,
                        },
                        None => ShapeEvent::exit(name),
                    }));
                }
                Step::Text(text) => self.push_text(&text),
                Step::Boundary => self.close_leading_text(),
                Step::Doctype(content) => self.load_doctype(&content)?,
                Step::Skip => {}
                Step::Eof => return Ok(None),
            }
        }
    }

    fn byte_offset(&self) -> u64 {
        self.position()
    }
}
