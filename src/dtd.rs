//! DTD entity support for the event source
//!
//! Large data dumps (DBLP being the usual suspect) declare their character
//! entities in an external DTD. The reader never fetches the declared location:
//! an [`EntityResolver`] decides which local file stands in for it, and the
//! general entity declarations found there feed an [`EntityTable`] used when
//! unescaping text and attribute values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Result, ShapeError};

static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("entity declaration pattern is valid")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("quoted literal pattern is valid"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

/// Maps a declared external subset to a local file to read instead
pub trait EntityResolver {
    fn resolve(&self, system_id: &str, public_id: Option<&str>) -> Option<PathBuf>;
}

/// Resolver that answers every lookup with the same local DTD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDtdResolver {
    path: PathBuf,
}

impl FixedDtdResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntityResolver for FixedDtdResolver {
    fn resolve(&self, system_id: &str, _public_id: Option<&str>) -> Option<PathBuf> {
        debug!(
            "Substituting {} for external subset {}",
            self.path.display(),
            system_id
        );
        Some(self.path.clone())
    }
}

/// The parts of a `<!DOCTYPE ...>` declaration the reader cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeDecl {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
}

impl DoctypeDecl {
    /// Parse the content between `<!DOCTYPE` and the closing `>`
    pub fn parse(content: &str) -> Self {
        let content = content.trim();
        let (head, internal_subset) = match (content.find('['), content.rfind(']')) {
            (Some(open), Some(close)) if open < close => {
                (&content[..open], Some(content[open + 1..close].to_string()))
            }
            _ => (content, None),
        };

        let mut words = head.split_whitespace();
        let name = words.next().unwrap_or_default().to_string();
        let keyword = words.next().unwrap_or_default();

        let literals: Vec<String> = QUOTED
            .captures_iter(head)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
            .collect();

        let (public_id, system_id) = match keyword {
            "SYSTEM" => (None, literals.first().cloned()),
            "PUBLIC" => (literals.first().cloned(), literals.get(1).cloned()),
            _ => (None, None),
        };

        Self {
            name,
            public_id,
            system_id,
            internal_subset,
        }
    }
}

/// General entities available while unescaping
#[derive(Debug, Clone)]
pub struct EntityTable {
    entities: HashMap<String, String>,
}

impl Default for EntityTable {
    fn default() -> Self {
        let entities = [
            ("lt", "<"),
            ("gt", ">"),
            ("amp", "&"),
            ("apos", "'"),
            ("quot", "\""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { entities }
    }
}

impl EntityTable {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Declare an entity. The first declaration of a name is binding.
    pub fn declare(&mut self, name: &str, value: &str) -> bool {
        if self.entities.contains_key(name) {
            return false;
        }
        // Replacement text may itself hold character or entity references
        let expanded = quick_xml::escape::unescape_with(value, |entity| self.get(entity))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        self.entities.insert(name.to_string(), expanded);
        true
    }

    /// Collect every general entity declaration in a DTD fragment, returning how many were new
    pub fn declare_from_dtd(&mut self, dtd: &str) -> usize {
        let dtd = COMMENT.replace_all(dtd, "");
        let mut declared = 0;
        for caps in ENTITY_DECL.captures_iter(&dtd) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if self.declare(&caps[1], value) {
                declared += 1;
            }
        }
        declared
    }

    /// Read a DTD file and declare its entities
    pub fn load_dtd_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|e| ShapeError::Dtd {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        let declared = self.declare_from_dtd(&content);
        debug!("Loaded {} entities from {}", declared, path.display());
        Ok(declared)
    }
}
