//! Shape Tree
//!
//! The inferred structure of a document: one [`ShapeNode`] per distinct
//! (parent, tag) pair, each carrying the attributes and text observed on it.
//! Nodes live in an arena owned by [`ShapeTree`] and refer to each other by
//! [`NodeId`], so parent links never own anything.
//!
//! Observed values are kept in [`SampleSet`]s, which hold at most a fixed
//! number of short distinct strings and latch into a saturated (empty) state
//! as soon as a value would not fit. Memory therefore stays flat no matter how
//! many elements the document has.

use std::collections::HashMap;

/// Tag of the synthetic node every document element hangs from
pub const ROOT_TAG: &str = "#root";

/// Index of a node inside a [`ShapeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bounds applied when collecting sample values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePolicy {
    /// Maximum number of distinct samples before the set saturates
    pub max_samples: usize,
    /// Samples must be strictly shorter than this many characters
    pub max_length: usize,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self {
            max_samples: 10,
            max_length: 20,
        }
    }
}

/// Bounded set of distinct short strings with a one-way saturation latch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    values: Vec<String>,
    saturated: bool,
}

impl SampleSet {
    /// Offer a value to the set.
    ///
    /// Known values are ignored. A new value is kept when it is short enough
    /// and there is room; otherwise the set saturates and forgets everything.
    pub fn observe(&mut self, value: &str, policy: &SamplePolicy) {
        if self.saturated || self.values.iter().any(|v| v == value) {
            return;
        }

        if self.values.len() < policy.max_samples && value.chars().count() < policy.max_length {
            self.values.push(value.to_string());
        } else {
            self.saturated = true;
            self.values = Vec::new();
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// One attribute name seen on a node
#[derive(Debug, Clone)]
pub struct AttributeObservation {
    pub name: String,
    pub owner: NodeId,
    /// Present on every occurrence of the owner folded since it was first seen.
    /// Never goes back to true.
    pub required: bool,
    pub occurrences: u64,
    pub values: SampleSet,
}

/// One distinct tag position in the inferred structure
#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub tag: String,
    pub parent: Option<NodeId>,
    pub occurrences: u64,
    pub texts: SampleSet,
    attributes: Vec<AttributeObservation>,
    attribute_index: HashMap<String, usize>,
    children: Vec<NodeId>,
    child_index: HashMap<String, NodeId>,
}

impl ShapeNode {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            parent,
            occurrences: 0,
            texts: SampleSet::default(),
            attributes: Vec::new(),
            attribute_index: HashMap::new(),
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    /// Attributes in first-seen order
    pub fn attributes(&self) -> &[AttributeObservation] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeObservation> {
        self.attribute_index.get(name).map(|&i| &self.attributes[i])
    }

    /// Children in first-seen order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, tag: &str) -> Option<NodeId> {
        self.child_index.get(tag).copied()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena owning every node of the inferred structure
#[derive(Debug, Clone)]
pub struct ShapeTree {
    nodes: Vec<ShapeNode>,
    attribute_policy: SamplePolicy,
    text_policy: SamplePolicy,
}

impl Default for ShapeTree {
    fn default() -> Self {
        Self::new(SamplePolicy::default(), SamplePolicy::default())
    }
}

impl ShapeTree {
    /// Create a tree holding only the synthetic root, which counts as seen once
    pub fn new(attribute_policy: SamplePolicy, text_policy: SamplePolicy) -> Self {
        let mut root = ShapeNode::new(ROOT_TAG, None);
        root.occurrences = 1;
        Self {
            nodes: vec![root],
            attribute_policy,
            text_policy,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ShapeNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Number of nodes, the synthetic root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// First element below the synthetic root, i.e. the document element
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[0].children.first().copied()
    }

    pub fn attribute_count(&self) -> usize {
        self.nodes.iter().map(|n| n.attributes.len()).sum()
    }

    /// Resolve the child of `current` named `tag`, creating it on first sight,
    /// and count one more occurrence of it.
    pub fn enter_child(&mut self, current: NodeId, tag: &str) -> NodeId {
        let child = match self.nodes[current.0].child_index.get(tag) {
            Some(&id) => id,
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(ShapeNode::new(tag, Some(current)));
                let parent = &mut self.nodes[current.0];
                parent.child_index.insert(tag.to_string(), id);
                parent.children.push(id);
                id
            }
        };
        self.nodes[child.0].occurrences += 1;
        child
    }

    /// Fold the attributes of one closed occurrence of `node`.
    pub fn fold_attributes<K, V>(&mut self, node: NodeId, observed: &[(K, V)])
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let policy = self.attribute_policy;
        let shape = &mut self.nodes[node.0];

        for (name, value) in observed {
            let name = name.as_ref();
            let index = match shape.attribute_index.get(name) {
                Some(&i) => i,
                None => {
                    shape.attributes.push(AttributeObservation {
                        name: name.to_string(),
                        owner: node,
                        required: true,
                        occurrences: 0,
                        values: SampleSet::default(),
                    });
                    let i = shape.attributes.len() - 1;
                    shape.attribute_index.insert(name.to_string(), i);
                    i
                }
            };
            let attribute = &mut shape.attributes[index];
            attribute.occurrences += 1;
            attribute.values.observe(value.as_ref(), &policy);
        }

        for attribute in shape.attributes.iter_mut() {
            if !observed.iter().any(|(name, _)| name.as_ref() == attribute.name) {
                attribute.required = false;
            }
        }
    }

    /// Fold the text of one closed occurrence of `node`. Blank text is ignored.
    pub fn fold_text(&mut self, node: NodeId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let policy = self.text_policy;
        self.nodes[node.0].texts.observe(text, &policy);
    }

    /// Depth of `id` below the synthetic root
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }
}
