//! Format-agnostic tagged tree.
//!
//! A `TagNode` is what a markup reader hands to the parser: a named element
//! with string attributes, optional text and ordered children. The tree
//! itself is serde-serializable, so it can be stored as JSON or YAML:
//!
//! ```json
//! {
//!   "name": "StateMachine",
//!   "attributes": {"initial": "idle"},
//!   "children": [
//!     {"name": "states", "children": [{"name": "state", "attributes": {"name": "idle"}}]}
//!   ]
//! }
//! ```

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One element of a tagged tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
    /// Tag name.
    pub name: String,

    /// Attributes, kept sorted so serialized output is stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Inner text of a leaf element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Child elements in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TagNode>,
}

impl TagNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a leaf element holding only text.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: TagNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = TagNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Returns the attribute with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns the first child element with the given name (case insensitive).
    pub fn child(&self, name: &str) -> Option<&TagNode> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Inner text, or the empty string for elements without text.
    pub fn inner_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Looks up a value stored either as an attribute or as a text child.
    ///
    /// Older documents wrote values as child elements, newer ones as
    /// attributes; both spellings carry the same meaning.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.attribute(key)
            .or_else(|| self.child(key).map(TagNode::inner_text))
    }

    /// Visits attributes (as leaf pseudo-elements) followed by child elements.
    pub fn visit_children<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&TagNode) -> Result<(), E>,
    {
        for (key, value) in &self.attributes {
            f(&TagNode::leaf(key.as_str(), value.as_str()))?;
        }
        for child in &self.children {
            f(child)?;
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
