use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendered output tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderNode {
    /// HTML element
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        /// CSS declarations, kebab-case property names
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        styles: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<RenderNode>,
    },

    Text { content: String },

    /// Inline marker for a failed evaluation
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        block_id: String,
        expression: String,
    },
}

impl RenderNode {
    pub fn element(tag: impl Into<String>) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        RenderNode::Text {
            content: content.into(),
        }
    }

    pub fn error(
        message: impl Into<String>,
        block_id: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        RenderNode::Error {
            message: message.into(),
            block_id: block_id.into(),
            expression: expression.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderNode::Element { ref mut styles, .. } = self {
            styles.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_styles(mut self, new_styles: BTreeMap<String, String>) -> Self {
        if let RenderNode::Element { ref mut styles, .. } = self {
            styles.extend(new_styles);
        }
        self
    }

    pub fn with_child(mut self, child: RenderNode) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<RenderNode>) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            RenderNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            RenderNode::Element { attributes, .. } => attributes.get(key).map(String::as_str),
            _ => None,
        }
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        match self {
            RenderNode::Element { styles, .. } => styles.get(key).map(String::as_str),
            _ => None,
        }
    }

    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text content, error markers excluded
    pub fn text_content(&self) -> String {
        match self {
            RenderNode::Text { content } => content.clone(),
            RenderNode::Element { children, .. } => {
                children.iter().map(RenderNode::text_content).collect()
            }
            RenderNode::Error { .. } => String::new(),
        }
    }

    /// Depth-first search for the element rendered for `block_id`
    pub fn find_block(&self, block_id: &str) -> Option<&RenderNode> {
        if self.attr("data-block-id") == Some(block_id) {
            return Some(self);
        }
        self.children()
            .iter()
            .find_map(|child| child.find_block(block_id))
    }
}

/// One failed evaluation, reported alongside the rendered tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDiagnostic {
    pub block_id: String,
    pub expression: String,
    pub message: String,
}
