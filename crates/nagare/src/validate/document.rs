//! An owned markup tree shared by the HTML and XML parsers.
//!
//! Nodes are stored in pre-order, so comparing node ids compares document order.

use scraper::{node::Node as HtmlNode, Html};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub const ROOT: NodeId = 0;

    fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Parses an HTML document. HTML parsing never fails, malformed markup is repaired.
    pub fn parse_html(text: &str) -> Self {
        let html = Html::parse_document(text);
        let mut document = Self::new();

        // Ids are assigned when a node is popped, children are pushed in reverse.
        let mut stack: Vec<_> = html
            .tree
            .root()
            .children()
            .map(|child| (Self::ROOT, child))
            .collect();
        stack.reverse();

        while let Some((parent, node)) = stack.pop() {
            match node.value() {
                HtmlNode::Element(element) => {
                    let id = document.push(
                        parent,
                        NodeKind::Element {
                            name: element.name().to_string(),
                            attributes: element
                                .attrs()
                                .map(|(k, v)| (k.to_string(), v.to_string()))
                                .collect(),
                        },
                    );
                    let mut children: Vec<_> = node.children().map(|child| (id, child)).collect();
                    children.reverse();
                    stack.extend(children);
                }
                HtmlNode::Text(text) => {
                    let text: &str = text;
                    document.push(parent, NodeKind::Text(text.to_string()));
                }
                _ => {}
            }
        }

        document
    }

    pub fn parse_xml(text: &str) -> Result<Self, roxmltree::Error> {
        let xml = roxmltree::Document::parse(text)?;
        let mut document = Self::new();

        fn walk(document: &mut Document, parent: NodeId, node: roxmltree::Node<'_, '_>) {
            for child in node.children() {
                if child.is_element() {
                    let id = document.push(
                        parent,
                        NodeKind::Element {
                            name: child.tag_name().name().to_string(),
                            attributes: child
                                .attributes()
                                .map(|a| (a.name().to_string(), a.value().to_string()))
                                .collect(),
                        },
                    );
                    walk(document, id, child);
                } else if child.is_text() {
                    if let Some(text) = child.text() {
                        document.push(parent, NodeKind::Text(text.to_string()));
                    }
                }
            }
        }

        walk(&mut document, Self::ROOT, xml.root());
        Ok(document)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// The node itself followed by all of its descendants in document order.
    pub fn descendants_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.nodes[current].children.iter().rev());
        }
        result
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Direct text children, in order.
    pub fn text_children(&self, id: NodeId) -> Vec<&str> {
        self.nodes[id]
            .children
            .iter()
            .filter_map(|child| match &self.nodes[*child].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenation of every descendant text node.
    pub fn string_value(&self, id: NodeId) -> String {
        self.descendants_or_self(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_tree() {
        let doc = Document::parse_html(
            r#"<html><body><iframe src="/embed/1"></iframe><p>hello <b>world</b></p></body></html>"#,
        );
        let iframe = doc
            .descendants_or_self(Document::ROOT)
            .into_iter()
            .find(|n| doc.element_name(*n) == Some("iframe"))
            .unwrap();
        assert_eq!(doc.attribute(iframe, "src"), Some("/embed/1"));

        let p = doc
            .descendants_or_self(Document::ROOT)
            .into_iter()
            .find(|n| doc.element_name(*n) == Some("p"))
            .unwrap();
        assert_eq!(doc.string_value(p), "hello world");
        assert_eq!(doc.text_children(p), vec!["hello "]);
    }

    #[test]
    fn test_xml_tree() {
        let doc = Document::parse_xml(r#"<root><a id="1">x</a><a id="2"/></root>"#).unwrap();
        let ids: Vec<_> = doc
            .descendants_or_self(Document::ROOT)
            .into_iter()
            .filter_map(|n| doc.attribute(n, "id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        assert!(Document::parse_xml("<root>").is_err());
    }
}
