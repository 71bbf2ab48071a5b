//! A small XPath 1.0 subset, enough to pull one string out of a page.
//!
//! Supported: `/` and `//` separators, `.`, `*`, element names, a trailing `@attr` or
//! `text()` step, and the predicates `[n]`, `[@attr]`, `[@attr='v']`, `[text()='v']`,
//! `[contains(arg, 'v')]` and `[starts-with(arg, 'v')]` where `arg` is `@attr`, `text()`
//! or `.`.

use std::fmt;

use thiserror::Error;

use super::document::{Document, NodeId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid xpath {expr:?} at offset {offset}: {reason}")]
pub struct XPathError {
    pub expr: String,
    pub offset: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    DescendantOrSelfChild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Attribute(String),
    Text,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Exists(Arg),
    Equals(Arg, String),
    Contains(Arg, String),
    StartsWith(Arg, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Element {
        name: Option<String>,
        predicates: Vec<Predicate>,
    },
    Attribute(String),
    Text,
}

/// A compiled path expression.
#[derive(Clone, PartialEq, Eq)]
pub struct XPath {
    expr: String,
    steps: Vec<(Axis, Step)>,
}

impl fmt::Debug for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XPath({:?})", self.expr)
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathItem {
    Node(NodeId),
    String(String),
}

struct Parser<'a> {
    expr: &'a str,
    offset: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.expr[self.offset..]
    }

    fn error(&self, reason: &'static str) -> XPathError {
        XPathError {
            expr: self.expr.to_string(),
            offset: self.offset,
            reason,
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.offset = self.expr.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.offset += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str, reason: &'static str) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn name(&mut self) -> Result<String, XPathError> {
        self.skip_whitespace();
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        let name = self.rest()[..len].to_string();
        self.offset += len;
        Ok(name)
    }

    fn literal(&mut self) -> Result<String, XPathError> {
        self.skip_whitespace();
        let quote = match self.rest().chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a string literal")),
        };
        self.offset += 1;
        let Some(end) = self.rest().find(quote) else {
            return Err(self.error("unterminated string literal"));
        };
        let literal = self.rest()[..end].to_string();
        self.offset += end + 1;
        Ok(literal)
    }

    fn arg(&mut self) -> Result<Arg, XPathError> {
        if self.eat("@") {
            Ok(Arg::Attribute(self.name()?))
        } else if self.eat("text()") {
            Ok(Arg::Text)
        } else if self.eat(".") {
            Ok(Arg::Context)
        } else {
            Err(self.error("expected @attr, text() or ."))
        }
    }

    fn predicate(&mut self) -> Result<Predicate, XPathError> {
        self.skip_whitespace();
        let digits = self
            .rest()
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest().len());
        let predicate = if digits > 0 {
            let position = self.rest()[..digits]
                .parse::<usize>()
                .map_err(|_| self.error("invalid position"))?;
            if position == 0 {
                return Err(self.error("positions start at 1"));
            }
            self.offset += digits;
            Predicate::Position(position)
        } else if self.eat("contains(") {
            let arg = self.arg()?;
            self.expect(",", "expected ','")?;
            let literal = self.literal()?;
            self.expect(")", "expected ')'")?;
            Predicate::Contains(arg, literal)
        } else if self.eat("starts-with(") {
            let arg = self.arg()?;
            self.expect(",", "expected ','")?;
            let literal = self.literal()?;
            self.expect(")", "expected ')'")?;
            Predicate::StartsWith(arg, literal)
        } else {
            let arg = self.arg()?;
            if self.eat("=") {
                Predicate::Equals(arg, self.literal()?)
            } else {
                Predicate::Exists(arg)
            }
        };
        self.expect("]", "expected ']'")?;
        Ok(predicate)
    }

    fn step(&mut self) -> Result<Option<Step>, XPathError> {
        if self.eat("@") {
            return Ok(Some(Step::Attribute(self.name()?)));
        }
        if self.eat("text()") {
            return Ok(Some(Step::Text));
        }
        // `.` between separators selects the context node again
        if self.eat(".") {
            return Ok(None);
        }

        let name = if self.eat("*") {
            None
        } else {
            Some(self.name()?)
        };
        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
        }
        Ok(Some(Step::Element { name, predicates }))
    }

    fn parse(mut self) -> Result<Vec<(Axis, Step)>, XPathError> {
        let mut steps = Vec::new();

        let mut axis = if self.eat(".//") || self.eat("//") {
            Axis::DescendantOrSelfChild
        } else {
            // `./x`, `/x` and `x` are the same from the document root
            let _ = self.eat("./") || self.eat("/");
            Axis::Child
        };

        loop {
            let terminal = matches!(steps.last(), Some((_, Step::Attribute(_) | Step::Text)));
            if terminal {
                return Err(self.error("@attr and text() must be the last step"));
            }

            if let Some(step) = self.step()? {
                steps.push((axis, step));
            }

            self.skip_whitespace();
            if self.rest().is_empty() {
                break;
            }
            axis = if self.eat("//") {
                Axis::DescendantOrSelfChild
            } else if self.eat("/") {
                Axis::Child
            } else {
                return Err(self.error("expected '/' or '//'"));
            };
        }

        if steps.is_empty() {
            return Err(self.error("empty path"));
        }
        Ok(steps)
    }
}

impl XPath {
    pub fn parse(expr: &str) -> Result<Self, XPathError> {
        let steps = Parser { expr, offset: 0 }.parse()?;
        Ok(Self {
            expr: expr.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Evaluates the path from the document root, returning items in document order.
    pub fn evaluate(&self, document: &Document) -> Vec<XPathItem> {
        let mut context = vec![Document::ROOT];

        for (axis, step) in &self.steps {
            let origins: Vec<NodeId> = match axis {
                Axis::Child => context.clone(),
                Axis::DescendantOrSelfChild => {
                    let mut all: Vec<NodeId> = context
                        .iter()
                        .flat_map(|c| document.descendants_or_self(*c))
                        .collect();
                    all.sort_unstable();
                    all.dedup();
                    all
                }
            };

            match step {
                Step::Element { name, predicates } => {
                    let mut next = Vec::new();
                    for origin in origins {
                        let mut candidates: Vec<NodeId> = document
                            .children(origin)
                            .iter()
                            .copied()
                            .filter(|child| match (name, document.element_name(*child)) {
                                (_, None) => false,
                                (None, Some(_)) => true,
                                (Some(expected), Some(actual)) => expected == actual,
                            })
                            .collect();
                        for predicate in predicates {
                            candidates = apply_predicate(document, candidates, predicate);
                        }
                        next.extend(candidates);
                    }
                    next.sort_unstable();
                    next.dedup();
                    context = next;
                }
                // Parsing guarantees these are the last step
                Step::Attribute(attribute) => {
                    return origins
                        .iter()
                        .filter_map(|node| document.attribute(*node, attribute))
                        .map(|value| XPathItem::String(value.to_string()))
                        .collect();
                }
                Step::Text => {
                    return origins
                        .iter()
                        .flat_map(|node| document.text_children(*node))
                        .map(|text| XPathItem::String(text.to_string()))
                        .collect();
                }
            }
        }

        context.into_iter().map(XPathItem::Node).collect()
    }

    /// The string value of the first selected item, or `None` when nothing (or only an
    /// empty string) is selected.
    pub fn evaluate_string(&self, document: &Document) -> Option<String> {
        let first = self.evaluate(document).into_iter().next()?;
        let value = match first {
            XPathItem::Node(node) => document.string_value(node),
            XPathItem::String(s) => s,
        };
        (!value.is_empty()).then_some(value)
    }
}

fn arg_value(document: &Document, node: NodeId, arg: &Arg) -> Option<String> {
    match arg {
        Arg::Attribute(name) => document.attribute(node, name).map(str::to_string),
        Arg::Text => document
            .text_children(node)
            .first()
            .map(|text| text.to_string()),
        Arg::Context => Some(document.string_value(node)),
    }
}

fn apply_predicate(document: &Document, nodes: Vec<NodeId>, predicate: &Predicate) -> Vec<NodeId> {
    match predicate {
        Predicate::Position(position) => nodes.get(position - 1).copied().into_iter().collect(),
        Predicate::Exists(arg) => nodes
            .into_iter()
            .filter(|n| arg_value(document, *n, arg).is_some())
            .collect(),
        Predicate::Equals(arg, expected) => nodes
            .into_iter()
            .filter(|n| arg_value(document, *n, arg).as_deref() == Some(expected.as_str()))
            .collect(),
        Predicate::Contains(arg, needle) => nodes
            .into_iter()
            .filter(|n| arg_value(document, *n, arg).is_some_and(|v| v.contains(needle.as_str())))
            .collect(),
        Predicate::StartsWith(arg, prefix) => nodes
            .into_iter()
            .filter(|n| {
                arg_value(document, *n, arg).is_some_and(|v| v.starts_with(prefix.as_str()))
            })
            .collect(),
    }
}
