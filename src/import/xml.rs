//! Namespace-aware XML element tree
//!
//! Metadata documents arrive with a default namespace, a prefixed namespace or
//! none at all. Elements are stored with their local name and resolved
//! namespace URI so lookups can match either way. Row data reuses the same
//! [`ElementBuilder`] to materialize one `row` subtree at a time.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

/// Errors raised while building an element tree
#[derive(Debug, thiserror::Error)]
pub enum XmlParseError {
    #[error("XML syntax error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("unexpected end of document: <{0}> is not closed")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Attribute with its resolved namespace
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

/// Element node: local name, resolved namespace, attributes, children and the
/// concatenated direct text content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            ..Default::default()
        }
    }

    /// Trimmed direct text, `None` when empty
    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Whether the element has the given local name and namespace
    pub fn is(&self, name: &str, namespace: Option<&str>) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    /// Value of the first attribute with the given local name, any namespace
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == local_name)
            .map(|a| a.value.as_str())
    }

    /// All descendants in document order, excluding `self`
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

/// Depth-first, document-order iterator over an element's descendants
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// Fully parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse_str(content: &str) -> Result<Self, XmlParseError> {
        let mut reader = NsReader::from_str(content);
        reader.config_mut().trim_text(false);
        Self::parse_reader(reader)
    }

    pub fn parse_file(path: &Path) -> Result<Self, XmlParseError> {
        let file = File::open(path)?;
        let mut reader = NsReader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(false);
        Self::parse_reader(reader)
    }

    fn parse_reader<R: BufRead>(mut reader: NsReader<R>) -> Result<Self, XmlParseError> {
        let mut buf = Vec::new();
        let mut builder = ElementBuilder::default();
        let mut root = None;

        loop {
            let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok(pair) => pair,
                Err(e) => return Err(syntax_error(&reader, e)),
            };
            let namespace = owned_namespace(resolved);

            match event {
                Event::Start(e) => {
                    let element = element_from_start(&reader, namespace, &e)
                        .map_err(|err| syntax_error(&reader, err))?;
                    builder.open(element);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&reader, namespace, &e)
                        .map_err(|err| syntax_error(&reader, err))?;
                    if let Some(done) = builder.leaf(element) {
                        root.get_or_insert(done);
                    }
                }
                Event::End(_) => {
                    if let Some(done) = builder.close() {
                        root.get_or_insert(done);
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|err| syntax_error(&reader, err))?;
                    builder.text(&text);
                }
                Event::CData(e) => builder.text(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = builder.innermost_name() {
            return Err(XmlParseError::Unclosed(open.to_string()));
        }
        root.map(|root| XmlDocument { root })
            .ok_or(XmlParseError::NoRoot)
    }

    /// Namespace of the root element, treated as the document's default
    pub fn default_namespace(&self) -> Option<&str> {
        self.root.namespace.as_deref()
    }
}

/// Incrementally assembles elements from start/text/end events
///
/// `close` and `leaf` hand back an element once it has no open parent.
#[derive(Debug, Default)]
pub struct ElementBuilder {
    stack: Vec<XmlElement>,
}

impl ElementBuilder {
    pub fn open(&mut self, element: XmlElement) {
        self.stack.push(element);
    }

    /// Attach a childless element, returning it when it is top-level
    pub fn leaf(&mut self, element: XmlElement) -> Option<XmlElement> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                None
            }
            None => Some(element),
        }
    }

    pub fn close(&mut self) -> Option<XmlElement> {
        let element = self.stack.pop()?;
        self.leaf(element)
    }

    /// Append direct text to the innermost open element; text outside any
    /// element is dropped
    pub fn text(&mut self, text: &str) {
        if let Some(current) = self.stack.last_mut() {
            current.text.push_str(text);
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn innermost_name(&self) -> Option<&str> {
        self.stack.last().map(|e| e.name.as_str())
    }
}

/// Convert a resolved namespace to an owned URI; unbound and unknown prefixes
/// resolve to no namespace
pub(crate) fn owned_namespace(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

/// Build an element (without children) from a start tag
pub(crate) fn element_from_start<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, quick_xml::Error> {
    let mut element = XmlElement::new(
        String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        namespace,
    );

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let namespace = owned_namespace(resolved);
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push(XmlAttribute {
            name,
            namespace,
            value,
        });
    }

    Ok(element)
}

pub(crate) fn syntax_error<R>(reader: &NsReader<R>, source: quick_xml::Error) -> XmlParseError {
    XmlParseError::Syntax {
        position: reader.buffer_position() as u64,
        source,
    }
}
