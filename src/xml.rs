//! Hardened XML document model.
//!
//! Documents are parsed with quick-xml's namespace-aware reader into a small
//! owned tree that can be searched by local-name paths, edited in place and
//! written back out. quick-xml never loads DTDs and only decodes the predefined
//! entities and character references; on top of that the parser rejects DOCTYPE
//! and ENTITY declarations outright and refuses any other entity reference.

use crate::config::XxePreventionConfig;
use crate::error::XmlError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Writer;

/// XML declaration of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An element with its qualified name, resolved namespace and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Qualified name as written, including any prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Resolved namespace URI, if the element is in a namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    /// Concatenated text and CDATA content of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.children = vec![Node::Text(value.into())];
    }

    pub fn push_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Find an element reached by `path` of local names, starting anywhere in
    /// this subtree. `["status", "codeValue"]` matches a `codeValue` child of
    /// the first `status` element that has one, whatever the prefixes.
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        let trail = self.locate(path)?;
        let mut current = self;
        for index in trail {
            current = match current.children.get(index) {
                Some(Node::Element(el)) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable variant of [`Element::find_path`].
    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let trail = self.locate(path)?;
        let mut current = self;
        for index in trail {
            current = match current.children.get_mut(index) {
                Some(Node::Element(el)) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Child indices leading from `self` to the element at `path`.
    fn locate(&self, path: &[&str]) -> Option<Vec<usize>> {
        if path.is_empty() {
            return None;
        }
        let mut trail = Vec::new();
        if self.search(path, &mut trail) {
            Some(trail)
        } else {
            None
        }
    }

    fn search(&self, path: &[&str], trail: &mut Vec<usize>) -> bool {
        if self.follow(path, trail) {
            return true;
        }
        for (index, node) in self.children.iter().enumerate() {
            if let Node::Element(child) = node {
                trail.push(index);
                if child.search(path, trail) {
                    return true;
                }
                trail.pop();
            }
        }
        false
    }

    fn follow(&self, path: &[&str], trail: &mut Vec<usize>) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return true;
        };
        if self.local_name() != *first {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        for (index, node) in self.children.iter().enumerate() {
            if let Node::Element(child) = node {
                trail.push(index);
                if child.follow(rest, trail) {
                    return true;
                }
                trail.pop();
            }
        }
        false
    }
}

/// A parsed XML document exclusively owned by its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    declaration: Option<Declaration>,
    root: Element,
}

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    /// See [`Element::find_path`].
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        self.root.find_path(path)
    }

    /// See [`Element::find_path_mut`].
    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        self.root.find_path_mut(path)
    }

    /// Serialize the document to UTF-8 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(|e| XmlError::Serialize(e.to_string()))?;
            writer
                .write_event(Event::Text(BytesText::new("\n")))
                .map_err(|e| XmlError::Serialize(e.to_string()))?;
        }

        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmlError::Serialize(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmlError::Serialize(e.to_string()))?;

    for node in &element.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
            Node::CData(text) => writer
                .write_event(Event::CData(BytesCData::new(text.as_str())))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
            Node::Comment(text) => writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| XmlError::Serialize(e.to_string()))
}

/// XML parser with entity protections that cannot be switched off.
#[derive(Debug, Clone)]
pub struct SecureParser {
    block_processing_instructions: bool,
}

impl SecureParser {
    /// Build a parser from XXE prevention settings.
    ///
    /// Fails when any mandatory protection is disabled.
    pub fn new(config: &XxePreventionConfig) -> Result<Self, XmlError> {
        if !config.enabled {
            return Err(XmlError::InsecureParser("xxe_prevention.enabled"));
        }
        if !config.block_doctype {
            return Err(XmlError::InsecureParser("xxe_prevention.block_doctype"));
        }
        if !config.block_external_entities {
            return Err(XmlError::InsecureParser("xxe_prevention.block_external_entities"));
        }
        if !config.block_entity_expansion {
            return Err(XmlError::InsecureParser("xxe_prevention.block_entity_expansion"));
        }

        Ok(Self {
            block_processing_instructions: config.block_processing_instructions,
        })
    }

    /// Parse raw bytes into a document.
    pub fn parse(&self, data: &[u8]) -> Result<Document, XmlError> {
        let xml = std::str::from_utf8(data)
            .map_err(|e| XmlError::Parse(format!("Invalid UTF-8: {}", e)))?;
        self.parse_str(xml)
    }

    /// Parse a string into a document.
    pub fn parse_str(&self, xml: &str) -> Result<Document, XmlError> {
        check_xxe_patterns(xml)?;

        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut declaration = None;
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| XmlError::Parse(e.to_string()))?;

            match event {
                Event::Start(ref e) => {
                    let element = start_element(e, resolved)?;
                    if root.is_some() && stack.is_empty() {
                        return Err(XmlError::Parse("Multiple root elements".to_string()));
                    }
                    stack.push(element);
                }

                Event::Empty(ref e) => {
                    let element = start_element(e, resolved)?;
                    attach(&mut stack, &mut root, element)?;
                }

                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Parse("Unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }

                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| XmlError::EntityReference(err.to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(XmlError::Parse(
                                "Text content outside the root element".to_string(),
                            ))
                        }
                    }
                }

                Event::CData(ref e) => {
                    let text = std::str::from_utf8(e)
                        .map_err(|err| XmlError::Parse(format!("Invalid UTF-8 in CDATA: {}", err)))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_child(Node::CData(text.to_string()));
                    }
                }

                Event::Comment(ref e) => {
                    let text = std::str::from_utf8(e)
                        .map_err(|err| XmlError::Parse(format!("Invalid UTF-8 in comment: {}", err)))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_child(Node::Comment(text.to_string()));
                    }
                }

                Event::Decl(ref e) => {
                    declaration = Some(read_declaration(e)?);
                }

                Event::DocType(_) => return Err(XmlError::DoctypeDetected),

                Event::PI(_) => {
                    if self.block_processing_instructions {
                        return Err(XmlError::ProcessingInstructionDetected);
                    }
                }

                Event::Eof => break,

                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Parse(format!("Unclosed element <{}>", open.name())));
        }

        let root = root.ok_or(XmlError::MissingRoot)?;
        Ok(Document { declaration, root })
    }
}

fn start_element(e: &BytesStart, resolved: ResolveResult) -> Result<Element, XmlError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| XmlError::Parse(format!("Invalid element name: {}", err)))?
        .to_string();

    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(XmlError::UnboundPrefix(
                String::from_utf8_lossy(&prefix).into_owned(),
            ))
        }
    };

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError::Parse(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| XmlError::Parse(format!("Invalid attribute name: {}", err)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::EntityReference(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Parse("Multiple root elements".to_string())),
    }
}

fn read_declaration(e: &BytesDecl) -> Result<Declaration, XmlError> {
    let version = e.version().map_err(|err| XmlError::Parse(err.to_string()))?;
    let encoding = e
        .encoding()
        .transpose()
        .map_err(|err| XmlError::Parse(err.to_string()))?;
    let standalone = e
        .standalone()
        .transpose()
        .map_err(|err| XmlError::Parse(err.to_string()))?;

    Ok(Declaration {
        version: String::from_utf8_lossy(&version).into_owned(),
        encoding: encoding.map(|v| String::from_utf8_lossy(&v).into_owned()),
        standalone: standalone.map(|v| String::from_utf8_lossy(&v).into_owned()),
    })
}

/// Check for XXE attack patterns before handing input to the reader.
fn check_xxe_patterns(xml: &str) -> Result<(), XmlError> {
    let upper = xml.to_ascii_uppercase();

    if upper.contains("<!DOCTYPE") {
        return Err(XmlError::DoctypeDetected);
    }

    if upper.contains("<!ENTITY") {
        return Err(XmlError::ExternalEntityDetected);
    }

    Ok(())
}

/// Strip the namespace prefix from a qualified name.
pub fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}
