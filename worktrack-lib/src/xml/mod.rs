//! Owned XML element tree.
//!
//! The server answers with XML on every endpoint except attachments and the
//! structured-find query, including many error statuses. This module keeps
//! just enough of a tree to carry asset documents around; it is not a
//! general-purpose XML library.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;

use crate::error::Error;

/// A single XML element with attributes, text content, and children.
///
/// Attribute order and child order are preserved as parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content directly inside this element.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Sets the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Looks up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All direct children with the given tag.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Parses a document from text into its root element.
    pub fn parse(input: &str) -> Result<Element, Error> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::xml(e.to_string(), input))?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start, input)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start, input)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| Error::xml(e.to_string(), input))?;
                        top.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(_) => {
                    // Mismatched end tags are rejected by the reader itself.
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::xml("unbalanced end tag", input))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Eof => return Err(Error::xml("no root element", input)),
                _ => {}
            }
        }
    }

    /// Serializes this element as a UTF-8 document with an XML declaration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| Error::Xml {
                message: e.to_string(),
                body: None,
            })?;
        self.write_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), Error> {
        let write_err = |e: std::io::Error| Error::Xml {
            message: e.to_string(),
            body: None,
        };

        let mut start = BytesStart::new(self.tag.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(write_err)?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(write_err)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(write_err)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(write_err)?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>, input: &str) -> Result<Element, Error> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::xml(e.to_string(), input))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::xml(e.to_string(), input))?
            .into_owned();
        element.attributes.push((name, value));
    }
    Ok(element)
}

/// Shape of a response document, decided once when the document is stored.
///
/// The data endpoint returns a bare `Asset` element for instance fetches and
/// a container with nested `Asset` children for collection queries. Deciding
/// the shape here keeps tag inspection out of the iteration paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// A single `Asset` element.
    SingleAsset(Element),
    /// The `Asset` children of a container element.
    Collection(Vec<Element>),
}

impl DocumentKind {
    /// Classifies a parsed document by its root tag.
    pub fn classify(document: Element) -> Self {
        if document.tag == "Asset" {
            Self::SingleAsset(document)
        } else {
            Self::Collection(
                document
                    .children
                    .into_iter()
                    .filter(|child| child.tag == "Asset")
                    .collect(),
            )
        }
    }

    /// The contained asset elements, one for a single-asset document.
    pub fn assets(&self) -> &[Element] {
        match self {
            Self::SingleAsset(element) => std::slice::from_ref(element),
            Self::Collection(elements) => elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"<Assets total="2">
        <Asset href="/inst/rest-1.v1/Data/Story/101" id="Story:101">
            <Attribute name="Name">Add login</Attribute>
        </Asset>
        <Asset href="/inst/rest-1.v1/Data/Story/102" id="Story:102">
            <Attribute name="Name">Fix logout</Attribute>
        </Asset>
    </Assets>"#;

    #[test]
    fn test_parse_collection() {
        let root = Element::parse(COLLECTION).unwrap();
        assert_eq!(root.tag, "Assets");
        assert_eq!(root.attr("total"), Some("2"));
        assert_eq!(root.children.len(), 2);
        let first = &root.children[0];
        assert_eq!(first.attr("id"), Some("Story:101"));
        assert_eq!(first.find("Attribute").unwrap().text, "Add login");
    }

    #[test]
    fn test_parse_escapes_and_empty_elements() {
        let root =
            Element::parse(r#"<Asset id="Story:7"><Attribute name="Name">a &amp; b</Attribute><Relation name="Scope"/></Asset>"#)
                .unwrap();
        assert_eq!(root.find("Attribute").unwrap().text, "a & b");
        assert!(root.find("Relation").unwrap().children.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Element::parse("not xml at all"),
            Err(Error::Xml { .. })
        ));
        assert!(matches!(Element::parse(""), Err(Error::Xml { .. })));
    }

    #[test]
    fn test_serialize_update_document() {
        let doc = Element::new("Asset").with_child(
            Element::new("Attribute")
                .with_attr("name", "Name")
                .with_attr("act", "set")
                .with_text("O'Brien & Co"),
        );
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains(r#"<Attribute name="Name" act="set">"#));
        assert!(text.contains("&amp; Co"));

        let reparsed = Element::parse(&text).unwrap();
        assert_eq!(reparsed.find("Attribute").unwrap().text, "O'Brien & Co");
    }

    #[test]
    fn test_classify_shapes() {
        let single = Element::parse(r#"<Asset id="Story:101"/>"#).unwrap();
        assert!(matches!(
            DocumentKind::classify(single),
            DocumentKind::SingleAsset(_)
        ));

        let collection = Element::parse(COLLECTION).unwrap();
        let kind = DocumentKind::classify(collection);
        assert_eq!(kind.assets().len(), 2);
    }

    #[test]
    fn test_classify_skips_non_asset_children() {
        let root = Element::parse(r#"<Assets><Error/><Asset id="Story:1"/></Assets>"#).unwrap();
        let kind = DocumentKind::classify(root);
        assert_eq!(kind.assets().len(), 1);
    }
}
