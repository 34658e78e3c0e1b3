// crates/cmdtlm-rs-xtce/src/parser.rs

//! Reads an XTCE document into a lightweight element tree.
//!
//! The importer needs lookahead (a `BaseContainer` is resolved as soon as
//! its `SequenceContainer` opens) and repeated sub-walks, so the event
//! stream from `quick_xml::Reader` is collected into [`Element`]s first.
//! Names are stored without their namespace prefix; `xtce:SpaceSystem` and
//! `SpaceSystem` are the same element.

use crate::error::XtceError;
use quick_xml::Error as XmlError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

/// One XML element with its attributes, children and text content.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated, trimmed text content of this element only.
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Element::attr`] but fails when the attribute is absent.
    pub fn required_attr(&self, name: &'static str) -> Result<&str, XtceError> {
        self.attr(name)
            .ok_or_else(|| XtceError::missing_attribute(&self.name, name))
    }

    /// Depth-first search (self included) for the first element named `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Every descendant (self included) named `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.find_all(name, found);
        }
    }

    /// Text of the first `FixedValue` below this element.
    pub fn fixed_value(&self) -> Option<&str> {
        self.find("FixedValue").map(|e| e.text.as_str())
    }
}

/// Parses `xml` and returns its root element.
pub(crate) fn parse_document(xml: &str) -> Result<Element, XtceError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                // quick-xml already checks that end names match
                if let Some(mut element) = stack.pop() {
                    element.text = element.text.trim().to_string();
                    close_element(element, &mut stack, &mut root);
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = core::str::from_utf8(&t)?;
                    top.text.push_str(&unescape(text)?);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(core::str::from_utf8(&t)?);
                }
            }
            Event::GeneralRef(r) => {
                if let Some(top) = stack.last_mut() {
                    let name = core::str::from_utf8(&r)?;
                    top.text.push_str(&unescape(&format!("&{};", name))?);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XtceError::UnclosedElement(open.name));
    }
    root.ok_or(XtceError::EmptyDocument)
}

fn start_element(e: &BytesStart<'_>) -> Result<Element, XtceError> {
    let name = core::str::from_utf8(e.local_name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(XmlError::from)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let key = core::str::from_utf8(attr.key.local_name().as_ref())?.to_string();
        let raw = core::str::from_utf8(&attr.value)?;
        attributes.push((key, unescape(raw)?.into_owned()));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_stripped() {
        let root = parse_document(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xtce:SpaceSystem xmlns:xtce="http://www.omg.org/space/xtce" name="inst">
  <xtce:TelemetryMetaData>
    <xtce:ParameterSet/>
  </xtce:TelemetryMetaData>
</xtce:SpaceSystem>"#,
        )
        .unwrap();
        assert_eq!(root.name, "SpaceSystem");
        assert_eq!(root.attributes, vec![("name".to_string(), "inst".to_string())]);
        assert_eq!(root.children[0].name, "TelemetryMetaData");
        assert_eq!(root.children[0].children[0].name, "ParameterSet");
    }

    #[test]
    fn test_text_and_entities() {
        let root = parse_document(
            "<Unit description=\"Volts &amp; more\"> V &lt;dc&gt; </Unit>",
        )
        .unwrap();
        assert_eq!(root.attr("description"), Some("Volts & more"));
        assert_eq!(root.text, "V <dc>");
    }

    #[test]
    fn test_find_fixed_value() {
        let root = parse_document(
            "<SizeInBits><Fixed><FixedValue>64</FixedValue></Fixed></SizeInBits>",
        )
        .unwrap();
        assert_eq!(root.fixed_value(), Some("64"));
        let mut all = Vec::new();
        root.find_all("Fixed", &mut all);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_document("<A><B></A>"),
            Err(XtceError::XmlReading(_))
        ));
        assert!(matches!(parse_document(""), Err(XtceError::EmptyDocument)));
        assert!(matches!(
            parse_document("<A><B>"),
            Err(XtceError::UnclosedElement(_)) | Err(XtceError::XmlReading(_))
        ));
    }
}
