use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Start,
    End,
}

/// Forward-only view of the element structure of a document.
///
/// Text, comments and declarations are invisible. A self-closing element is
/// reported as a start immediately followed by its end.
pub trait TagCursor {
    /// Moves to the next start or end tag. `None` once the stream is exhausted.
    fn next_tag(&mut self) -> Result<Option<TagKind>>;

    /// What the cursor currently sits on, `None` before the first tag and after the last.
    fn current(&self) -> Option<TagKind>;

    /// Local name of the current tag.
    fn name(&self) -> &[u8];

    /// Attribute of the current start tag.
    fn attribute(&self, key: &[u8]) -> Option<&str>;

    fn at_start(&self, name: &[u8]) -> bool {
        self.current() == Some(TagKind::Start) && self.name() == name
    }

    /// Skips the element the cursor starts on, children included, leaving
    /// the cursor on its end tag.
    fn skip_element(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_tag()? {
                Some(TagKind::Start) => depth += 1,
                Some(TagKind::End) if depth == 0 => return Ok(()),
                Some(TagKind::End) => depth -= 1,
                None => {
                    return Err(Error::Structural(
                        "stream ended inside an element".to_string(),
                    ))
                },
            }
        }
    }
}

/// [`TagCursor`] over an XML byte stream.
pub struct XmlTagCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    current: Option<TagKind>,
    name: Vec<u8>,
    attributes: Vec<(Vec<u8>, String)>,
}

impl<R: BufRead> XmlTagCursor<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        reader.expand_empty_elements(true);
        XmlTagCursor {
            reader,
            buf: Vec::new(),
            current: None,
            name: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

impl<'a> XmlTagCursor<&'a [u8]> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<R: BufRead> TagCursor for XmlTagCursor<R> {
    fn next_tag(&mut self) -> Result<Option<TagKind>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(start) => {
                    self.name.clear();
                    self.name.extend_from_slice(start.local_name().as_ref());
                    self.attributes.clear();
                    for attribute in start.attributes() {
                        let attribute = attribute?;
                        let value = attribute.unescape_value()?.into_owned();
                        self.attributes.push((attribute.key.local_name().as_ref().to_vec(), value));
                    }
                    self.current = Some(TagKind::Start);
                    break;
                },
                Event::End(end) => {
                    self.name.clear();
                    self.name.extend_from_slice(end.local_name().as_ref());
                    self.attributes.clear();
                    self.current = Some(TagKind::End);
                    break;
                },
                Event::Eof => {
                    self.name.clear();
                    self.attributes.clear();
                    self.current = None;
                    break;
                },
                // Text, comments, declarations and the like carry nothing we read.
                _ => (),
            }
        }
        Ok(self.current)
    }

    fn current(&self) -> Option<TagKind> {
        self.current
    }

    fn name(&self) -> &[u8] {
        &self.name
    }

    fn attribute(&self, key: &[u8]) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<(TagKind, String)> {
        let mut cursor = XmlTagCursor::from_bytes(xml.as_bytes());
        let mut tags = Vec::new();
        while let Some(kind) = cursor.next_tag().unwrap() {
            tags.push((kind, String::from_utf8(cursor.name().to_vec()).unwrap()));
        }
        tags
    }

    #[test]
    fn empty_elements_are_expanded() {
        let tags = collect(r#"<?xml version="1.0"?><osm><!-- hi --><nd ref="1"/>text</osm>"#);
        assert_eq!(
            tags,
            vec![
                (TagKind::Start, "osm".to_string()),
                (TagKind::Start, "nd".to_string()),
                (TagKind::End, "nd".to_string()),
                (TagKind::End, "osm".to_string()),
            ]
        );
    }

    #[test]
    fn attributes_are_unescaped() {
        let mut cursor = XmlTagCursor::from_bytes(br#"<tag k="name" v="Fish &amp; Chips"/>"#);
        assert_eq!(cursor.next_tag().unwrap(), Some(TagKind::Start));
        assert!(cursor.at_start(b"tag"));
        assert_eq!(cursor.attribute(b"k"), Some("name"));
        assert_eq!(cursor.attribute(b"v"), Some("Fish & Chips"));
        assert_eq!(cursor.attribute(b"missing"), None);
    }

    #[test]
    fn skip_element_lands_on_its_end() {
        let mut cursor = XmlTagCursor::from_bytes(b"<a><b><c/></b><d/></a><e/>");
        cursor.next_tag().unwrap();
        cursor.skip_element().unwrap();
        assert_eq!(cursor.current(), Some(TagKind::End));
        assert_eq!(cursor.name(), b"a");
        assert_eq!(cursor.next_tag().unwrap(), Some(TagKind::Start));
        assert_eq!(cursor.name(), b"e");
    }

    #[test]
    fn skipping_past_the_end_is_structural() {
        let mut cursor = XmlTagCursor::from_bytes(b"<a><b>");
        cursor.next_tag().unwrap();
        assert!(matches!(cursor.skip_element(), Err(Error::Structural(_))));
    }
}
