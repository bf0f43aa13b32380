//! Event-driven reader for the scene document format
//!
//! A hand-rolled tokenizer turns the document into a flat stream of start
//! and end tags; the walk instantiates nodes through the registry's
//! tag-to-class map. Unknown tags are transparent, not fatal: the walk
//! keeps scanning their contents for recognizable elements. Nesting in the
//! file is the only relationship encoding - a freshly parsed element and
//! the currently open one exchange the process-child / process-parent
//! handshake before the new element is added.

use log::debug;

use super::error::SceneError;
use super::node::{NodeHandle, SceneNode};
use super::store::Scene;

/// Document root element tag; a no-op marker for reader and writer.
pub(crate) const ROOT_TAG: &str = "MRML";

#[derive(Debug, PartialEq)]
pub(crate) enum XmlEvent {
    StartElement {
        tag: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndElement {
        tag: String,
    },
    Eof,
}

/// Pull tokenizer over the document text. Text content between elements
/// is skipped; only markup produces events.
pub(crate) struct Tokenizer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Tokenizer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> SceneError {
        SceneError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s.as_bytes())
    }

    /// Advances past `needle`, or errors at end of input.
    fn skip_past(&mut self, needle: &str, context: &str) -> Result<(), SceneError> {
        loop {
            if self.starts_with(needle) {
                for _ in 0..needle.len() {
                    self.bump();
                }
                return Ok(());
            }
            if self.bump().is_none() {
                return Err(self.error(format!("unterminated {}", context)));
            }
        }
    }

    fn read_name(&mut self) -> Result<String, SceneError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'.' || c == b':')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn read_quoted_value(&mut self) -> Result<String, SceneError> {
        let quote = match self.bump() {
            Some(c @ (b'"' | b'\'')) => c,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        let mut raw = Vec::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some(c) => raw.push(c),
                None => return Err(self.error("unterminated attribute value")),
            }
        }
        Ok(unescape(&String::from_utf8_lossy(&raw)))
    }

    pub(crate) fn next_event(&mut self) -> Result<XmlEvent, SceneError> {
        loop {
            // scan to the next markup start, ignoring text content
            while matches!(self.peek(), Some(c) if c != b'<') {
                self.bump();
            }
            if self.peek().is_none() {
                return Ok(XmlEvent::Eof);
            }

            if self.starts_with("<!--") {
                self.skip_past("-->", "comment")?;
                continue;
            }
            if self.starts_with("<?") {
                self.skip_past("?>", "processing instruction")?;
                continue;
            }
            if self.starts_with("<!") {
                self.skip_past(">", "declaration")?;
                continue;
            }

            if self.starts_with("</") {
                self.bump();
                self.bump();
                self.skip_whitespace();
                let tag = self.read_name()?;
                self.skip_whitespace();
                if self.bump() != Some(b'>') {
                    return Err(self.error(format!("malformed end tag </{}", tag)));
                }
                return Ok(XmlEvent::EndElement { tag });
            }

            self.bump(); // '<'
            self.skip_whitespace();
            let tag = self.read_name()?;
            let mut attributes = Vec::new();
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(b'>') => {
                        self.bump();
                        return Ok(XmlEvent::StartElement {
                            tag,
                            attributes,
                            self_closing: false,
                        });
                    }
                    Some(b'/') => {
                        self.bump();
                        if self.bump() != Some(b'>') {
                            return Err(self.error(format!("malformed tag <{}", tag)));
                        }
                        return Ok(XmlEvent::StartElement {
                            tag,
                            attributes,
                            self_closing: true,
                        });
                    }
                    Some(_) => {
                        let key = self.read_name()?;
                        self.skip_whitespace();
                        if self.bump() != Some(b'=') {
                            return Err(self.error(format!("attribute {} missing '='", key)));
                        }
                        self.skip_whitespace();
                        let value = self.read_quoted_value()?;
                        attributes.push((key, value));
                    }
                    None => return Err(self.error(format!("unterminated tag <{}", tag))),
                }
            }
        }
    }
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match replaced {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Walks the document, instantiating nodes through the scene's registry.
///
/// With `scratch` set, parsed nodes are collected there instead of being
/// added to the scene - the isolated-parse mode used by import and
/// copy/paste flows. Otherwise every node is added to the scene as it is
/// parsed, which is where ID assignment happens.
pub(crate) fn parse_scene_xml(
    xml: &str,
    scene: &mut Scene,
    mut scratch: Option<&mut Vec<NodeHandle>>,
) -> Result<(), SceneError> {
    let mut tokenizer = Tokenizer::new(xml);
    let mut element_stack: Vec<NodeHandle> = Vec::new();

    loop {
        match tokenizer.next_event()? {
            XmlEvent::StartElement {
                tag,
                attributes,
                self_closing,
            } => {
                if tag == ROOT_TAG {
                    continue;
                }
                let Some(class_name) = scene.registry().class_name_by_tag(&tag) else {
                    debug!("skipping unrecognized element <{}>", tag);
                    continue;
                };
                let Some(node) = scene.registry().create_node_by_class(class_name) else {
                    debug!("no factory for class {}; skipping <{}>", class_name, tag);
                    continue;
                };

                node.borrow_mut().read_attributes(&attributes);

                if let Some(parent) = element_stack.last() {
                    parent.borrow_mut().process_child(&mut *node.borrow_mut());
                    node.borrow_mut().process_parent(&mut *parent.borrow_mut());
                }
                if !self_closing {
                    element_stack.push(node.clone());
                }

                match scratch.as_mut() {
                    Some(list) => list.push(node),
                    None => {
                        scene.add_node(node);
                    }
                }
            }
            XmlEvent::EndElement { tag } => {
                if tag != ROOT_TAG && scene.registry().class_name_by_tag(&tag).is_some() {
                    element_stack.pop();
                }
            }
            XmlEvent::Eof => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<XmlEvent>, SceneError> {
        let mut tokenizer = Tokenizer::new(xml);
        let mut events = Vec::new();
        loop {
            let event = tokenizer.next_event()?;
            if event == XmlEvent::Eof {
                return Ok(events);
            }
            events.push(event);
        }
    }

    #[test]
    fn test_tokenizer_start_and_end_tags() {
        let events = collect(r#"<MRML><Volume id="V1" name="head"></Volume></MRML>"#).unwrap();
        assert_eq!(events.len(), 4);
        match &events[1] {
            XmlEvent::StartElement {
                tag,
                attributes,
                self_closing,
            } => {
                assert_eq!(tag, "Volume");
                assert!(!self_closing);
                assert_eq!(
                    attributes,
                    &vec![
                        ("id".to_string(), "V1".to_string()),
                        ("name".to_string(), "head".to_string())
                    ]
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            events[2],
            XmlEvent::EndElement {
                tag: "Volume".to_string()
            }
        );
    }

    #[test]
    fn test_tokenizer_skips_comments_and_declarations() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- header -->\n<MRML></MRML>";
        let events = collect(xml).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_tokenizer_self_closing_and_entities() {
        let events = collect(r#"<Point label="a &amp; b &quot;q&quot;"/>"#).unwrap();
        match &events[0] {
            XmlEvent::StartElement {
                attributes,
                self_closing,
                ..
            } => {
                assert!(self_closing);
                assert_eq!(attributes[0].1, "a & b \"q\"");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_tokenizer_reports_malformed_input() {
        let mut tokenizer = Tokenizer::new("<Volume id=");
        let err = loop {
            match tokenizer.next_event() {
                Ok(XmlEvent::Eof) => panic!("expected a parse error"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, SceneError::Parse { .. }));
    }

    #[test]
    fn test_tokenizer_tracks_lines() {
        let mut tokenizer = Tokenizer::new("<MRML>\n\n<Volume id=\n</MRML>");
        let err = loop {
            match tokenizer.next_event() {
                Ok(XmlEvent::Eof) => panic!("expected a parse error"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        match err {
            SceneError::Parse { line, .. } => assert!(line >= 3),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
