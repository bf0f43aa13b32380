//! Linear XML writer for the scene document format
//!
//! The output is a flat element stream under a literal `MRML` root:
//! indentation is purely visual, driven by each node's self-reported
//! indent delta, and carries no containment semantics for the writer.
//! Serialization order is membership order; keeping parents ahead of
//! their children is the caller's responsibility.

use super::node::{NodeHandle, SceneNode};

/// Escapes an attribute value for double-quoted XML output.
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes the node list to document text.
///
/// Nodes flagged as not saved with the scene are skipped. A negative
/// indent delta takes effect before the node's element is written, a
/// positive one after, so a grouping node indents everything that follows
/// it until some later node closes the level.
pub(crate) fn write_scene_xml(nodes: &[NodeHandle], version: &str) -> String {
    let mut out = String::new();
    out.push_str("<MRML version=\"");
    out.push_str(&escape(version));
    out.push_str("\">\n");

    let mut indent: i32 = 0;
    for handle in nodes {
        let node = handle.borrow();
        if !node.core().save_with_scene() {
            continue;
        }

        let delta = node.core().indent_delta();
        if delta < 0 {
            indent -= 2;
        }
        if indent < 0 {
            indent = 0;
        }

        let mut atts: Vec<(String, String)> = Vec::new();
        node.core().write_core_attributes(&mut atts);
        node.write_attributes(&mut atts);

        for _ in 0..indent {
            out.push(' ');
        }
        out.push('<');
        out.push_str(node.tag_name());
        for (key, value) in &atts {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push_str("></");
        out.push_str(node.tag_name());
        out.push_str(">\n");

        if delta > 0 {
            indent += 2;
        }
    }

    out.push_str("</MRML>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::nodes::{PointListNode, PointNode, VolumeNode};

    #[test]
    fn test_escape_covers_markup_characters() {
        assert_eq!(escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_writer_emits_flat_elements_under_root() {
        let volume = VolumeNode::new_handle();
        {
            let mut v = volume.borrow_mut();
            v.core_mut().set_id("VolumeNode1");
            v.core_mut().set_name("head");
        }
        let xml = write_scene_xml(&[volume], "1.0");
        assert!(xml.starts_with("<MRML version=\"1.0\">\n"));
        assert!(xml.contains("<Volume id=\"VolumeNode1\" name=\"head\""));
        assert!(xml.contains("></Volume>\n"));
        assert!(xml.ends_with("</MRML>\n"));
    }

    #[test]
    fn test_writer_skips_nodes_not_saved_with_scene() {
        let volume = VolumeNode::new_handle();
        {
            let mut v = volume.borrow_mut();
            v.core_mut().set_id("VolumeNode1");
            v.core_mut().set_save_with_scene(false);
        }
        let xml = write_scene_xml(&[volume], "1.0");
        assert!(!xml.contains("<Volume"));
    }

    #[test]
    fn test_indent_delta_drives_visual_nesting_only() {
        let list = PointListNode::new_handle();
        list.borrow_mut().core_mut().set_id("PointListNode1");
        let point = PointNode::new_handle();
        point.borrow_mut().core_mut().set_id("PointNode1");
        // a closer node reporting a negative delta pops the level
        let closer = VolumeNode::new_handle();
        {
            let mut c = closer.borrow_mut();
            c.core_mut().set_id("VolumeNode1");
            c.core_mut().set_indent_delta(-1);
        }

        let xml = write_scene_xml(&[list, point, closer], "1.0");
        let lines: Vec<&str> = xml.lines().collect();
        assert!(lines[1].starts_with("<PointList"));
        assert!(lines[2].starts_with("  <Point"));
        assert!(lines[3].starts_with("<Volume"));
    }

    #[test]
    fn test_indent_never_goes_negative() {
        let closer = VolumeNode::new_handle();
        {
            let mut c = closer.borrow_mut();
            c.core_mut().set_id("VolumeNode1");
            c.core_mut().set_indent_delta(-1);
        }
        let xml = write_scene_xml(&[closer], "1.0");
        assert!(xml.lines().nth(1).unwrap().starts_with("<Volume"));
    }
}
