//! Hadoop-style configuration document rendering.

use std::fmt::Write;

/// Escape text for use inside an XML element
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render properties as a `<configuration>` document
pub fn render<'a>(properties: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    doc.push_str("<configuration>\n");
    for (name, value) in properties {
        // Writing into a String cannot fail
        let _ = writeln!(
            doc,
            "<property><name>{}</name><value>{}</value><final>false</final></property>",
            escape(name),
            escape(value)
        );
    }
    doc.push_str("</configuration>\n");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_render() {
        let doc = render(vec![("k1", "v1"), ("cmd", "python a.py && echo <done>")].into_iter());
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("<name>k1</name><value>v1</value>"));
        assert!(doc.contains("<value>python a.py &amp;&amp; echo &lt;done&gt;</value>"));
        assert!(doc.trim_end().ends_with("</configuration>"));
    }

    #[test]
    fn test_render_empty() {
        let doc = render(std::iter::empty());
        assert!(doc.contains("<configuration>\n</configuration>"));
    }
}
