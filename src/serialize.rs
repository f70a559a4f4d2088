use std::io::Write;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::record::{Attributes, FlowRecord};

pub const ROOT_ELEMENT: &str = "dataroot";

/// What to do with attributes carried over from the input documents.
///
/// Field text is trimmed on load, so values with leading or trailing
/// whitespace, or text split around CDATA sections, do not read back
/// unchanged in either mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttributeMode {
    /// Only elements and their text are written.
    #[default]
    Drop,
    /// Flow and field attributes are written back in source order.
    Preserve,
}

/// Writes `records` as one XML document; every record becomes a
/// `<set_name>` child of the root element.
pub fn write_set<'a, W, I>(
    writer: W,
    set_name: &str,
    records: I,
    mode: AttributeMode,
) -> Result<W, quick_xml::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a FlowRecord>,
{
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.write_event(Event::Start(BytesStart::new(ROOT_ELEMENT)))?;

    for record in records {
        xml.write_event(Event::Start(start(set_name, &record.attributes, mode)))?;
        for (name, field) in record.fields() {
            xml.write_event(Event::Start(start(name, &field.attributes, mode)))?;
            xml.write_event(Event::Text(BytesText::new(&field.value)))?;
            xml.write_event(Event::End(BytesEnd::new(name)))?;
        }
        xml.write_event(Event::End(BytesEnd::new(set_name)))?;
    }

    xml.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    let mut writer = xml.into_inner();
    writer.write_all(b"\n")?;
    Ok(writer)
}

fn start<'a>(name: &'a str, attributes: &'a Attributes, mode: AttributeMode) -> BytesStart<'a> {
    let start = BytesStart::new(name);
    match mode {
        AttributeMode::Drop => start,
        AttributeMode::Preserve => start.with_attributes(
            attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loader::parse_flows,
        record::{Field, DESTINATION, SOURCE, TAG},
    };

    fn records() -> Vec<FlowRecord> {
        let mut first = FlowRecord::new("flow")
            .with_field(SOURCE, "192.168.2.107")
            .with_field(DESTINATION, "10.0.0.1")
            .with_field("payload", "a < b & \"c\"")
            .with_field(TAG, "Normal");
        first.attributes.push(("id".to_owned(), "7".to_owned()));
        first.insert(
            "note",
            Field {
                value: "x".to_owned(),
                attributes: vec![("lang".to_owned(), "en".to_owned())],
            },
        );
        let second = FlowRecord::new("flow")
            .with_field(TAG, "Attack")
            .with_field(SOURCE, "");
        vec![first, second]
    }

    fn render(records: &[FlowRecord], mode: AttributeMode) -> String {
        let out = write_set(Vec::new(), "training_set_1", records, mode).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn starts_with_a_fixed_declaration() {
        let xml = render(&records(), AttributeMode::Drop);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<dataroot>"));
        assert!(xml.contains("<training_set_1>"));
        assert!(xml.contains("<source>192.168.2.107</source>"));
    }

    #[test]
    fn round_trip_drops_attributes_by_default() {
        let original = records();
        let parsed = parse_flows(render(&original, AttributeMode::Drop).as_bytes()).unwrap();

        assert_eq!(parsed.len(), original.len());
        for (parsed, original) in parsed.iter().zip(&original) {
            assert_eq!(parsed.element, "training_set_1");
            assert!(parsed.attributes.is_empty());
            let got: Vec<_> = parsed.fields().map(|(n, f)| (n, f.value.as_str())).collect();
            let want: Vec<_> = original.fields().map(|(n, f)| (n, f.value.as_str())).collect();
            assert_eq!(got, want);
            assert!(parsed.fields().all(|(_, f)| f.attributes.is_empty()));
        }
    }

    #[test]
    fn round_trip_preserves_attributes_on_request() {
        let original = records();
        let parsed = parse_flows(render(&original, AttributeMode::Preserve).as_bytes()).unwrap();

        for (parsed, original) in parsed.iter().zip(&original) {
            assert_eq!(parsed.attributes, original.attributes);
            assert!(parsed.fields().eq(original.fields()));
        }
    }

    #[test]
    fn empty_set_still_has_a_root() {
        let xml = render(&[], AttributeMode::Drop);
        assert!(parse_flows(xml.as_bytes()).unwrap().is_empty());
    }
}
