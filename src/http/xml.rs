//! Element-per-key XML encoding of JSON-shaped content.
//!
//! Maps become nested elements, sequences become repeated `<item>` elements,
//! scalars become escaped text nodes. Keys that are not usable as element
//! names are rewritten: purely numeric keys become `item`, other invalid
//! characters become `_`.

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

/// Name of the document element.
pub const ROOT_ELEMENT: &str = "response";

/// Element name used for sequence entries and numeric keys.
pub const ITEM_ELEMENT: &str = "item";

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode `value` as an XML document rooted at [`ROOT_ELEMENT`].
pub fn encode(value: &Value) -> Result<Vec<u8>, XmlError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, ROOT_ELEMENT, value)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), XmlError> {
    match value {
        Value::Null => {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
        }
        Value::Object(fields) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for (key, child) in fields {
                write_element(writer, &element_name(key), child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Value::Array(items) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for child in items {
                write_element(writer, ITEM_ELEMENT, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        scalar => {
            let text = match scalar {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

fn element_name(key: &str) -> Cow<'_, str> {
    if key.is_empty() || key.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(ITEM_ELEMENT);
    }

    let valid_start = key.starts_with(|c: char| c.is_alphabetic() || c == '_');
    let valid_rest = key
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_start && valid_rest {
        return Cow::Borrowed(key);
    }

    let mut name: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if !valid_start {
        name.insert(0, '_');
    }
    Cow::Owned(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode_str(value: &Value) -> String {
        String::from_utf8(encode(value).unwrap()).unwrap()
    }

    #[test]
    fn test_nested_maps_become_elements() {
        let xml = encode_str(&json!({"user": {"name": "Ada", "age": 36}}));

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<response><user><age>36</age><name>Ada</name></user></response>"));
    }

    #[test]
    fn test_numeric_keys_and_sequences_use_item() {
        let xml = encode_str(&json!({"0": "zero", "list": [1, 2]}));

        assert!(xml.contains("<item>zero</item>"));
        assert!(xml.contains("<list><item>1</item><item>2</item></list>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = encode_str(&json!({"note": "a < b & c"}));

        assert!(xml.contains("<note>a &lt; b &amp; c</note>"));
    }

    #[test]
    fn test_invalid_names_rewritten() {
        assert_eq!(element_name("first name"), "first_name");
        assert_eq!(element_name("1st"), "_1st");
        assert_eq!(element_name("42"), "item");
        assert_eq!(element_name("ok-name"), "ok-name");
    }

    #[test]
    fn test_null_is_empty_element() {
        let xml = encode_str(&json!({"missing": null}));

        assert!(xml.contains("<missing/>"));
    }
}
