//! Response decoding by declared content type.

use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::models::Decoded;
use crate::{Error, Result};

/// Media types passed through as raw bytes.
const BINARY_TYPES: &[&str] = &[
    "application/pdf",
    "application/octet-stream",
    "application/zip",
];

/// Convert a response body according to its `Content-Type`.
///
/// Parameters such as `charset` are ignored and the comparison is
/// case-insensitive. A missing content type is only accepted when the body
/// is empty.
///
/// # Errors
///
/// Returns [`Error::UnsupportedContentType`] when no rule matches, or a
/// parse error when a JSON/XML body is malformed.
pub fn decode(content_type: Option<&str>, body: Bytes) -> Result<Decoded> {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mt| mt.trim().to_ascii_lowercase())
        .filter(|mt| !mt.is_empty());

    let Some(media_type) = media_type else {
        if body.is_empty() {
            return Ok(Decoded::Empty);
        }
        return Err(Error::UnsupportedContentType(None));
    };

    if media_type == "application/json" || media_type.ends_with("+json") {
        if body.is_empty() {
            return Ok(Decoded::Empty);
        }
        return Ok(Decoded::Json(serde_json::from_slice(&body)?));
    }

    if media_type == "application/xml" || media_type == "text/xml" || media_type.ends_with("+xml") {
        let text = std::str::from_utf8(&body).map_err(|e| Error::Xml(e.to_string()))?;
        return Ok(Decoded::Xml(xml_to_json(text)?));
    }

    if BINARY_TYPES.contains(&media_type.as_str()) || media_type.starts_with("image/") {
        return Ok(Decoded::Binary {
            content_type: media_type,
            bytes: body,
        });
    }

    Err(Error::UnsupportedContentType(content_type.map(String::from)))
}

/// Parse an XML document into the same tree shape a JSON body would have.
///
/// Elements become objects keyed by child name, attributes become `@name`
/// keys, text-only elements become strings and empty elements become
/// `null`. Repeated sibling names collapse into an array.
pub fn xml_to_json(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = Map::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                let mut map = attributes(&e)?;
                let value = parse_element(&mut reader, &mut map)?;
                insert_child(&mut root, name, value);
            }
            Ok(Event::Empty(e)) => {
                let name = tag_name(&e);
                let map = attributes(&e)?;
                insert_child(&mut root, name, empty_value(map));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
    }

    Ok(Value::Object(root))
}

fn parse_element(reader: &mut Reader<&[u8]>, map: &mut Map<String, Value>) -> Result<Value> {
    let mut text = String::new();
    let mut has_children = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                has_children = true;
                let name = tag_name(&e);
                let mut child = attributes(&e)?;
                let value = parse_element(reader, &mut child)?;
                insert_child(map, name, value);
            }
            Ok(Event::Empty(e)) => {
                has_children = true;
                let name = tag_name(&e);
                let child = attributes(&e)?;
                insert_child(map, name, empty_value(child));
            }
            Ok(Event::Text(e)) => {
                let chunk = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                text.push_str(chunk.trim());
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => return Err(Error::Xml("unexpected end of document".to_string())),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
    }

    if !has_children && map.is_empty() {
        return Ok(if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        });
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), Value::String(text));
    }
    Ok(Value::Object(std::mem::take(map)))
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        map.insert(key, Value::String(value));
    }
    Ok(map)
}

fn empty_value(map: Map<String, Value>) -> Value {
    if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    }
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    if let Some(existing) = map.get_mut(&name) {
        match existing {
            Value::Array(items) => items.push(value),
            _ => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    } else {
        map.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_with_charset() {
        let body = Bytes::from_static(br#"{"PriceList":{"Code":"A"}}"#);
        let decoded = decode(Some("application/json; charset=utf-8"), body).unwrap();
        assert_eq!(decoded, Decoded::Json(json!({"PriceList": {"Code": "A"}})));
    }

    #[test]
    fn test_decode_json_and_xml_equivalent() {
        let json_body = Bytes::from_static(
            br#"{"PriceList":{"Code":"A1","Description":"Standard","Comments":"none"}}"#,
        );
        let xml_body = Bytes::from_static(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
              <PriceList>\n  <Code>A1</Code>\n  <Description>Standard</Description>\n  <Comments>none</Comments>\n</PriceList>",
        );

        let from_json = decode(Some("application/json"), json_body).unwrap();
        let from_xml = decode(Some("application/xml"), xml_body).unwrap();
        assert_eq!(from_json.tree(), from_xml.tree());
    }

    #[test]
    fn test_xml_repeated_siblings_and_attributes() {
        let xml = r#"<PriceLists TotalResources="2">
            <PriceList url="https://x/pricelists/A"><Code>A</Code></PriceList>
            <PriceList url="https://x/pricelists/B"><Code>B</Code></PriceList>
            <Empty/>
        </PriceLists>"#;

        let tree = xml_to_json(xml).unwrap();
        assert_eq!(
            tree,
            json!({
                "PriceLists": {
                    "@TotalResources": "2",
                    "PriceList": [
                        {"@url": "https://x/pricelists/A", "Code": "A"},
                        {"@url": "https://x/pricelists/B", "Code": "B"}
                    ],
                    "Empty": null
                }
            })
        );
    }

    #[test]
    fn test_xml_escapes_and_cdata() {
        let tree = xml_to_json("<Note><Text>a &amp; b</Text><Raw><![CDATA[<x>]]></Raw></Note>").unwrap();
        assert_eq!(tree, json!({"Note": {"Text": "a & b", "Raw": "<x>"}}));
    }

    #[test]
    fn test_malformed_xml() {
        let err = decode(Some("text/xml"), Bytes::from_static(b"<a><b></a>")).unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn test_decode_pdf_passthrough() {
        let bytes = Bytes::from_static(b"%PDF-1.7\x00\x01binary");
        let decoded = decode(Some("application/pdf"), bytes.clone()).unwrap();
        assert_eq!(decoded.bytes(), Some(&bytes));
    }

    #[test]
    fn test_decode_image_passthrough() {
        let decoded = decode(Some("Image/PNG"), Bytes::from_static(b"\x89PNG")).unwrap();
        assert!(matches!(decoded, Decoded::Binary { ref content_type, .. } if content_type == "image/png"));
    }

    #[test]
    fn test_decode_unsupported() {
        let err = decode(Some("text/html"), Bytes::from_static(b"<html/>")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedContentType(Some(ref ct)) if ct == "text/html"));

        let err = decode(None, Bytes::from_static(b"???")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedContentType(None)));
    }

    #[test]
    fn test_decode_empty_body() {
        assert_eq!(decode(None, Bytes::new()).unwrap(), Decoded::Empty);
        assert_eq!(decode(Some("application/json"), Bytes::new()).unwrap(), Decoded::Empty);
    }
}
