//! Parser for the XML item definitions stored in `GDB_Items.Definition`.

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

/// One `GPFieldInfoEx` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: Option<String>,
    pub length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub nullable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDefinition {
    pub oid_field_name: Option<String>,
    pub shape_field_name: Option<String>,
    pub fields: Vec<FieldDefinition>,
    /// Filled from the item row, not from the XML.
    pub item_type_uuid: Option<String>,
}

fn parse_int(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}

fn parse_nullable(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses a definition document. Returns `None` for empty or malformed XML
/// and for documents that name no fields, no OID field and no shape field.
pub fn parse_definition(xml: &str) -> Option<ItemDefinition> {
    if xml.trim().is_empty() {
        return None;
    }
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut definition = ItemDefinition::default();
    let mut depth = 0usize;
    // Open field and the depth of its element
    let mut field: Option<(FieldDefinition, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                text.clear();
                if e.local_name().as_ref().ends_with(b"GPFieldInfoEx") && field.is_none() {
                    field = Some((FieldDefinition::default(), depth));
                }
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(s) => text.push_str(&s),
                Err(e) => {
                    debug!("unreadable item definition text: {e}");
                    return None;
                }
            },
            Ok(Event::CData(c)) => text.push_str(&String::from_utf8_lossy(&c)),
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                let field_depth = field.as_ref().map(|(_, d)| *d);
                match field_depth {
                    Some(d) if depth == d => {
                        if let Some((done, _)) = field.take() {
                            if !done.name.trim().is_empty() {
                                definition.fields.push(done);
                            }
                        }
                    }
                    Some(d) if depth == d + 1 => {
                        if let Some((current, _)) = field.as_mut() {
                            match name.as_str() {
                                "Name" if current.name.is_empty() => current.name = text.trim().to_string(),
                                "FieldType" if current.field_type.is_none() => current.field_type = non_empty(&text),
                                "Length" => current.length = parse_int(&text),
                                "Precision" => current.precision = parse_int(&text),
                                "Scale" => current.scale = parse_int(&text),
                                "IsNullable" => current.nullable = parse_nullable(&text),
                                _ => {}
                            }
                        }
                    }
                    _ => {
                        if name == "OIDFieldName" && definition.oid_field_name.is_none() {
                            definition.oid_field_name = non_empty(&text);
                        } else if name == "ShapeFieldName" && definition.shape_field_name.is_none() {
                            definition.shape_field_name = non_empty(&text);
                        }
                    }
                }
                text.clear();
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("malformed item definition at {}: {e}", reader.buffer_position());
                return None;
            }
            Ok(_) => {}
        }
    }

    if definition.fields.is_empty() && definition.oid_field_name.is_none() && definition.shape_field_name.is_none() {
        return None;
    }
    Some(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURE_CLASS: &str = r#"<typens:DEFeatureClassInfo xmlns:typens="http://www.esri.com/schemas/ArcGIS/10.1">
        <Name>parcels</Name>
        <HasOID>true</HasOID>
        <OIDFieldName>OBJECTID</OIDFieldName>
        <GPFieldInfoExs>
          <typens:GPFieldInfoEx>
            <Name>OBJECTID</Name><FieldType>esriFieldTypeOID</FieldType><IsNullable>false</IsNullable>
          </typens:GPFieldInfoEx>
          <GPFieldInfoEx>
            <Name>label</Name><AliasName>Label</AliasName><FieldType>esriFieldTypeString</FieldType>
            <Length>80</Length><IsNullable>yes</IsNullable>
          </GPFieldInfoEx>
          <GPFieldInfoEx>
            <Name>area</Name><FieldType>esriFieldTypeDouble</FieldType><Precision>12</Precision><Scale>3</Scale>
          </GPFieldInfoEx>
        </GPFieldInfoExs>
        <ShapeFieldName>SHAPE</ShapeFieldName>
    </typens:DEFeatureClassInfo>"#;

    #[test]
    fn test_parse_feature_class_definition() {
        let def = parse_definition(FEATURE_CLASS).unwrap();
        assert_eq!(def.oid_field_name.as_deref(), Some("OBJECTID"));
        assert_eq!(def.shape_field_name.as_deref(), Some("SHAPE"));
        assert_eq!(def.fields.len(), 3);
        assert_eq!(def.fields[0].field_type.as_deref(), Some("esriFieldTypeOID"));
        assert_eq!(def.fields[0].nullable, Some(false));
        assert_eq!(def.fields[1].name, "label");
        assert_eq!(def.fields[1].length, Some(80));
        assert_eq!(def.fields[1].nullable, Some(true));
        assert_eq!(def.fields[2].scale, Some(3));
        assert_eq!(def.fields[2].nullable, None);
    }

    #[test]
    fn test_document_without_fields_is_none() {
        assert!(parse_definition("<DEDomain><Name>d</Name></DEDomain>").is_none());
        assert!(parse_definition("").is_none());
    }

    #[test]
    fn test_malformed_xml_is_none() {
        assert!(parse_definition("<a><OIDFieldName>x</b>").is_none());
    }
}
