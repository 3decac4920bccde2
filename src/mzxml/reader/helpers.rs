use quick_xml::events::BytesStart;

use super::MzXMLError;

/// Get an attribute value from a start tag
pub(super) fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzXMLError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzXMLError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

/// Get an attribute and parse it, treating unparsable values as absent
pub(super) fn parse_attribute<T: std::str::FromStr>(
    e: &BytesStart,
    name: &str,
) -> Result<Option<T>, MzXMLError> {
    Ok(get_attribute(e, name)?.and_then(|v| v.trim().parse().ok()))
}
