use std::collections::BTreeMap;
use shared::types::PropertyValue;

/// A TXT property value as it arrives off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Bytes(Vec<u8>),
    List(Vec<Vec<u8>>),
}

impl From<&[u8]> for RawValue {
    fn from(bytes: &[u8]) -> Self {
        RawValue::Bytes(bytes.to_vec())
    }
}

/// Raw property mapping in wire order
pub type RawProperties = Vec<(Vec<u8>, RawValue)>;

/// Decode raw TXT properties into a string-keyed mapping.
///
/// Never fails: invalid UTF-8 is replaced with U+FFFD and NUL bytes are
/// dropped. A later duplicate key overwrites an earlier one.
pub fn decode_properties(raw: &[(Vec<u8>, RawValue)]) -> BTreeMap<String, PropertyValue> {
    raw.iter()
        .map(|(key, value)| (decode_text(key), decode_value(value)))
        .collect()
}

fn decode_value(value: &RawValue) -> PropertyValue {
    match value {
        RawValue::Bytes(bytes) => PropertyValue::Text(decode_text(bytes)),
        RawValue::List(items) => PropertyValue::List(items.iter().map(|b| decode_text(b)).collect()),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_plain_utf8() {
        let raw = vec![
            (b"mac".to_vec(), RawValue::Bytes(b"a8032a1b2c3d".to_vec())),
            (b"name".to_vec(), RawValue::Bytes("küche".as_bytes().to_vec())),
        ];
        let decoded = decode_properties(&raw);
        assert_eq!(decoded["mac"], PropertyValue::Text("a8032a1b2c3d".to_string()));
        assert_eq!(decoded["name"], PropertyValue::Text("küche".to_string()));
    }

    #[test]
    fn test_invalid_bytes_degrade_instead_of_failing() {
        let raw = vec![(vec![b'k', 0xff], RawValue::Bytes(vec![b'v', 0xfe, 0x00, b'w']))];
        let decoded = decode_properties(&raw);
        assert_eq!(
            decoded["k\u{fffd}"],
            PropertyValue::Text("v\u{fffd}w".to_string())
        );
    }

    #[test]
    fn test_lists_keep_order() {
        let raw = vec![(
            b"ifaces".to_vec(),
            RawValue::List(vec![b"wlan0".to_vec(), vec![0xc3], b"eth0".to_vec()]),
        )];
        let decoded = decode_properties(&raw);
        assert_eq!(
            decoded["ifaces"],
            PropertyValue::List(vec![
                "wlan0".to_string(),
                "\u{fffd}".to_string(),
                "eth0".to_string(),
            ])
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(decode_properties(&[]).is_empty());
    }
}
