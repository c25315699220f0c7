//! Artifact Decoder: turns the chart payload into a validated PNG buffer
//! and manages the handle that displays it.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use lootledger_gateway::RawArtifact;
use serde_json::Value;
use tempfile::{Builder, TempPath};
use thiserror::Error;
use tracing::{debug, warn};

/// First byte of every PNG file.
pub const PNG_MAGIC: u8 = 0x89;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unrecognized chart format: {0}")]
    UnrecognizedFormat(String),
    #[error("Chart header mismatch: first byte is {}", describe(.0))]
    HeaderMismatch(Option<u8>),
}

fn describe(byte: &Option<u8>) -> String {
    match byte {
        Some(b) => format!("0x{b:02x}"),
        None => "missing".to_string(),
    }
}

/// A chart image whose header has been checked. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    bytes: Arc<[u8]>,
}

impl ChartArtifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ChartArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChartArtifact({} bytes)", self.bytes.len())
    }
}

/// Convert any accepted wire shape to bytes, without checking the header.
pub fn normalize(raw: &RawArtifact) -> Result<Vec<u8>, DecodeError> {
    match raw {
        RawArtifact::Text(text) => {
            let digits = text.strip_prefix("0x").ok_or_else(|| {
                DecodeError::UnrecognizedFormat("text without 0x prefix".to_string())
            })?;
            hex::decode(digits)
                .map_err(|e| DecodeError::UnrecognizedFormat(format!("invalid hex: {e}")))
        }
        RawArtifact::Bytes(bytes) => Ok(bytes.clone()),
        RawArtifact::Array(items) => items.iter().enumerate().map(array_byte).collect(),
        RawArtifact::Other(value) => Err(DecodeError::UnrecognizedFormat(format!(
            "unsupported {} value",
            json_kind(value)
        ))),
    }
}

fn array_byte((index, item): (usize, &Value)) -> Result<u8, DecodeError> {
    item.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| {
            DecodeError::UnrecognizedFormat(format!("element {index} is not a byte: {item}"))
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalize `raw` and accept it only if it starts with the PNG magic byte.
pub fn decode(raw: &RawArtifact) -> Result<ChartArtifact, DecodeError> {
    let result = normalize(raw).and_then(|bytes| {
        let first = bytes.first().copied();
        if first == Some(PNG_MAGIC) {
            Ok(ChartArtifact {
                bytes: bytes.into(),
            })
        } else {
            Err(DecodeError::HeaderMismatch(first))
        }
    });
    match &result {
        Ok(artifact) => debug!(shape = raw.shape(), len = artifact.len(), "Chart decoded"),
        Err(e) => warn!(shape = raw.shape(), error = %e, "Chart rejected"),
    }
    result
}

/// Transient `file://` location of a decoded chart. The file is removed
/// when the handle is dropped.
pub struct DisplayHandle {
    path: TempPath,
    url: String,
}

impl DisplayHandle {
    pub fn create(artifact: &ChartArtifact) -> io::Result<Self> {
        let mut file = Builder::new()
            .prefix("lootledger-chart-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(artifact.bytes())?;
        file.flush()?;
        let path = file.into_temp_path();
        let url = format!("file://{}", path.display());
        debug!(url = %url, "Chart handle created");
        Ok(Self { path, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayHandle").field(&self.url).finish()
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        debug!(url = %self.url, "Chart handle revoked");
    }
}

/// Holds at most one shown chart. Showing a new one revokes the old handle
/// before the new handle is created.
#[derive(Debug, Default)]
pub struct ChartSlot {
    current: Option<(ChartArtifact, DisplayHandle)>,
}

impl ChartSlot {
    pub fn show(&mut self, artifact: ChartArtifact) -> io::Result<&DisplayHandle> {
        self.clear();
        let handle = DisplayHandle::create(&artifact)?;
        let (_, handle) = self.current.insert((artifact, handle));
        Ok(handle)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn handle(&self) -> Option<&DisplayHandle> {
        self.current.as_ref().map(|(_, h)| h)
    }

    pub fn artifact(&self) -> Option<&ChartArtifact> {
        self.current.as_ref().map(|(a, _)| a)
    }

    pub fn is_shown(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_hex_text() {
        let chart = decode(&RawArtifact::Text("0x890102".into())).unwrap();
        assert_eq!(chart.bytes(), &[0x89, 0x01, 0x02]);

        assert_eq!(
            decode(&RawArtifact::Text("0x000102".into())),
            Err(DecodeError::HeaderMismatch(Some(0x00)))
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let text = format!("0x{}", hex::encode(PNG));
        let chart = decode(&RawArtifact::Text(text)).unwrap();
        assert_eq!(chart.bytes(), &PNG);
    }

    #[test]
    fn test_uppercase_hex_digits() {
        let chart = decode(&RawArtifact::Text("0x89ABcd".into())).unwrap();
        assert_eq!(chart.bytes(), &[0x89, 0xab, 0xcd]);
    }

    #[test]
    fn test_bad_text_is_unrecognized() {
        for text in ["890102", "0x89010", "0x89zz", "PNG"] {
            assert!(
                matches!(
                    decode(&RawArtifact::Text(text.into())),
                    Err(DecodeError::UnrecognizedFormat(_))
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_bytes_and_arrays() {
        assert!(decode(&RawArtifact::Bytes(PNG.to_vec())).is_ok());
        let chart = decode(&RawArtifact::from(json!([137, 80, 78, 71]))).unwrap();
        assert_eq!(chart.bytes(), &PNG[..4]);
    }

    #[test]
    fn test_wrong_header_in_every_shape() {
        let shapes = [
            RawArtifact::Text("0x0089".into()),
            RawArtifact::Bytes(vec![0x50, 0x89]),
            RawArtifact::Array(vec![json!(0), json!(137)]),
        ];
        for raw in shapes {
            assert!(matches!(decode(&raw), Err(DecodeError::HeaderMismatch(Some(_)))));
        }
    }

    #[test]
    fn test_empty_payload_is_header_mismatch() {
        assert_eq!(
            decode(&RawArtifact::Text("0x".into())),
            Err(DecodeError::HeaderMismatch(None))
        );
        assert_eq!(
            decode(&RawArtifact::Bytes(vec![])),
            Err(DecodeError::HeaderMismatch(None))
        );
    }

    #[test]
    fn test_array_elements_must_be_bytes() {
        for bad in [json!([137, 256]), json!([137, -1]), json!([137, 1.5]), json!([137, "x"])] {
            assert!(matches!(
                decode(&RawArtifact::from(bad)),
                Err(DecodeError::UnrecognizedFormat(_))
            ));
        }
    }

    #[test]
    fn test_other_shapes_are_unrecognized() {
        let err = decode(&RawArtifact::Other(json!({"png": "0x89"}))).unwrap_err();
        assert_eq!(err.to_string(), "Unrecognized chart format: unsupported object value");
        assert!(decode(&RawArtifact::Other(json!(null))).is_err());
    }

    #[test]
    fn test_display_handle_lifecycle() {
        let chart = decode(&RawArtifact::Bytes(PNG.to_vec())).unwrap();
        let handle = DisplayHandle::create(&chart).unwrap();
        let path = handle.path().to_path_buf();
        assert!(handle.url().starts_with("file://"));
        assert_eq!(std::fs::read(&path).unwrap(), PNG);

        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn test_slot_revokes_superseded_handle() {
        let mut slot = ChartSlot::default();
        let first = decode(&RawArtifact::Bytes(PNG.to_vec())).unwrap();
        let first_path = slot.show(first).unwrap().path().to_path_buf();

        let second = decode(&RawArtifact::Bytes(vec![0x89, 0x00])).unwrap();
        let second_path = slot.show(second).unwrap().path().to_path_buf();

        assert!(!first_path.exists());
        assert!(second_path.exists());
        assert_eq!(slot.artifact().unwrap().bytes(), &[0x89, 0x00]);

        slot.clear();
        assert!(!slot.is_shown());
        assert!(!second_path.exists());
    }
}
