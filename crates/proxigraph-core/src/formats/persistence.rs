//! # Snapshot Format
//!
//! Binary serialization for graph snapshots.
//!
//! Format: Header (5 bytes) + postcard-serialized [`GraphSnapshot`].
//! - 4 bytes: Magic ("PXGR")
//! - 1 byte: Version
//!
//! Sizes and the header are validated before the payload is decoded, so a
//! truncated or foreign file fails fast instead of allocating.

use crate::{GraphError, GraphSnapshot, primitives};

/// Maximum accepted size of encoded snapshot data.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;

/// Header length in bytes.
pub const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header that precedes every encoded snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), GraphError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(GraphError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(GraphError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(GraphError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode a snapshot (header + payload). No I/O.
pub fn snapshot_to_bytes(snapshot: &GraphSnapshot) -> Result<Vec<u8>, GraphError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| GraphError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Decode a snapshot produced by [`snapshot_to_bytes`]. No I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<GraphSnapshot, GraphError> {
    if bytes.len() < HEADER_LEN {
        return Err(GraphError::SerializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_LEN
        )));
    }

    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(GraphError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        GraphError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, NodeId, NodeRecord};

    fn sample() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                NodeRecord {
                    id: NodeId::new("N2"),
                    number: 2,
                    x: 12.5,
                    y: 300.25,
                },
                NodeRecord {
                    id: NodeId::new("N3"),
                    number: 3,
                    x: 40.0,
                    y: 310.0,
                },
            ],
            edges: vec![Edge::new(NodeId::new("N2"), NodeId::new("N3"), 28.6)],
        }
    }

    #[test]
    fn header_starts_encoded_data() {
        let bytes = snapshot_to_bytes(&sample()).expect("encode");
        assert_eq!(&bytes[0..4], primitives::MAGIC_BYTES);
        assert_eq!(bytes[4], primitives::FORMAT_VERSION);
    }

    #[test]
    fn encoding_is_stable() {
        let bytes1 = snapshot_to_bytes(&sample()).expect("encode");
        let decoded = snapshot_from_bytes(&bytes1).expect("decode");
        assert_eq!(decoded, sample());
        let bytes2 = snapshot_to_bytes(&decoded).expect("encode");
        assert_eq!(bytes1, bytes2, "re-encoding must be byte-identical");
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = snapshot_to_bytes(&sample()).expect("encode");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = snapshot_to_bytes(&sample()).expect("encode");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        let err = snapshot_from_bytes(&bytes).expect_err("should fail");
        assert!(err.to_string().contains("Unsupported version"));
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(snapshot_from_bytes(b"PXG").is_err());
        let bytes = snapshot_to_bytes(&sample()).expect("encode");
        assert!(snapshot_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
