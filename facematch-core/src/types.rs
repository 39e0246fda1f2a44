//! # Core Types
//!
//! Identifiers, face embeddings and face records.
//!
//! An [`EmbeddingVector`] can only exist with exactly
//! [`EMBEDDING_DIMENSION`] finite components, so every distance computed
//! downstream operates on well-formed data.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::distance;
use crate::error::{Error, Result};

/// Number of components produced by the face-recognition model
pub const EMBEDDING_DIMENSION: usize = 128;

/// Identifier of a photo-event (one gallery, one tenant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a photo, owned by the external photo catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based position of a face within a photo's detected-faces array
pub type FaceSlot = u32;

/// Immutable 128-dimension face embedding.
///
/// Components live behind an `Arc`, so cloning a record (or a whole index
/// during copy-on-write) never copies the floats.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector(Arc<[f32; EMBEDDING_DIMENSION]>);

impl EmbeddingVector {
    /// Build an embedding, rejecting wrong lengths and non-finite values.
    pub fn new(components: impl AsRef<[f32]>) -> Result<Self> {
        let components = components.as_ref();
        let array: [f32; EMBEDDING_DIMENSION] =
            components.try_into().map_err(|_| Error::DimensionMismatch {
                expected: EMBEDDING_DIMENSION,
                actual: components.len(),
            })?;

        if let Some(index) = array.iter().position(|c| !c.is_finite()) {
            return Err(Error::InvalidValue {
                index,
                message: format!("{} is not a finite number", array[index]),
            });
        }

        Ok(Self(Arc::new(array)))
    }

    /// Parse an embedding from a JSON value, the shape descriptors arrive in
    /// from the extraction pipeline and from HTTP callers.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::validation("embedding must be an array of numbers"))?;

        if items.len() != EMBEDDING_DIMENSION {
            return Err(Error::DimensionMismatch {
                expected: EMBEDDING_DIMENSION,
                actual: items.len(),
            });
        }

        let mut components = Vec::with_capacity(EMBEDDING_DIMENSION);
        for (index, item) in items.iter().enumerate() {
            let number = item.as_f64().ok_or_else(|| {
                Error::validation(format!("embedding component {index} is not numeric"))
            })?;
            components.push(number as f32);
        }

        Self::new(components)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0[..]
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Sum of squared component-wise differences
    pub fn squared_euclidean_distance(&self, other: &EmbeddingVector) -> Result<f32> {
        // Unreachable through the public constructors; guards hand-built slices.
        if self.0.len() != other.0.len() {
            return Err(Error::DimensionMismatch {
                expected: self.0.len(),
                actual: other.0.len(),
            });
        }
        Ok(distance::l2_squared(self.as_slice(), other.as_slice()))
    }

    /// Square root of [`squared_euclidean_distance`](Self::squared_euclidean_distance)
    pub fn euclidean_distance(&self, other: &EmbeddingVector) -> Result<f32> {
        self.squared_euclidean_distance(other).map(f32::sqrt)
    }

    /// Infallible squared distance for hot loops. Both sides are fixed-size
    /// arrays, so the lengths always agree.
    #[inline]
    pub(crate) fn squared_distance_unchecked(&self, other: &EmbeddingVector) -> f32 {
        distance::l2_squared(self.as_slice(), other.as_slice())
    }
}

impl fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EmbeddingVector([{:.4}, {:.4}, {:.4}, ..; {}])",
            self.0[0], self.0[1], self.0[2], EMBEDDING_DIMENSION
        )
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = Error;

    fn try_from(components: Vec<f32>) -> Result<Self> {
        Self::new(components)
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(embedding: EmbeddingVector) -> Self {
        embedding.to_vec()
    }
}

/// One detected face of one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub photo_id: PhotoId,
    pub face_slot: FaceSlot,
    pub embedding: EmbeddingVector,
}

impl FaceRecord {
    pub fn new(photo_id: PhotoId, face_slot: FaceSlot, embedding: EmbeddingVector) -> Self {
        Self {
            photo_id,
            face_slot,
            embedding,
        }
    }

    /// Squared distance from this face to `query`
    #[inline]
    pub fn squared_distance_to(&self, query: &EmbeddingVector) -> f32 {
        self.embedding.squared_distance_unchecked(query)
    }

    /// Euclidean distance from this face to `query`
    #[inline]
    pub fn distance_to(&self, query: &EmbeddingVector) -> f32 {
        self.squared_distance_to(query).sqrt()
    }
}
