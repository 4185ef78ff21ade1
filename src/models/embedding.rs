//! Sequence embeddings.

use crate::{Error, Result};

/// A dense embedding of shape `[1, seq_len, dim]`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEmbedding {
    seq_len: usize,
    dim: usize,
    data: Vec<f32>,
}

impl SequenceEmbedding {
    /// Creates an all-zero embedding.
    #[must_use]
    pub fn zeros(seq_len: usize, dim: usize) -> Self {
        Self {
            seq_len,
            dim,
            data: vec![0.0; seq_len * dim],
        }
    }

    /// Builds an embedding from per-position rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any row is not `dim` wide.
    pub fn from_rows(rows: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
        let seq_len = rows.len();
        let mut data = Vec::with_capacity(seq_len * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(Error::InvalidInput(format!(
                    "embedding row {i} has width {} (expected {dim})",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self { seq_len, dim, data })
    }

    /// Returns the shape as `[batch, seq_len, dim]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        [1, self.seq_len, self.dim]
    }

    /// Returns the sequence length.
    #[must_use]
    pub const fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Returns the embedding dimensionality.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Returns one position's vector.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        (index < self.seq_len).then(|| &self.data[index * self.dim..(index + 1) * self.dim])
    }

    /// Mutable access to one position's vector.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        (index < self.seq_len).then(|| &mut self.data[index * self.dim..(index + 1) * self.dim])
    }

    /// Mean over the sequence dimension, yielding one `dim`-wide vector.
    ///
    /// An empty sequence pools to the zero vector.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_pool(&self) -> Vec<f32> {
        let mut pooled = vec![0.0f32; self.dim];
        if self.seq_len == 0 {
            return pooled;
        }
        for row in self.data.chunks_exact(self.dim) {
            for (acc, v) in pooled.iter_mut().zip(row) {
                *acc += v;
            }
        }
        let n = self.seq_len as f32;
        pooled.iter_mut().for_each(|v| *v /= n);
        pooled
    }

    /// Concatenates two embeddings along the sequence dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the dimensionalities differ.
    pub fn concat(&self, other: &Self) -> Result<Self> {
        if self.dim != other.dim {
            return Err(Error::InvalidInput(format!(
                "cannot concatenate embeddings of dim {} and {}",
                self.dim, other.dim
            )));
        }
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Ok(Self {
            seq_len: self.seq_len + other.seq_len,
            dim: self.dim,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool() {
        let emb = SequenceEmbedding::from_rows(vec![vec![1.0, 2.0], vec![3.0, 6.0]], 2)
            .unwrap();
        assert_eq!(emb.shape(), [1, 2, 2]);
        assert_eq!(emb.mean_pool(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_empty_pools_to_zero() {
        assert_eq!(SequenceEmbedding::zeros(0, 3).mean_pool(), vec![0.0; 3]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(SequenceEmbedding::from_rows(vec![vec![1.0], vec![1.0, 2.0]], 1).is_err());
    }

    #[test]
    fn test_concat() {
        let a = SequenceEmbedding::zeros(1, 4);
        let b = SequenceEmbedding::zeros(3, 4);
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.seq_len(), 4);
        assert!(a.concat(&SequenceEmbedding::zeros(1, 5)).is_err());
    }
}
