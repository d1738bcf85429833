//! Model definition: shapes and hyperparameters as pure data.
//!
//! A `ModelConfig` is independent of any execution backend. It can be
//! serialized, validated, and later bound to a device by
//! [`CnnDistMult::new`](crate::model::CnnDistMult::new).

use serde::{Deserialize, Serialize};

use crate::error::{DistConvError, Result};

/// Hyperparameters and shapes for the CNN + DistMult model.
///
/// Sentence tensors follow the layout `[batch, seq_len, vec_width, channels]`.
/// The convolution uses valid padding and unit stride, so the pooled encoding
/// width is `vec_width - filter_w + 1`; that width must equal `dim` for the
/// encoding to score against entity embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Sentence length in tokens (rows of the input)
    pub seq_len: usize,
    /// Width of each token vector (columns of the input)
    pub vec_width: usize,
    /// Input channels (1 for plain token vectors)
    pub channels: usize,
    /// Number of entities in the embedding table
    pub num_entities: usize,
    /// Entity embedding dimension
    pub dim: usize,
    /// Convolution filter height, along the sequence axis
    pub filter_h: usize,
    /// Convolution filter width, along the vector axis
    pub filter_w: usize,
    /// Corruptions sampled per triple, per slot (subject and object)
    pub negative_samples: usize,
    /// Advisory epoch count for external training loops
    pub epochs: usize,
    /// Fixed batch size for fit and encode
    pub batch_size: usize,
    /// Keep probability for dropout on the pooled encoding during fit
    pub dropout_keep: f64,
}

impl ModelConfig {
    /// Create a configuration from the three shape groups.
    ///
    /// Hyperparameters start at their defaults: 100 negative samples,
    /// 2500 epochs, batch size 50, dropout keep probability 0.5.
    ///
    /// # Arguments
    /// * `input_shape` - Per-sentence shape: [seq_len, vec_width, channels]
    /// * `embedding_shape` - Entity table shape: [num_entities, dim]
    /// * `conv_shape` - Filter shape: [filter_h, filter_w]
    ///
    /// # Example
    /// ```
    /// use distconv::ModelConfig;
    ///
    /// let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31])
    ///     .with_negative_samples(5)
    ///     .with_batch_size(4);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(
        input_shape: [usize; 3],
        embedding_shape: [usize; 2],
        conv_shape: [usize; 2],
    ) -> Self {
        Self {
            seq_len: input_shape[0],
            vec_width: input_shape[1],
            channels: input_shape[2],
            num_entities: embedding_shape[0],
            dim: embedding_shape[1],
            filter_h: conv_shape[0],
            filter_w: conv_shape[1],
            negative_samples: 100,
            epochs: 2500,
            batch_size: 50,
            dropout_keep: 0.5,
        }
    }

    /// Set the number of corruptions sampled per slot.
    pub fn with_negative_samples(mut self, negative_samples: usize) -> Self {
        self.negative_samples = negative_samples;
        self
    }

    /// Set the advisory epoch count.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the fixed batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the dropout keep probability, in (0, 1].
    pub fn with_dropout_keep(mut self, dropout_keep: f64) -> Self {
        self.dropout_keep = dropout_keep;
        self
    }

    /// Width of the pooled encoding under valid padding.
    pub fn encoding_width(&self) -> usize {
        (self.vec_width + 1).saturating_sub(self.filter_w)
    }

    /// Check that the configuration is internally consistent.
    ///
    /// Rejects zero dimensions, filters that do not fit the input, encoding
    /// widths that differ from the embedding dimension, and keep
    /// probabilities outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("seq_len", self.seq_len),
            ("vec_width", self.vec_width),
            ("channels", self.channels),
            ("num_entities", self.num_entities),
            ("dim", self.dim),
            ("filter_h", self.filter_h),
            ("filter_w", self.filter_w),
            ("negative_samples", self.negative_samples),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(DistConvError::Shape(format!("{} must be non-zero", name)));
            }
        }

        if self.filter_h > self.seq_len || self.filter_w > self.vec_width {
            return Err(DistConvError::Shape(format!(
                "filter [{}, {}] does not fit input [{}, {}]",
                self.filter_h, self.filter_w, self.seq_len, self.vec_width
            )));
        }

        let width = self.encoding_width();
        if width != self.dim {
            return Err(DistConvError::Shape(format!(
                "encoding width {} (vec_width {} - filter_w {} + 1) must equal embedding dim {}",
                width, self.vec_width, self.filter_w, self.dim
            )));
        }

        if !(self.dropout_keep > 0.0 && self.dropout_keep <= 1.0) {
            return Err(DistConvError::Shape(format!(
                "dropout_keep must be in (0, 1], got {}",
                self.dropout_keep
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]);
        assert_eq!(config.negative_samples, 100);
        assert_eq!(config.epochs, 2500);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.dropout_keep, 0.5);
    }

    #[test]
    fn test_builders() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31])
            .with_negative_samples(5)
            .with_epochs(10)
            .with_batch_size(4)
            .with_dropout_keep(1.0);
        assert_eq!(config.negative_samples, 5);
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.dropout_keep, 1.0);
    }

    #[test]
    fn test_validate_ok() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]);
        assert!(config.validate().is_ok());
        assert_eq!(config.encoding_width(), 20);
    }

    #[test]
    fn test_validate_rejects_width_mismatch() {
        // A full-width filter pools down to width 1, not 20.
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 50]);
        assert!(matches!(config.validate(), Err(DistConvError::Shape(_))));
    }

    #[test]
    fn test_validate_rejects_zero_dim() {
        let config = ModelConfig::new([10, 50, 0], [1000, 20], [3, 31]);
        assert!(matches!(config.validate(), Err(DistConvError::Shape(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_filter() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [11, 31]);
        assert!(matches!(config.validate(), Err(DistConvError::Shape(_))));
    }

    #[test]
    fn test_validate_rejects_bad_dropout() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]).with_dropout_keep(0.0);
        assert!(matches!(config.validate(), Err(DistConvError::Shape(_))));

        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]).with_dropout_keep(1.5);
        assert!(matches!(config.validate(), Err(DistConvError::Shape(_))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]).with_negative_samples(5);
        let json = serde_json::to_string(&config).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
