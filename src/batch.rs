//! Training batch construction.
//!
//! A batch pairs a sentence tensor with the entity pair it mentions and the
//! negative ids sampled for ranking. Sentences are F32, ids are U32 (candle's
//! gather index type). Ids are not range checked here; an out-of-range id
//! surfaces when the entity table is gathered.

use candle_core::{Device, Tensor};

use crate::error::{DistConvError, Result};

/// One training batch: sentences plus true and corrupted entity ids.
#[derive(Debug, Clone)]
pub struct TrainBatch {
    /// Sentence tensors: [batch, seq_len, vec_width, channels], F32
    pub sentences: Tensor,
    /// True subject ids: [batch], U32
    pub subjects: Tensor,
    /// True object ids: [batch], U32
    pub objects: Tensor,
    /// Sampled subject corruptions: [batch, negative_samples], U32
    pub neg_subjects: Tensor,
    /// Sampled object corruptions: [batch, negative_samples], U32
    pub neg_objects: Tensor,
}

impl TrainBatch {
    /// Wrap caller-built tensors into a batch.
    pub fn new(
        sentences: Tensor,
        subjects: Tensor,
        objects: Tensor,
        neg_subjects: Tensor,
        neg_objects: Tensor,
    ) -> Self {
        Self {
            sentences,
            subjects,
            objects,
            neg_subjects,
            neg_objects,
        }
    }

    /// Build a batch from host data.
    ///
    /// # Arguments
    /// * `batch` - Number of triples in the batch
    /// * `sentence_dims` - Per-sentence shape: [seq_len, vec_width, channels]
    /// * `negative_samples` - Corruptions sampled per triple, per slot
    /// * `sentences` - `batch * seq_len * vec_width * channels` values, row-major
    /// * `subjects`, `objects` - `batch` ids each
    /// * `neg_subjects`, `neg_objects` - `batch * negative_samples` ids each, row-major
    #[allow(clippy::too_many_arguments)]
    pub fn from_slices(
        batch: usize,
        sentence_dims: [usize; 3],
        negative_samples: usize,
        sentences: &[f32],
        subjects: &[u32],
        objects: &[u32],
        neg_subjects: &[u32],
        neg_objects: &[u32],
        device: &Device,
    ) -> Result<Self> {
        let [m, n, c] = sentence_dims;

        let check = |name: &str, got: usize, expected: usize| -> Result<()> {
            if got != expected {
                return Err(DistConvError::DimensionMismatch {
                    expected: format!("{} {} values", expected, name),
                    got: format!("{}", got),
                });
            }
            Ok(())
        };
        check("sentence", sentences.len(), batch * m * n * c)?;
        check("subject", subjects.len(), batch)?;
        check("object", objects.len(), batch)?;
        check("negative subject", neg_subjects.len(), batch * negative_samples)?;
        check("negative object", neg_objects.len(), batch * negative_samples)?;

        let sentences = Tensor::from_vec(sentences.to_vec(), (batch, m, n, c), device)?;
        let subjects = Tensor::from_vec(subjects.to_vec(), (batch,), device)?;
        let objects = Tensor::from_vec(objects.to_vec(), (batch,), device)?;
        let neg_subjects =
            Tensor::from_vec(neg_subjects.to_vec(), (batch, negative_samples), device)?;
        let neg_objects =
            Tensor::from_vec(neg_objects.to_vec(), (batch, negative_samples), device)?;

        Ok(Self::new(
            sentences,
            subjects,
            objects,
            neg_subjects,
            neg_objects,
        ))
    }

    /// Batch size taken from the sentence tensor.
    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.sentences.dim(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    #[test]
    fn test_from_slices_shapes() {
        let device = Device::Cpu;
        let batch = TrainBatch::from_slices(
            2,
            [3, 4, 1],
            2,
            &vec![0.0; 2 * 3 * 4],
            &[0, 1],
            &[2, 3],
            &[4, 5, 6, 7],
            &[8, 9, 10, 11],
            &device,
        )
        .unwrap();

        assert_eq!(batch.sentences.dims(), &[2, 3, 4, 1]);
        assert_eq!(batch.subjects.dims(), &[2]);
        assert_eq!(batch.objects.dims(), &[2]);
        assert_eq!(batch.neg_subjects.dims(), &[2, 2]);
        assert_eq!(batch.neg_objects.dims(), &[2, 2]);
        assert_eq!(batch.subjects.dtype(), DType::U32);
        assert_eq!(batch.sentences.dtype(), DType::F32);
        assert_eq!(batch.batch_size().unwrap(), 2);
    }

    #[test]
    fn test_from_slices_rejects_short_ids() {
        let device = Device::Cpu;
        let result = TrainBatch::from_slices(
            2,
            [3, 4, 1],
            2,
            &vec![0.0; 2 * 3 * 4],
            &[0],
            &[2, 3],
            &[4, 5, 6, 7],
            &[8, 9, 10, 11],
            &device,
        );
        assert!(matches!(
            result,
            Err(DistConvError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_from_slices_rejects_short_sentences() {
        let device = Device::Cpu;
        let result = TrainBatch::from_slices(
            2,
            [3, 4, 1],
            2,
            &vec![0.0; 5],
            &[0, 1],
            &[2, 3],
            &[4, 5, 6, 7],
            &[8, 9, 10, 11],
            &device,
        );
        assert!(matches!(
            result,
            Err(DistConvError::DimensionMismatch { .. })
        ));
    }
}
