//! Convolutional sentence encoder with DistMult scoring.
//!
//! Sentences arrive as `[batch, seq_len, vec_width, channels]` tensors. A
//! single valid-padding convolution plus max-pooling over the sequence axis
//! produces a relation-like vector `r` per sentence, unit length along the
//! embedding axis. Entity pairs are scored bilinearly:
//!
//! `score(s, o) = Σ_d r[d] · E[s][d] · E[o][d]`
//!
//! Training ranks the true pair above sampled corruptions (subject or
//! object, never both) with hinge loss at margin 1, summed over the batch,
//! followed by one adaptive-moment update and entity row renormalization.

use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use tracing::{debug, info, trace};

use crate::batch::TrainBatch;
use crate::error::{DistConvError, Result};
use crate::model::config::ModelConfig;
use crate::model::params::ParamStore;

/// Entity embedding table name in the store and the checkpoint file.
pub const ENTITY_TABLE: &str = "entities";
/// Convolution filter name.
pub const CONV_WEIGHT: &str = "conv/weight";
/// Convolution bias name.
pub const CONV_BIAS: &str = "conv/bias";

/// Standard deviation for truncated-normal parameter init.
const INIT_STD: f64 = 0.1;
/// Initial bias value.
const INIT_BIAS: f64 = 0.1;
/// Ranking margin separating correct from corrupted scores.
const MARGIN: f64 = 1.0;
/// Epsilon guarding the L2 normalization against zero vectors.
const NORM_EPS: f64 = 1e-12;

/// Scores for one batch: the true pair and its sampled corruptions.
#[derive(Debug, Clone)]
pub struct TripleScores {
    /// Score of the true (subject, object) pair: [batch, 1]
    pub correct: Tensor,
    /// Scores of corrupted pairs, subject corruptions then object
    /// corruptions: [batch, 2 * negative_samples]
    pub corrupt: Tensor,
}

/// The encoder-scorer model: config bound to device-resident parameters.
///
/// `fit` takes `&mut self`, so concurrent updates are ruled out at compile
/// time; `encode`, `loss`, and `scores` are read paths.
pub struct CnnDistMult {
    config: ModelConfig,
    params: ParamStore,
    optimizer: AdamW,
    device: Device,
    /// Completed fit steps
    steps: usize,
}

impl CnnDistMult {
    /// Build a model from a configuration.
    ///
    /// Validates the config, allocates the entity table, the convolution
    /// filter, and its bias on `device`, then sets up an AdamW optimizer
    /// (lr 1e-3, betas 0.9/0.999, eps 1e-8, no weight decay) over all three.
    ///
    /// # Example
    /// ```
    /// use candle_core::Device;
    /// use distconv::{CnnDistMult, ModelConfig};
    ///
    /// let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31]);
    /// let model = CnnDistMult::new(config, &Device::Cpu).unwrap();
    /// assert_eq!(model.steps(), 0);
    /// ```
    pub fn new(config: ModelConfig, device: &Device) -> Result<Self> {
        config.validate()?;

        let mut params = ParamStore::new(device);
        params.insert_truncated_normal(
            ENTITY_TABLE,
            &[config.num_entities, config.dim],
            INIT_STD,
        )?;
        // OIHW kernel layout: one output channel over all input channels
        params.insert_truncated_normal(
            CONV_WEIGHT,
            &[1, config.channels, config.filter_h, config.filter_w],
            INIT_STD,
        )?;
        params.insert_constant(CONV_BIAS, &[1], INIT_BIAS)?;

        let optimizer = AdamW::new(
            params.all_vars(),
            ParamsAdamW {
                lr: 1e-3,
                beta1: 0.9,
                beta2: 0.999,
                eps: 1e-8,
                weight_decay: 0.0,
            },
        )?;

        info!(
            entities = config.num_entities,
            dim = config.dim,
            filter_h = config.filter_h,
            filter_w = config.filter_w,
            "initialized cnn-distmult model"
        );

        Ok(Self {
            config,
            params,
            optimizer,
            device: device.clone(),
            steps: 0,
        })
    }

    /// The model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The compute device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Completed fit steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Current entity embedding table: [num_entities, dim].
    pub fn entity_embeddings(&self) -> Result<Tensor> {
        self.params.tensor(ENTITY_TABLE)
    }

    /// Encode sentences into relation vectors: [batch, 1, dim].
    ///
    /// Inference path: no dropout, no parameter updates, no entity access.
    /// Deterministic for identical inputs.
    pub fn encode(&self, sentences: &Tensor) -> Result<Tensor> {
        self.check_sentences(sentences)?;
        self.encode_with(sentences, 1.0)
    }

    /// Score a batch against the current parameters, without dropout.
    pub fn scores(&self, batch: &TrainBatch) -> Result<TripleScores> {
        self.check_batch(batch)?;
        let r = self.encode_with(&batch.sentences, 1.0)?;
        self.score_with(&r, batch)
    }

    /// Evaluate the training objective without updating anything.
    pub fn loss(&self, batch: &TrainBatch) -> Result<f32> {
        let scores = self.scores(batch)?;
        Ok(self.loss_tensor(&scores)?.to_scalar::<f32>()?)
    }

    /// Run one training step on a batch.
    ///
    /// Forward with dropout, hinge ranking loss, backward, one optimizer
    /// step, then entity rows are renormalized to unit length. Returns
    /// `self` so steps can be chained.
    pub fn fit(&mut self, batch: &TrainBatch) -> Result<&mut Self> {
        self.check_batch(batch)?;

        let r = self.encode_with(&batch.sentences, self.config.dropout_keep)?;
        let scores = self.score_with(&r, batch)?;
        let loss = self.loss_tensor(&scores)?;
        self.optimizer.backward_step(&loss)?;

        // Keep entity embeddings on the unit sphere
        self.params.renormalize_rows(ENTITY_TABLE)?;

        self.steps += 1;
        trace!(step = self.steps, "fit step complete");
        Ok(self)
    }

    /// Save all learnable parameters to a safetensors file.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tensors = self.params.to_tensor_map();
        candle_core::safetensors::save(&tensors, path).map_err(|e| {
            DistConvError::Persistence(format!("failed to write {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "saved model checkpoint");
        Ok(())
    }

    /// Restore all learnable parameters from a safetensors file.
    ///
    /// The model must have been constructed with the same configuration the
    /// checkpoint was written under; shape drift is rejected.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loaded = candle_core::safetensors::load(path, &self.device).map_err(|e| {
            DistConvError::Persistence(format!("failed to read {}: {}", path.display(), e))
        })?;
        self.params.load_tensor_map(&loaded)?;
        debug!(path = %path.display(), "loaded model checkpoint");
        Ok(())
    }

    /// Run the convolutional encoder.
    ///
    /// `dropout_keep` below 1.0 samples a fresh dropout mask on the pooled
    /// features; the inference paths pass 1.0 and skip the op.
    fn encode_with(&self, sentences: &Tensor, dropout_keep: f64) -> Result<Tensor> {
        let kernel = self.params.var(CONV_WEIGHT)?.as_tensor();
        let bias = self.params.var(CONV_BIAS)?.as_tensor();

        // NHWC input, NCHW convolution
        let x = sentences.permute((0, 3, 1, 2))?.contiguous()?;

        // Valid padding, unit stride: [batch, 1, seq_len - fh + 1, dim]
        let conv = x.conv2d(kernel, 0, 1, 1, 1)?;
        let activated = conv.broadcast_add(bias)?.relu()?;

        // Drop the channel axis, then max-pool what is left of the sequence
        let features = activated.squeeze(1)?; // [batch, seq, dim]
        let pooled = features.max_keepdim(1)?; // [batch, 1, dim]

        let dropped = if dropout_keep < 1.0 {
            candle_nn::ops::dropout(&pooled, (1.0 - dropout_keep) as f32)?
        } else {
            pooled
        };

        // Unit length along the embedding axis
        let norms = (dropped.sqr()?.sum_keepdim(2)? + NORM_EPS)?.sqrt()?;
        Ok(dropped.broadcast_div(&norms)?)
    }

    /// DistMult scores for the true pair and both corruption sets.
    fn score_with(&self, r: &Tensor, batch: &TrainBatch) -> Result<TripleScores> {
        let es = self
            .params
            .gather(ENTITY_TABLE, &batch.subjects)?
            .unsqueeze(1)?; // [batch, 1, dim]
        let eo = self
            .params
            .gather(ENTITY_TABLE, &batch.objects)?
            .unsqueeze(1)?; // [batch, 1, dim]
        let es_neg = self.params.gather(ENTITY_TABLE, &batch.neg_subjects)?; // [batch, k, dim]
        let eo_neg = self.params.gather(ENTITY_TABLE, &batch.neg_objects)?; // [batch, k, dim]

        let correct = r.mul(&es)?.mul(&eo)?.sum(2)?; // [batch, 1]

        // Corrupt one slot at a time, never both
        let corrupt_subject = es_neg.broadcast_mul(&r.mul(&eo)?)?.sum(2)?; // [batch, k]
        let corrupt_object = eo_neg.broadcast_mul(&r.mul(&es)?)?.sum(2)?; // [batch, k]
        let corrupt = Tensor::cat(&[&corrupt_subject, &corrupt_object], 1)?; // [batch, 2k]

        Ok(TripleScores { correct, corrupt })
    }

    /// Hinge ranking loss over all corrupted pairs, summed.
    fn loss_tensor(&self, scores: &TripleScores) -> Result<Tensor> {
        let violation = (scores.corrupt.broadcast_sub(&scores.correct)? + MARGIN)?;
        Ok(violation.relu()?.sum_all()?)
    }

    fn check_sentences(&self, sentences: &Tensor) -> Result<()> {
        let cfg = &self.config;
        let expected = [cfg.batch_size, cfg.seq_len, cfg.vec_width, cfg.channels];
        if sentences.dims() != expected.as_slice() {
            return Err(DistConvError::DimensionMismatch {
                expected: format!("sentences {:?}", expected),
                got: format!("{:?}", sentences.dims()),
            });
        }
        Ok(())
    }

    fn check_batch(&self, batch: &TrainBatch) -> Result<()> {
        self.check_sentences(&batch.sentences)?;

        let cfg = &self.config;
        let id_shapes = [
            ("subjects", &batch.subjects, vec![cfg.batch_size]),
            ("objects", &batch.objects, vec![cfg.batch_size]),
            (
                "neg_subjects",
                &batch.neg_subjects,
                vec![cfg.batch_size, cfg.negative_samples],
            ),
            (
                "neg_objects",
                &batch.neg_objects,
                vec![cfg.batch_size, cfg.negative_samples],
            ),
        ];
        for (name, tensor, expected) in id_shapes {
            if tensor.dims() != expected.as_slice() {
                return Err(DistConvError::DimensionMismatch {
                    expected: format!("{} {:?}", name, expected),
                    got: format!("{:?}", tensor.dims()),
                });
            }
        }
        Ok(())
    }
}
