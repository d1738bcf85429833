//! distconv: knowledge base embeddings from sentence convolutions.
//!
//! A single-layer CNN turns a sentence tensor into a relation-like vector
//! `r`, which scores entity pairs bilinearly (DistMult):
//!
//! `score(s, o) = Σ_d r[d] · E[s][d] · E[o][d]`
//!
//! Training ranks each true pair above sampled corruptions (subject or
//! object, never both) by a margin of 1, with hinge loss summed over the
//! batch. Entity embeddings are kept on the unit sphere.
//!
//! # Example
//!
//! ```
//! use candle_core::Device;
//! use distconv::{CnnDistMult, ModelConfig, TrainBatch};
//!
//! let device = Device::Cpu;
//! let config = ModelConfig::new([10, 50, 1], [1000, 20], [3, 31])
//!     .with_negative_samples(5)
//!     .with_batch_size(2);
//!
//! let mut model = CnnDistMult::new(config, &device).unwrap();
//! let batch = TrainBatch::from_slices(
//!     2,
//!     [10, 50, 1],
//!     5,
//!     &vec![0.25; 2 * 10 * 50],
//!     &[0, 1],
//!     &[2, 3],
//!     &vec![4; 10],
//!     &vec![5; 10],
//!     &device,
//! )
//! .unwrap();
//!
//! model.fit(&batch).unwrap();
//! let r = model.encode(&batch.sentences).unwrap();
//! assert_eq!(r.dims(), &[2, 1, 20]);
//! ```

pub mod batch;
pub mod error;
pub mod model;

pub use batch::TrainBatch;
pub use error::{DistConvError, Result};
pub use model::{CnnDistMult, ModelConfig, ParamStore, TripleScores};
