//! Named parameter store with gradient-tracked variables.
//!
//! Parameters live in an insertion-ordered registry so optimizer
//! registration and checkpoint layout are deterministic. Row gathers go
//! through `index_select`, which keeps the table visible to autodiff.

use std::collections::HashMap;

use candle_core::{Device, Tensor, Var};
use indexmap::IndexMap;
use rand_distr::{Distribution, Normal};

use crate::error::{DistConvError, Result};

/// Registry of learnable parameters for one model instance.
pub struct ParamStore {
    device: Device,
    params: IndexMap<String, Var>,
}

impl ParamStore {
    /// Create an empty store on the given device.
    pub fn new(device: &Device) -> Self {
        Self {
            device: device.clone(),
            params: IndexMap::new(),
        }
    }

    /// Get the device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Register a parameter drawn from a truncated normal distribution.
    ///
    /// Samples come from N(0, std²) and are redrawn while they fall outside
    /// two standard deviations.
    pub fn insert_truncated_normal(
        &mut self,
        name: &str,
        shape: &[usize],
        std: f64,
    ) -> Result<()> {
        let normal = Normal::new(0.0, std)
            .map_err(|e| DistConvError::Shape(format!("invalid init std {}: {}", std, e)))?;
        let mut rng = rand::thread_rng();
        let bound = 2.0 * std;

        let n_elements: usize = shape.iter().product();
        let mut data: Vec<f32> = Vec::with_capacity(n_elements);
        while data.len() < n_elements {
            let x: f64 = normal.sample(&mut rng);
            if x.abs() <= bound {
                data.push(x as f32);
            }
        }

        let tensor = Tensor::from_vec(data, shape, &self.device)?;
        self.insert_var(name, &tensor)
    }

    /// Register a parameter filled with a constant.
    pub fn insert_constant(&mut self, name: &str, shape: &[usize], value: f64) -> Result<()> {
        let tensor = Tensor::full(value as f32, shape, &self.device)?;
        self.insert_var(name, &tensor)
    }

    fn insert_var(&mut self, name: &str, tensor: &Tensor) -> Result<()> {
        let var = Var::from_tensor(tensor)?;
        self.params.insert(name.to_string(), var);
        Ok(())
    }

    /// Get a parameter variable by name.
    pub fn var(&self, name: &str) -> Result<&Var> {
        self.params
            .get(name)
            .ok_or_else(|| DistConvError::UnknownParam(name.to_string()))
    }

    /// Get a parameter's current value.
    pub fn tensor(&self, name: &str) -> Result<Tensor> {
        Ok(self.var(name)?.as_tensor().clone())
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// All variables, in registration order, for optimizer construction.
    pub fn all_vars(&self) -> Vec<Var> {
        self.params.values().cloned().collect()
    }

    /// Gather rows of a 2-D parameter by id.
    ///
    /// Ids may have any shape; each id is replaced by its row, giving the
    /// result shape `ids.shape() + [row_width]`.
    pub fn gather(&self, name: &str, ids: &Tensor) -> Result<Tensor> {
        let table = self.var(name)?.as_tensor();
        let row_width = table.dim(1)?;

        let mut out_shape = ids.dims().to_vec();
        out_shape.push(row_width);

        let flat = ids.flatten_all()?;
        let rows = table.index_select(&flat, 0)?;
        Ok(rows.reshape(out_shape)?)
    }

    /// Project every row of a 2-D parameter onto the unit sphere.
    ///
    /// The write-back goes through `Var::set` on a detached tensor, so the
    /// normalization itself never enters the autodiff graph.
    pub fn renormalize_rows(&self, name: &str) -> Result<()> {
        let var = self.var(name)?;
        let rows = var.as_tensor().detach();
        let norms = (rows.sqr()?.sum_keepdim(1)? + 1e-12)?.sqrt()?;
        let normalized = rows.broadcast_div(&norms)?;
        var.set(&normalized)?;
        Ok(())
    }

    /// Collect all parameters for checkpointing.
    pub fn to_tensor_map(&self) -> HashMap<String, Tensor> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.as_tensor().clone()))
            .collect()
    }

    /// Overwrite parameter values from a checkpoint map.
    ///
    /// Every registered parameter must be present with its exact shape.
    /// Extra tensors in the map are ignored.
    pub fn load_tensor_map(&self, map: &HashMap<String, Tensor>) -> Result<()> {
        for (name, var) in &self.params {
            let tensor = map.get(name).ok_or_else(|| {
                DistConvError::Persistence(format!("checkpoint is missing tensor '{}'", name))
            })?;
            if tensor.dims() != var.as_tensor().dims() {
                return Err(DistConvError::Persistence(format!(
                    "checkpoint tensor '{}' has shape {:?}, expected {:?}",
                    name,
                    tensor.dims(),
                    var.as_tensor().dims()
                )));
            }
            var.set(tensor)?;
        }
        Ok(())
    }
}
