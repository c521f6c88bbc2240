//! Activation functions used between convolutions.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Supported activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// No activation (identity function).
    #[default]
    None,
    /// Rectified Linear Unit: f(x) = max(0, x)
    Relu,
}

impl Activation {
    /// Applies the activation function to a tensor.
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
        }
    }

    /// Converts activation to a numeric ID for storage in Module.
    pub fn to_id(&self) -> u8 {
        match self {
            Activation::None => 0,
            Activation::Relu => 1,
        }
    }

    /// Creates an Activation from a numeric ID.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Activation::Relu,
            _ => Activation::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_activation_id_roundtrip() {
        for act in [Activation::None, Activation::Relu] {
            assert_eq!(Activation::from_id(act.to_id()), act);
        }
    }

    #[test]
    fn test_relu_on_4d_tensor() {
        use burn::tensor::backend::Backend;
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-2.0, -0.5, 0.0, 0.5, 3.0], &device)
            .reshape([1, 1, 1, 5]);
        let output = Activation::Relu.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert_eq!(result, vec![0.0, 0.0, 0.0, 0.5, 3.0]);
    }

    #[test]
    fn test_none_is_identity() {
        use burn::tensor::backend::Backend;
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-1.0, 2.0], &device);
        let output = Activation::None.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert_eq!(result, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_activation_serde_names() {
        let json = serde_json::to_string(&Activation::Relu).unwrap();
        assert_eq!(json, "\"RELU\"");
        let parsed: Activation = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(parsed, Activation::None);
    }
}
