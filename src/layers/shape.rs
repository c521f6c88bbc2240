//! Shape-assertion helpers invoked at block boundaries.
//!
//! Every additive fusion in the network goes through [`ensure_same_shape`] and
//! every block entry through [`ensure_channels`], so wiring defects surface as
//! a [`NetworkError`] naming the junction instead of a backend panic.

use burn::tensor::{Tensor, backend::Backend};

use crate::errors::NetworkError;

/// Checks that the channel dimension of `tensor` equals `expected`.
pub fn ensure_channels<B: Backend>(
    junction: &str,
    tensor: &Tensor<B, 4>,
    expected: usize,
) -> Result<(), NetworkError> {
    let actual = tensor.dims()[1];
    if actual != expected {
        return Err(NetworkError::ChannelMismatch {
            junction: junction.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Checks that two addends share batch, channel and spatial dimensions.
pub fn ensure_same_shape<B: Backend>(
    junction: &str,
    left: &Tensor<B, 4>,
    right: &Tensor<B, 4>,
) -> Result<(), NetworkError> {
    let (left, right) = (left.dims(), right.dims());
    if left != right {
        return Err(NetworkError::ShapeMismatch {
            junction: junction.to_string(),
            left,
            right,
        });
    }
    Ok(())
}

/// Adds two tensors after checking their shapes agree.
pub fn checked_add<B: Backend>(
    junction: &str,
    left: Tensor<B, 4>,
    right: Tensor<B, 4>,
) -> Result<Tensor<B, 4>, NetworkError> {
    ensure_same_shape(junction, &left, &right)?;
    Ok(left + right)
}

/// Spatial output size of a convolution along one axis.
pub fn conv_output_size(input: usize, kernel: usize, stride: usize, padding: usize) -> usize {
    (input + 2 * padding).saturating_sub(kernel) / stride + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_ensure_channels_reports_expected_and_actual() {
        let device = <TestBackend as Backend>::Device::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);

        assert!(ensure_channels("stem", &tensor, 3).is_ok());
        match ensure_channels("stem", &tensor, 4) {
            Err(NetworkError::ChannelMismatch {
                junction,
                expected,
                actual,
            }) => {
                assert_eq!(junction, "stem");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected channel mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_checked_add_rejects_spatial_mismatch() {
        let device = <TestBackend as Backend>::Device::default();
        let a = Tensor::<TestBackend, 4>::ones([1, 2, 4, 4], &device);
        let b = Tensor::<TestBackend, 4>::ones([1, 2, 4, 6], &device);

        let result = checked_add("skip", a.clone(), b);
        assert!(matches!(result, Err(NetworkError::ShapeMismatch { .. })));

        let sum = checked_add("skip", a.clone(), a).unwrap();
        let values: Vec<f32> = sum.to_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (*v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_conv_output_size() {
        assert_eq!(conv_output_size(32, 5, 1, 2), 32);
        assert_eq!(conv_output_size(32, 5, 2, 2), 16);
        assert_eq!(conv_output_size(32, 3, 2, 1), 16);
        assert_eq!(conv_output_size(33, 5, 2, 2), 17);
        assert_eq!(conv_output_size(33, 3, 2, 1), 17);
    }
}
