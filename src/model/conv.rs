//! Convolutional layer wrappers owning their kernels

use crate::autograd::ops::{conv1d, conv2d, conv2d_output_dims, Padding};
use crate::autograd::Tensor;

/// 2D convolution layer
pub struct Conv2dLayer {
    /// Kernel (c_out x c_in x k x k)
    pub kernel: Tensor,
    /// Bias (c_out)
    pub bias: Tensor,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
    padding: Padding,
}

impl Conv2dLayer {
    pub fn new(c_in: usize, c_out: usize, kernel_size: usize, padding: Padding, phase: f32) -> Self {
        let fan = c_in * kernel_size * kernel_size + c_out;
        let scale = (2.0 / fan as f32).sqrt();
        Self {
            kernel: Tensor::from_vec(
                (0..c_out * c_in * kernel_size * kernel_size)
                    .map(|i| (i as f32 * phase).sin() * scale)
                    .collect(),
                true,
            ),
            bias: Tensor::zeros(c_out, true),
            c_in,
            c_out,
            kernel_size,
            padding,
        }
    }

    /// Forward pass; returns the output map and its spatial dims
    pub fn forward(&self, x: &Tensor, height: usize, width: usize) -> (Tensor, usize, usize) {
        let out = conv2d(
            x,
            &self.kernel,
            &self.bias,
            height,
            width,
            self.c_in,
            self.c_out,
            self.kernel_size,
            self.padding,
        );
        let (out_h, out_w) = conv2d_output_dims(height, width, self.kernel_size, self.padding);
        (out, out_h, out_w)
    }

    pub fn out_channels(&self) -> usize {
        self.c_out
    }
}

/// 1D convolution layer (valid padding)
pub struct Conv1dLayer {
    /// Kernel (c_out x c_in x k)
    pub kernel: Tensor,
    /// Bias (c_out)
    pub bias: Tensor,
    c_in: usize,
    c_out: usize,
    kernel_size: usize,
}

impl Conv1dLayer {
    pub fn new(c_in: usize, c_out: usize, kernel_size: usize, phase: f32) -> Self {
        let fan = c_in * kernel_size + c_out;
        let scale = (2.0 / fan as f32).sqrt();
        Self {
            kernel: Tensor::from_vec(
                (0..c_out * c_in * kernel_size)
                    .map(|i| (i as f32 * phase).sin() * scale)
                    .collect(),
                true,
            ),
            bias: Tensor::zeros(c_out, true),
            c_in,
            c_out,
            kernel_size,
        }
    }

    /// Forward pass; returns the output sequence and its step count
    pub fn forward(&self, x: &Tensor, steps: usize) -> (Tensor, usize) {
        let out = conv1d(
            x,
            &self.kernel,
            &self.bias,
            steps,
            self.c_in,
            self.c_out,
            self.kernel_size,
        );
        (out, steps - self.kernel_size + 1)
    }

    pub fn out_channels(&self) -> usize {
        self.c_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv2d_layer_valid_dims() {
        let layer = Conv2dLayer::new(1, 32, 3, Padding::Valid, 0.257);
        let x = Tensor::from_vec(vec![0.1; 10 * 12], false);
        let (out, h, w) = layer.forward(&x, 10, 12);

        assert_eq!((h, w), (8, 10));
        assert_eq!(out.len(), 8 * 10 * 32);
    }

    #[test]
    fn test_conv2d_layer_same_dims() {
        let layer = Conv2dLayer::new(3, 8, 3, Padding::Same, 0.257);
        let x = Tensor::from_vec(vec![0.1; 6 * 6 * 3], false);
        let (out, h, w) = layer.forward(&x, 6, 6);

        assert_eq!((h, w), (6, 6));
        assert_eq!(out.len(), 6 * 6 * 8);
    }

    #[test]
    fn test_conv1d_layer_dims() {
        let layer = Conv1dLayer::new(4, 16, 5, 0.173);
        let x = Tensor::from_vec(vec![0.1; 20 * 4], false);
        let (out, steps) = layer.forward(&x, 20);

        assert_eq!(steps, 16);
        assert_eq!(out.len(), 16 * 16);
    }

    #[test]
    fn test_kernels_require_grad() {
        let layer = Conv2dLayer::new(1, 4, 3, Padding::Valid, 0.257);
        assert!(layer.kernel.requires_grad());
        assert!(layer.bias.requires_grad());
    }
}
