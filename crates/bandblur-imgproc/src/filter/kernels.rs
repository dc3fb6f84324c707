use super::FilterError;

/// A square convolution kernel with an odd side length.
///
/// Weights are stored row-major: the weight at `(row, col)` is applied to the
/// source pixel `row - half_size` rows and `col - half_size` columns away from
/// the output pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Create a kernel from its side length and row-major weights.
    ///
    /// # Arguments
    ///
    /// * `size` - The side length of the kernel. Must be odd.
    /// * `weights` - The `size * size` weights of the kernel.
    ///
    /// # Errors
    ///
    /// If the size is zero or even, or the number of weights is not `size * size`.
    pub fn new(size: usize, weights: Vec<f32>) -> Result<Self, FilterError> {
        if size == 0 {
            return Err(FilterError::EmptyKernel);
        }
        if size % 2 == 0 {
            return Err(FilterError::EvenKernelSize(size));
        }
        if weights.len() != size * size {
            return Err(FilterError::InvalidKernelWeights(
                size,
                size * size,
                weights.len(),
            ));
        }
        Ok(Self { size, weights })
    }

    /// Create a kernel from a flat list of weights, inferring the side length.
    ///
    /// The number of weights must be the square of an odd number.
    pub fn from_weights(weights: Vec<f32>) -> Result<Self, FilterError> {
        let size = (weights.len() as f64).sqrt().round() as usize;
        if size * size != weights.len() {
            return Err(FilterError::InvalidKernelWeights(
                size,
                size * size,
                weights.len(),
            ));
        }
        Self::new(size, weights)
    }

    /// The 1x1 kernel that leaves every pixel unchanged.
    pub fn identity() -> Self {
        Self {
            size: 1,
            weights: vec![1.0],
        }
    }

    /// The side length of the kernel.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The distance between the center cell and the border of the kernel.
    pub fn half_size(&self) -> usize {
        self.size / 2
    }

    /// The row-major weights of the kernel.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// The weight at `(row, col)` of the kernel grid.
    #[inline]
    pub fn weight(&self, row: usize, col: usize) -> f32 {
        self.weights[row * self.size + col]
    }

    /// The sum of all the weights.
    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }
}

/// Create a square box blur kernel.
///
/// Every weight is `1 / kernel_size²`, computed in double precision and then
/// narrowed, so the weights sum to one up to single precision.
///
/// # Arguments
///
/// * `kernel_size` - The side length of the kernel. Must be odd.
///
/// # Example
///
/// ```
/// use bandblur_imgproc::filter::kernels::box_blur_kernel_2d;
///
/// let kernel = box_blur_kernel_2d(3).unwrap();
/// assert_eq!(kernel.size(), 3);
/// assert_eq!(kernel.weight(1, 1), 1.0 / 9.0);
/// ```
pub fn box_blur_kernel_2d(kernel_size: usize) -> Result<Kernel, FilterError> {
    let cells = kernel_size * kernel_size;
    let weight = (1.0f64 / cells as f64) as f32;
    Kernel::new(kernel_size, vec![weight; cells])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_blur_kernel_2d() -> Result<(), FilterError> {
        let kernel = box_blur_kernel_2d(5)?;
        assert_eq!(kernel.size(), 5);
        assert_eq!(kernel.half_size(), 2);
        assert_eq!(kernel.weights().len(), 25);
        assert!(kernel.weights().iter().all(|&w| w == 1.0 / 25.0));
        assert!((kernel.sum() - 1.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_kernel_validation() {
        assert_eq!(Kernel::new(0, vec![]), Err(FilterError::EmptyKernel));
        assert_eq!(
            Kernel::new(2, vec![0.25; 4]),
            Err(FilterError::EvenKernelSize(2))
        );
        assert_eq!(
            Kernel::new(3, vec![0.0; 8]),
            Err(FilterError::InvalidKernelWeights(3, 9, 8))
        );
        assert_eq!(box_blur_kernel_2d(4), Err(FilterError::EvenKernelSize(4)));
    }

    #[test]
    fn test_kernel_from_weights() -> Result<(), FilterError> {
        let kernel = Kernel::from_weights(vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0])?;
        assert_eq!(kernel.size(), 3);
        assert_eq!(kernel.weight(1, 1), 1.0);

        assert!(Kernel::from_weights(vec![1.0; 5]).is_err());
        assert_eq!(
            Kernel::from_weights(vec![1.0; 4]),
            Err(FilterError::EvenKernelSize(2))
        );
        Ok(())
    }

    #[test]
    fn test_identity_kernel() {
        let kernel = Kernel::identity();
        assert_eq!(kernel.size(), 1);
        assert_eq!(kernel.half_size(), 0);
        assert_eq!(kernel.weights(), &[1.0]);
    }
}
