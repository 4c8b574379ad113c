use std::fmt;
use wide::f32x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl TensorShape {
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Shape of a single-channel depth (or inverse depth) map batch.
    pub fn map(batch: usize, height: usize, width: usize) -> Self {
        Self::new(batch, 1, height, width)
    }

    pub fn hw(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn bchw(&self) -> (usize, usize, usize, usize) {
        (self.batch, self.channels, self.height, self.width)
    }

    /// Same batch and channel count with a new spatial size.
    pub fn with_hw(&self, height: usize, width: usize) -> Self {
        Self::new(self.batch, self.channels, height, width)
    }

    pub fn with_channels(&self, channels: usize) -> Self {
        Self::new(self.batch, channels, self.height, self.width)
    }

    /// Number of elements in one `(height, width)` plane.
    pub fn plane_len(&self) -> usize {
        self.height.saturating_mul(self.width)
    }

    /// Number of elements in one batch item.
    pub fn item_len(&self) -> usize {
        self.channels.saturating_mul(self.plane_len())
    }

    pub fn len(&self) -> usize {
        self.batch.saturating_mul(self.item_len())
    }

    pub fn checked_len(&self) -> Option<usize> {
        self.batch
            .checked_mul(self.channels)
            .and_then(|partial| partial.checked_mul(self.height))
            .and_then(|partial| partial.checked_mul(self.width))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_single_channel(&self) -> bool {
        self.channels == 1
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.batch, self.channels, self.height, self.width
        )
    }
}

/// Dense 4-D array in **BCHW** (batch, channel, height, width) layout.
///
/// Data is stored contiguously with width as the fastest-varying axis. The
/// element at `(b, c, h, w)` lives at
/// `((b * C + c) * H + h) * W + w`.
///
/// Depth maps, inverse depth maps and RGB batches all share this type; depth
/// style maps carry exactly one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T = f32> {
    data: Vec<T>,
    shape: TensorShape,
}

pub type DepthMap = Tensor<f32>;
pub type InverseDepthMap = Tensor<f32>;

impl<T: Copy + fmt::Debug + 'static> Tensor<T> {
    pub fn from_vec(data: Vec<T>, shape: TensorShape) -> crate::Result<Self> {
        let expected = shape.checked_len().ok_or_else(|| {
            crate::Error::InvalidInput(format!("Tensor shape {shape} overflows usize"))
        })?;
        if data.len() != expected {
            return Err(crate::Error::DimensionMismatch(format!(
                "Data size mismatch: got {}, expected {} for shape {}",
                data.len(),
                expected,
                shape
            )));
        }
        Ok(Self { data, shape })
    }

    /// Build a tensor by evaluating `f(b, c, h, w)` for every element.
    pub fn from_fn<F>(shape: TensorShape, f: F) -> Self
    where
        F: Fn(usize, usize, usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(shape.len());
        for b in 0..shape.batch {
            for c in 0..shape.channels {
                for h in 0..shape.height {
                    for w in 0..shape.width {
                        data.push(f(b, c, h, w));
                    }
                }
            }
        }
        Self { data, shape }
    }

    pub fn full(shape: TensorShape, value: T) -> Self {
        Self {
            data: vec![value; shape.len()],
            shape,
        }
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, b: usize, c: usize, h: usize, w: usize) -> usize {
        ((b * self.shape.channels + c) * self.shape.height + h) * self.shape.width + w
    }

    fn check_bounds(&self, b: usize, c: usize, h: usize, w: usize) -> crate::Result<()> {
        if b >= self.shape.batch
            || c >= self.shape.channels
            || h >= self.shape.height
            || w >= self.shape.width
        {
            return Err(crate::Error::InvalidInput(format!(
                "Index ({b}, {c}, {h}, {w}) out of bounds for shape {}",
                self.shape
            )));
        }
        Ok(())
    }

    pub fn index(&self, b: usize, c: usize, h: usize, w: usize) -> crate::Result<T> {
        self.check_bounds(b, c, h, w)?;
        Ok(self.data[self.offset(b, c, h, w)])
    }

    pub fn index_mut(&mut self, b: usize, c: usize, h: usize, w: usize) -> crate::Result<&mut T> {
        self.check_bounds(b, c, h, w)?;
        let idx = self.offset(b, c, h, w);
        Ok(&mut self.data[idx])
    }

    /// Contiguous `(height, width)` plane for batch item `b`, channel `c`.
    pub fn plane(&self, b: usize, c: usize) -> &[T] {
        let start = self.offset(b, c, 0, 0);
        &self.data[start..start + self.shape.plane_len()]
    }

    /// All channels of batch item `b`.
    pub fn item(&self, b: usize) -> &[T] {
        let len = self.shape.item_len();
        &self.data[b * len..(b + 1) * len]
    }

    /// Stack tensors along the batch axis. All inputs must share C, H and W.
    pub fn concat_batch(tensors: &[&Self]) -> crate::Result<Self> {
        let first = tensors.first().ok_or_else(|| {
            crate::Error::InvalidInput("Cannot concat empty tensor list".into())
        })?;
        let mut new_shape = first.shape;
        new_shape.batch = 0;
        for (i, t) in tensors.iter().enumerate() {
            if (t.shape.channels, t.shape.height, t.shape.width)
                != (first.shape.channels, first.shape.height, first.shape.width)
            {
                return Err(crate::Error::DimensionMismatch(format!(
                    "Shape mismatch at index {}: {} vs {}",
                    i, t.shape, first.shape
                )));
            }
            new_shape.batch += t.shape.batch;
        }

        let mut new_data = Vec::with_capacity(new_shape.len());
        for t in tensors {
            new_data.extend_from_slice(&t.data);
        }
        Self::from_vec(new_data, new_shape)
    }

    pub fn map<U, F>(&self, f: F) -> Tensor<U>
    where
        U: Copy + fmt::Debug + 'static,
        F: Fn(T) -> U,
    {
        Tensor {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape,
        }
    }

    pub fn ensure_same_shape<U>(&self, other: &Tensor<U>) -> crate::Result<()> {
        if self.shape != other.shape {
            return Err(crate::Error::DimensionMismatch(format!(
                "Tensor shape mismatch: {} vs {}",
                self.shape, other.shape
            )));
        }
        Ok(())
    }
}

impl<T: Copy + Default + fmt::Debug + 'static> Tensor<T> {
    pub fn zeros(shape: TensorShape) -> Self {
        Self::full(shape, T::default())
    }
}

impl Tensor<f32> {
    pub fn ones(shape: TensorShape) -> Self {
        Self::full(shape, 1.0)
    }

    /// Apply a SIMD lane operation over two equally shaped tensors, with a
    /// scalar fallback for the remainder.
    fn simd_binary<V, S>(&self, other: &Self, lanes: V, scalar: S) -> crate::Result<Self>
    where
        V: Fn(f32x8, f32x8) -> f32x8,
        S: Fn(f32, f32) -> f32,
    {
        self.ensure_same_shape(other)?;
        let a = self.as_slice();
        let b = other.as_slice();
        let mut res = vec![0.0f32; a.len()];

        {
            let mut a_chunks = a.chunks_exact(8);
            let mut b_chunks = b.chunks_exact(8);
            let mut res_chunks = res.chunks_exact_mut(8);

            for ((a8, b8), r8) in (&mut a_chunks).zip(&mut b_chunks).zip(&mut res_chunks) {
                let mut va = [0.0f32; 8];
                let mut vb = [0.0f32; 8];
                va.copy_from_slice(a8);
                vb.copy_from_slice(b8);
                let vr = lanes(f32x8::new(va), f32x8::new(vb));
                r8.copy_from_slice(&<[f32; 8]>::from(vr));
            }

            let rem_a = a_chunks.remainder();
            let rem_b = b_chunks.remainder();
            let rem_res = res_chunks.into_remainder();

            for i in 0..rem_a.len() {
                rem_res[i] = scalar(rem_a[i], rem_b[i]);
            }
        }

        Self::from_vec(res, self.shape)
    }

    /// SIMD-accelerated element-wise addition.
    pub fn add(&self, other: &Self) -> crate::Result<Self> {
        self.simd_binary(other, |a, b| a + b, |a, b| a + b)
    }

    /// SIMD-accelerated element-wise multiplication.
    pub fn mul(&self, other: &Self) -> crate::Result<Self> {
        self.simd_binary(other, |a, b| a * b, |a, b| a * b)
    }

    /// SIMD-accelerated element-wise maximum.
    pub fn maximum(&self, other: &Self) -> crate::Result<Self> {
        self.simd_binary(other, |a, b| a.max(b), f32::max)
    }

    /// SIMD-accelerated element-wise minimum.
    pub fn minimum(&self, other: &Self) -> crate::Result<Self> {
        self.simd_binary(other, |a, b| a.min(b), f32::min)
    }

    pub fn scale(&self, factor: f32) -> Self {
        self.map(|v| v * factor)
    }

    /// Mean over all elements, accumulated in f64.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64) as f32
    }

    /// Mean of every `(height, width)` plane, in `(b, c)` order.
    pub fn plane_means(&self) -> Vec<f32> {
        let plane = self.shape.plane_len();
        if plane == 0 {
            return vec![0.0; self.shape.batch * self.shape.channels];
        }
        self.data
            .chunks(plane)
            .map(|p| (p.iter().map(|&v| v as f64).sum::<f64>() / plane as f64) as f32)
            .collect()
    }

}

impl<T: Copy + fmt::Debug + 'static> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{}", self.shape)
    }
}
