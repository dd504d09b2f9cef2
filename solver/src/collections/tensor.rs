use std::ops::{Index, IndexMut};

/// A dense multi-dimensional array with a shape fixed at construction.
///
/// Storage is row-major (last axis contiguous). Indexing is by an
/// `[usize; D]` coordinate and is constant-time; the whole content can be
/// reset in bulk with [`Tensor::fill`] or [`Tensor::copy_from`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor<T, const D: usize> {
    shape: [usize; D],
    strides: [usize; D],
    data: Vec<T>,
}

pub type Tensor2<T> = Tensor<T, 2>;
pub type Tensor3<T> = Tensor<T, 3>;
pub type Tensor4<T> = Tensor<T, 4>;

impl<T: Copy, const D: usize> Tensor<T, D> {
    pub fn filled(shape: [usize; D], value: T) -> Tensor<T, D> {
        let mut strides = [1; D];
        for d in (0..D - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }
        let len = shape.iter().product();
        Tensor {
            shape,
            strides,
            data: vec![value; len],
        }
    }

    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrites the content with the one of `other`. Shapes must match.
    pub fn copy_from(&mut self, other: &Tensor<T, D>) {
        debug_assert_eq!(self.shape, other.shape);
        self.data.copy_from_slice(&other.data);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    #[inline]
    fn offset(&self, index: [usize; D]) -> usize {
        let mut off = 0;
        for d in 0..D {
            debug_assert!(index[d] < self.shape[d], "index out of bounds on axis {d}");
            off += index[d] * self.strides[d];
        }
        off
    }
}

impl<T: Copy + Default, const D: usize> Tensor<T, D> {
    pub fn zeroed(shape: [usize; D]) -> Tensor<T, D> {
        Self::filled(shape, T::default())
    }
}

impl<T: Copy, const D: usize> Index<[usize; D]> for Tensor<T, D> {
    type Output = T;

    #[inline]
    fn index(&self, index: [usize; D]) -> &T {
        &self.data[self.offset(index)]
    }
}

impl<T: Copy, const D: usize> IndexMut<[usize; D]> for Tensor<T, D> {
    #[inline]
    fn index_mut(&mut self, index: [usize; D]) -> &mut T {
        let off = self.offset(index);
        &mut self.data[off]
    }
}
