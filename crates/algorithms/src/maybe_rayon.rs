//! Row iteration that is parallel with the `parallel` feature and
//! sequential without it.
//!
//! Operations write `(0..rows).into_par_iter()` either way; without rayon
//! the call resolves to a plain `Iterator` and the rest of the chain
//! (`map`, `collect`) runs on the standard library.

#[cfg(feature = "parallel")]
pub use rayon::iter::{IntoParallelIterator, ParallelIterator};

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter: Iterator<Item = Self::Item>;
        type Item;

        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;

        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::IntoParallelIterator;
