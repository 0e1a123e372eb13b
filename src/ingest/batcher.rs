use std::num::NonZeroUsize;

/// Split `items` into contiguous, non-overlapping batches of at most
/// `batch_size` elements. Concatenating the batches reproduces `items`;
/// only the last batch may be short. Empty input yields no batches.
pub fn into_batches<T>(items: &[T], batch_size: NonZeroUsize) -> Vec<&[T]> {
    items.chunks(batch_size.get()).collect()
}

/// Number of batches `len` items produce at `batch_size`.
pub fn batch_count(len: usize, batch_size: NonZeroUsize) -> usize {
    len.div_ceil(batch_size.get())
}
