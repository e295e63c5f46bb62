/// Split `items` into consecutive chunks of at most `batch_size`.
///
/// A `batch_size` of zero is treated as one.
pub fn make_batches(items: &[String], batch_size: usize) -> Vec<Vec<String>> {
    items
        .chunks(batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}
