//! Helpers for SQLite's statement parameter limit.

/// Maximum number of bound values per `IN (...)` list.
///
/// SQLite's compile-time default `SQLITE_MAX_VARIABLE_NUMBER` is 999 on older
/// builds; 500 leaves room for the other parameters of the statement.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Split `items` into slices small enough for one `IN (...)` clause.
///
/// ```ignore
/// for chunk in chunk_for_sqlite(&item_names) {
///     ids.extend(lookup_ids(conn, chunk)?);
/// }
/// ```
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Sorted, de-duplicated copy of `names`.
pub fn unique_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut unique: Vec<String> = names.into_iter().cloned().collect();
    unique.sort_unstable();
    unique.dedup();
    unique
}
