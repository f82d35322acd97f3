//! Label names and values for synthetic series.
//!
//! A vector built for `label_num` labels has `label_num + 1` dimensions: `key0` through
//! `key{label_num - 1}`, then `index`.  Every synthetic series shares the same `valueN` for each
//! `keyN` and is told apart from its siblings only by `index`, so the number of distinct series a
//! vector grows to is exactly the number of indexes that are touched.

/// Name of the label appended after the `keyN` labels.
pub const INDEX_LABEL: &str = "index";

/// Returns `["key0", ..., "key{label_num - 1}", "index"]`.
pub fn label_names(label_num: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(label_num + 1);
    names.extend((0..label_num).map(|i| format!("key{}", i)));
    names.push(INDEX_LABEL.to_string());
    names
}

/// Returns `["value0", ..., "value{label_num - 1}", "{series_index}"]`.
///
/// The result pairs positionally with [`label_names`] for the same `label_num`.
pub fn label_values(label_num: usize, series_index: usize) -> Vec<String> {
    let mut values = Vec::with_capacity(label_num + 1);
    values.extend((0..label_num).map(|i| format!("value{}", i)));
    values.push(series_index.to_string());
    values
}
