use std::collections::HashSet;

/// Collect column names, renaming case-insensitive duplicates with a numeric suffix
/// (`Id`, `Id1`, `Id2`, ...) so every column stays addressable by name.
pub(crate) fn extract_column_names<I, T, F>(columns: I, name: F) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    let mut taken = HashSet::new();
    columns
        .into_iter()
        .map(|col| {
            let base = name(&col);
            let mut candidate = base.to_string();
            let mut suffix = 1usize;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = format!("{base}{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}
