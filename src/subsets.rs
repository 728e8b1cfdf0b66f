//! Enumeration of the specification space.

/// Number of subsets of `items`, including the empty set. `None` when the
/// count does not fit in a `usize`.
pub fn space_size<T>(items: &[T]) -> Option<usize> {
    u32::try_from(items.len())
        .ok()
        .and_then(|len| 1usize.checked_shl(len))
}

/// Every subset of `items`, smallest first; subsets of equal size follow the
/// order of `items` (lexicographic over positions).
pub fn all_subsets<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let n = items.len();
    let mut out = Vec::with_capacity(space_size(items).unwrap_or(0));
    for size in 0..=n {
        let mut idx: Vec<usize> = (0..size).collect();
        loop {
            out.push(idx.iter().map(|&i| items[i].clone()).collect());
            // advance to the next combination of `size` positions
            let mut pos = size;
            while pos > 0 && idx[pos - 1] == n - size + pos - 1 {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            idx[pos - 1] += 1;
            for j in pos..size {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }
    out
}

/// Canonical spec name: the member names sorted, so that comparing names is
/// set comparison.
pub fn spec_name<S: AsRef<str>>(members: &[S]) -> Vec<String> {
    let mut out: Vec<String> = members.iter().map(|s| s.as_ref().to_string()).collect();
    out.sort();
    out.dedup();
    out
}

pub fn selection_key(specs: &[Vec<String>]) -> Vec<Vec<String>> {
    specs.iter().map(|s| spec_name(s)).collect()
}

pub fn spec_label(name: &[String]) -> String {
    if name.is_empty() {
        "(no controls)".to_string()
    } else {
        name.join(", ")
    }
}
