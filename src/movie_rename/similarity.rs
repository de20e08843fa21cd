//! Gestalt pattern matching (Ratcliff/Obershelp) string similarity.

/// Similarity ratio in `[0, 1]`: twice the number of matching characters divided by the total length.
///
/// Matching characters are found by taking the longest common substring
/// and recursing into the unmatched pieces on both sides of it.
/// Two empty strings are identical.
///
/// ```rust
/// use movie_renamer::movie_rename::ratio;
///
/// assert!((ratio("abcd", "bcde") - 0.75).abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Sum of the matching block sizes.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((a_low, a_high, b_low, b_high)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, a_low, a_high, b_low, b_high);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_low < i && b_low < j {
            queue.push((a_low, i, b_low, j));
        }
        if i + size < a_high && j + size < b_high {
            queue.push((i + size, a_high, j + size, b_high));
        }
    }
    matched
}

/// Longest common substring of `a[a_low..a_high]` and `b[b_low..b_high]`.
///
/// Ties go to the match that ends first in `a`, then in `b`.
/// Returns `(start_in_a, start_in_b, size)`.
fn longest_match(
    a: &[char],
    b: &[char],
    a_low: usize,
    a_high: usize,
    b_low: usize,
    b_high: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_low, b_low, 0);
    let width = b_high - b_low;
    let mut previous = vec![0_usize; width];
    let mut current = vec![0_usize; width];

    for i in a_low..a_high {
        for j in b_low..b_high {
            let offset = j - b_low;
            current[offset] = if a[i] == b[j] {
                let size = if offset > 0 { previous[offset - 1] + 1 } else { 1 };
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
                size
            } else {
                0
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    (best_i, best_j, best_size)
}
