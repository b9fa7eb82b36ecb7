/// Merging a decoded sequence of overlapping character tuples back into a
/// flat string, plus the edit-distance metrics used by evaluation.
///
/// Consecutive windows generally share characters; the merge keeps a running
/// pixel-position estimate per emitted character and only matches the new
/// tuple against the suffix that can physically overlap it. When windows
/// disagree on shared characters the first observation wins; the greedy
/// merge is intentionally lossy.
use crate::font::TextFont;
use crate::hmm::model::StateTuple;

pub fn reconstruct_string(
    window_states: &[StateTuple],
    block_size: u32,
    font: &dyn TextFont,
) -> String {
    let mut reconstructed: Vec<char> = Vec::new();
    let mut positions: Vec<(i64, i64)> = Vec::new();

    for (index, tuple) in window_states.iter().enumerate() {
        let Some(&first) = tuple.first() else {
            continue;
        };
        let block_start = index as i64 * block_size as i64;
        let reach = block_start - font.char_width(first) as i64;

        let overlap_candidates: Vec<char> = reconstructed
            .iter()
            .zip(&positions)
            .filter(|(_, pos)| pos.1 >= reach)
            .map(|(&ch, _)| ch)
            .collect();
        let overlap = suffix_prefix_overlap(&overlap_candidates, tuple);

        let mut offset = 0i64;
        for &ch in &tuple[overlap..] {
            let width = font.char_width(ch) as i64;
            positions.push((block_start + offset, block_start + offset + width));
            reconstructed.push(ch);
            offset += width;
        }
    }

    reconstructed.into_iter().collect()
}

/// Largest `k` such that the last `k` reconstructed characters equal the
/// first `k` of the new tuple.
pub fn suffix_prefix_overlap(reconstructed: &[char], new_characters: &[char]) -> usize {
    let mut largest = 0;
    for k in 1..=new_characters.len() {
        if k > reconstructed.len() {
            break;
        }
        if reconstructed[reconstructed.len() - k..] == new_characters[..k] {
            largest = k;
        }
    }
    largest
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let (short, long): (Vec<char>, Vec<char>) = if a.chars().count() > b.chars().count() {
        (b.chars().collect(), a.chars().collect())
    } else {
        (a.chars().collect(), b.chars().collect())
    };

    let mut distances: Vec<usize> = (0..=short.len()).collect();
    for (i2, c2) in long.iter().enumerate() {
        let mut next = vec![i2 + 1];
        for (i1, c1) in short.iter().enumerate() {
            if c1 == c2 {
                next.push(distances[i1]);
            } else {
                next.push(1 + distances[i1].min(distances[i1 + 1]).min(next[next.len() - 1]));
            }
        }
        distances = next;
    }
    distances[distances.len() - 1]
}

/// Levenshtein distance normalized against the original string; 1.0 is a
/// perfect recovery.
pub fn string_similarity(original: &str, recovered: &str) -> f64 {
    let len = original.chars().count();
    if len == 0 {
        return if recovered.is_empty() { 1.0 } else { 0.0 };
    }
    1.0 - levenshtein(original, recovered) as f64 / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_font::BlockFont;

    fn tuples(raw: &[&str]) -> Vec<StateTuple> {
        raw.iter().map(|s| s.chars().collect()).collect()
    }

    /// Decoded output of a 10-digit string at block size 6 with a wide
    /// monospaced font; every character persists over ~5 windows.
    #[test]
    fn reconstruct_merges_repeated_window_tuples() {
        let window_states = tuples(&[
            "81", "81", "81", "81", "81", "12", "12", "12", "12", "12", "29", "29", "29", "29",
            "92", "92", "92", "92", "92", "27", "27", "27", "27", "27", "77", "77", "77", "77",
            "72", "72", "72", "72", "72", "20", "20", "20", "20", "20", "02", "02", "02", "02",
            "2",
        ]);
        let font = BlockFont::new(45, 12, 28);

        assert_eq!(reconstruct_string(&window_states, 6, &font), "8129277202");
    }

    #[test]
    fn reconstruct_handles_long_character_runs() {
        let window_states = tuples(&[
            "12", "12", "12", "12", "12", "23", "23", "23", "23", "23", "34", "34", "34", "34",
            "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44",
            "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44", "44",
            "45", "45", "45", "45", "45", "5",
        ]);
        let font = BlockFont::new(45, 12, 28);

        assert_eq!(reconstruct_string(&window_states, 6, &font), "12344444445");
    }

    #[test]
    fn empty_tuples_contribute_nothing() {
        let mut window_states = tuples(&["12", "2"]);
        window_states.insert(0, Vec::new());
        let font = BlockFont::new(45, 12, 28);

        assert_eq!(reconstruct_string(&window_states, 6, &font), "12");
    }

    #[test]
    fn overlap_complete() {
        assert_eq!(suffix_prefix_overlap(&['1', '2', '3'], &['2', '3']), 2);
    }

    #[test]
    fn overlap_partial() {
        assert_eq!(suffix_prefix_overlap(&['1', '2', '3'], &['3', '4']), 1);
    }

    #[test]
    fn overlap_none() {
        assert_eq!(suffix_prefix_overlap(&['1', '2', '3'], &['4']), 0);
    }

    #[test]
    fn overlap_with_empty_reconstruction() {
        assert_eq!(suffix_prefix_overlap(&[], &['4']), 0);
    }

    #[test]
    fn overlap_longer_tuple_than_reconstruction() {
        assert_eq!(suffix_prefix_overlap(&['4'], &['4', '5']), 1);
    }

    #[test]
    fn levenshtein_matches_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("12345", "12345"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn similarity_normalizes_against_the_original() {
        assert_eq!(string_similarity("12345", "12345"), 1.0);
        assert_eq!(string_similarity("12345", "12340"), 0.8);
        assert_eq!(string_similarity("", ""), 1.0);
        assert!(string_similarity("1234", "") <= 0.0 + 1e-12);
    }
}
