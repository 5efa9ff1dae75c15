//! Chunking of oversized payloads.
//!
//! External synthesis services cap request sizes. The scheduler splits
//! an oversized payload into ordered sub-units under a hard ceiling,
//! preferring cuts at a boundary token (paragraph breaks) and forcing a
//! cut only when a single unbroken unit exceeds the ceiling on its own.
//! Splitting keeps every byte of the input inside some chunk, so
//! reassembly of unmodified chunks is the identity transform.
//!
//! A chunk plan is consumed within the same runner invocation that
//! produced it; it is never persisted.

/// An ordered sequence of size-bounded sub-payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<String>,
}

impl ChunkPlan {
    /// Returns the chunks in original payload order.
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Returns the number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the plan holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Consumes the plan, yielding the ordered chunks.
    #[must_use]
    pub fn into_chunks(self) -> Vec<String> {
        self.chunks
    }
}

/// Splits `payload` into ordered chunks of at most `hard_limit` bytes.
///
/// Units delimited by `boundary_token` are accumulated greedily; the
/// boundary text stays inside its unit so no byte is lost. A single
/// unit longer than the limit is force-cut at the largest char boundary
/// under the limit — the hard constraint wins over the boundary
/// preference. (A multi-byte char wider than the limit is kept whole;
/// data is never dropped.)
#[must_use]
pub fn split(payload: &str, hard_limit: usize, boundary_token: &str) -> ChunkPlan {
    let limit = hard_limit.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    let units: Vec<&str> = if boundary_token.is_empty() {
        vec![payload]
    } else {
        payload.split_inclusive(boundary_token).collect()
    };

    for unit in units {
        if unit.len() > limit {
            // Oversized unbroken unit: flush, then force-cut.
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut rest = unit;
            while rest.len() > limit {
                let cut = char_floor(rest, limit);
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
        } else if current.len() + unit.len() <= limit {
            current.push_str(unit);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(unit);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    ChunkPlan { chunks }
}

/// Concatenates indexed sub-results in original index order, regardless
/// of the order they completed in.
#[must_use]
pub fn reassemble_text(mut indexed: Vec<(usize, String)>) -> String {
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, part)| part).collect()
}

/// Byte variant of [`reassemble_text`] for binary sub-results.
#[must_use]
pub fn reassemble_bytes(mut indexed: Vec<(usize, Vec<u8>)>) -> Vec<u8> {
    indexed.sort_by_key(|(index, _)| *index);
    let mut combined = Vec::with_capacity(indexed.iter().map(|(_, p)| p.len()).sum());
    for (_, part) in indexed {
        combined.extend_from_slice(&part);
    }
    combined
}

/// Largest char-boundary offset `<= limit`, taking at least one char.
fn char_floor(s: &str, limit: usize) -> usize {
    let mut end = limit.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    if end == 0 {
        end = s.chars().next().map_or(0, char::len_utf8);
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(payload: &str, limit: usize) -> String {
        let plan = split(payload, limit, "\n\n");
        let indexed = plan.into_chunks().into_iter().enumerate().collect();
        reassemble_text(indexed)
    }

    #[test]
    fn test_split_reassemble_is_identity() {
        let payload = "first paragraph\n\nsecond paragraph\n\nthird";
        for limit in [1, 5, 16, 40, 1000] {
            assert_eq!(round_trip(payload, limit), payload, "limit = {limit}");
        }
    }

    #[test]
    fn test_chunks_respect_hard_limit() {
        let paragraphs: Vec<String> = (0..8).map(|i| format!("paragraph number {i} {}", "x".repeat(1200))).collect();
        let payload = paragraphs.join("\n\n");
        let plan = split(&payload, 4500, "\n\n");

        assert!(plan.len() > 1);
        for chunk in plan.chunks() {
            assert!(chunk.len() <= 4500, "chunk of {} bytes", chunk.len());
        }
    }

    #[test]
    fn test_cuts_land_on_paragraph_boundaries_when_possible() {
        // ~1,200-char paragraphs against a 4,500-byte ceiling: every
        // cut must land between paragraphs, and reassembly must restore
        // the payload byte for byte.
        let paragraphs: Vec<String> = (0..8).map(|i| format!("p{i} {}", "y".repeat(1200))).collect();
        let payload = paragraphs.join("\n\n");
        assert!(payload.len() >= 9600);

        let plan = split(&payload, 4500, "\n\n");
        for chunk in plan.chunks().iter().take(plan.len() - 1) {
            assert!(chunk.ends_with("\n\n"), "cut mid-paragraph: ...{:?}", &chunk[chunk.len().saturating_sub(20)..]);
        }
        let indexed = plan.into_chunks().into_iter().enumerate().collect();
        assert_eq!(reassemble_text(indexed), payload);
    }

    #[test]
    fn test_oversized_unit_is_force_cut() {
        let payload = "z".repeat(10);
        let plan = split(&payload, 4, "\n\n");
        assert_eq!(plan.chunks(), &["zzzz", "zzzz", "zz"]);

        let indexed = plan.into_chunks().into_iter().enumerate().collect();
        assert_eq!(reassemble_text(indexed), payload);
    }

    #[test]
    fn test_force_cut_respects_char_boundaries() {
        let payload = "ééééé"; // 2 bytes per char
        let plan = split(payload, 3, "\n\n");
        for chunk in plan.chunks() {
            assert!(chunk.len() <= 3);
        }
        let indexed = plan.into_chunks().into_iter().enumerate().collect();
        assert_eq!(reassemble_text(indexed), payload);
    }

    #[test]
    fn test_reassemble_orders_by_index_not_completion() {
        let out_of_order = vec![
            (2, "c".to_string()),
            (0, "a".to_string()),
            (1, "b".to_string()),
        ];
        assert_eq!(reassemble_text(out_of_order), "abc");

        let bytes = vec![(1, vec![2u8]), (0, vec![1u8])];
        assert_eq!(reassemble_bytes(bytes), vec![1, 2]);
    }

    #[test]
    fn test_empty_payload_yields_empty_plan() {
        assert!(split("", 100, "\n\n").is_empty());
    }

    #[test]
    fn test_packing_is_greedy() {
        // Units of 6 bytes ("aaaa\n\n") against a 14-byte ceiling pack
        // two to a chunk.
        let payload = "aaaa\n\nbbbb\n\ncccc\n\ndddd";
        let plan = split(payload, 14, "\n\n");
        assert_eq!(plan.chunks(), &["aaaa\n\nbbbb\n\n", "cccc\n\ndddd"]);
    }
}
