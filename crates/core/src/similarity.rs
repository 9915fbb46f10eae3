use crate::embeddings::EmbeddingError;

/// Score reported when either vector has zero magnitude.
pub const DEGENERATE_SIMILARITY: f32 = 0.0;

/// Cosine similarity: dot product over the product of both magnitudes.
///
/// Vectors must have the same dimensionality. A zero-magnitude (or empty)
/// vector on either side yields [`DEGENERATE_SIMILARITY`]. The result is
/// clamped to `[-1, 1]` to absorb floating point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    // Accumulate in f64; long embeddings lose precision otherwise.
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Ok(DEGENERATE_SIMILARITY);
    }

    Ok((dot / denominator).clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_vectors_score_one() {
        let a = [0.3, -1.2, 4.5, 0.01];
        assert_relative_eq!(cosine_similarity(&a, &a).unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_opposite_and_orthogonal_vectors() {
        let a = [1.0, 2.0, 3.0];
        let neg = [-1.0, -2.0, -3.0];
        let orth = [2.0, -1.0, 0.0];
        assert_relative_eq!(cosine_similarity(&a, &neg).unwrap(), -1.0, epsilon = 1e-6);
        assert_relative_eq!(cosine_similarity(&a, &orth).unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_magnitude_does_not_matter() {
        let a = [1.0, 1.0];
        let scaled = [250.0, 250.0];
        assert_relative_eq!(cosine_similarity(&a, &scaled).unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_results_stay_within_bounds() {
        let vectors: Vec<Vec<f32>> = (1..20)
            .map(|seed| {
                (0..16)
                    .map(|i| (((seed * 31 + i * 17) % 23) as f32 - 11.0) / 3.0)
                    .collect()
            })
            .collect();
        for a in &vectors {
            for b in &vectors {
                let score = cosine_similarity(a, b).unwrap();
                assert!((-1.0..=1.0).contains(&score), "score {} out of range", score);
            }
        }
    }

    #[test]
    fn test_zero_vector_yields_sentinel() {
        let zero = [0.0, 0.0, 0.0];
        let a = [1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &a).unwrap(), DEGENERATE_SIMILARITY);
        assert_eq!(cosine_similarity(&a, &zero).unwrap(), DEGENERATE_SIMILARITY);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), DEGENERATE_SIMILARITY);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), DEGENERATE_SIMILARITY);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        match cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]) {
            Err(EmbeddingError::DimensionMismatch { left, right }) => {
                assert_eq!((left, right), (2, 3));
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }
}
