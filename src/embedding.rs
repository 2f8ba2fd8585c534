//! Embedding provider seam and the embedding blender (spec §4.2).

use async_trait::async_trait;

use crate::error::{EngineError, Result};

/// External embedding provider: `Embed([texts]) -> [vectors]`.
///
/// Out of scope per spec §1 ("the embedding provider ... treated as [an]
/// async pure function"); the engine only depends on this trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Convex combination `alpha * base + (1 - alpha) * tool`, elementwise.
///
/// Not renormalized: callers that require unit vectors must renormalize
/// themselves (spec §4.2).
pub fn blend(base: &[f32], tool: &[f32], alpha: f32) -> Result<Vec<f32>> {
    if base.len() != tool.len() {
        return Err(EngineError::InvalidInput(format!(
            "vector length mismatch: base={}, tool={}",
            base.len(),
            tool.len()
        )));
    }

    Ok(base
        .iter()
        .zip(tool.iter())
        .map(|(b, t)| alpha * b + (1.0 - alpha) * t)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_alpha_zero_returns_tool() {
        let base = vec![5.0, 10.0];
        let tool = vec![1.0, 2.0];
        assert_eq!(blend(&base, &tool, 0.0).unwrap(), tool);
    }

    #[test]
    fn test_blend_alpha_one_returns_base() {
        let base = vec![5.0, 10.0];
        let tool = vec![1.0, 2.0];
        assert_eq!(blend(&base, &tool, 1.0).unwrap(), base);
    }

    #[test]
    fn test_blend_default_alpha() {
        let base = vec![1.0, 2.0, 3.0, 4.0];
        let tool = vec![0.5, 0.5, 0.5, 0.5];
        let result = blend(&base, &tool, 0.1).unwrap();
        let expected = vec![
            0.1 * 1.0 + 0.9 * 0.5,
            0.1 * 2.0 + 0.9 * 0.5,
            0.1 * 3.0 + 0.9 * 0.5,
            0.1 * 4.0 + 0.9 * 0.5,
        ];
        for (a, b) in result.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blend_length_mismatch_is_invalid_input() {
        let base = vec![1.0, 2.0, 3.0];
        let tool = vec![1.0, 2.0];
        let err = blend(&base, &tool, 0.1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
