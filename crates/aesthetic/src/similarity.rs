use crate::AestheticError;

/// Rejects vectors with NaN or infinite components; their similarities would be NaN.
pub(crate) fn ensure_finite(v: &[f32], what: &str) -> Result<(), AestheticError> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(idx) => Err(AestheticError::Encoding(format!(
            "{what} has a non-finite value at index {idx}"
        ))),
        None => Ok(()),
    }
}

/// In-place L2 normalization helper to keep allocations down during hot paths.
/// Uses f32 throughout for better SIMD auto-vectorization.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cosine similarity accumulated in f64. Returns 0.0 if either side has zero norm
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Average cosine similarity between `image` and every vector in `embeddings`.
pub(crate) fn mean_similarity(image: &[f32], embeddings: &[Vec<f32>]) -> f64 {
    if embeddings.is_empty() {
        return 0.0;
    }
    let total: f64 = embeddings
        .iter()
        .map(|text| cosine_similarity(image, text))
        .sum();
    total / embeddings.len() as f64
}
