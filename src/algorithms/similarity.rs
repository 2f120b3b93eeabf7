use crate::error::EncoreError;
use nalgebra::DVector;
use std::collections::BTreeSet;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

fn check_finite(values: &[f64], context: &'static str) -> Result<(), EncoreError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EncoreError::NonFiniteInput { context });
    }
    Ok(())
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm; no shared direction can
/// be read out of a zero vector, so the convention avoids a division by
/// zero instead of raising. NaN or infinite components are rejected before
/// any arithmetic.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, EncoreError> {
    if a.len() != b.len() {
        return Err(EncoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    check_finite(a, "cosine left operand")?;
    check_finite(b, "cosine right operand")?;

    let va = DVector::from_column_slice(a);
    let vb = DVector::from_column_slice(b);
    let norm_a = va.norm();
    let norm_b = vb.norm();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(va.dot(&vb) / (norm_a * norm_b))
}

/// Jaccard similarity between two label sets: |A∩B| / |A∪B|.
///
/// Two empty sets score 0.0: no shared information, not perfect
/// similarity. Callers needing the opposite convention must special-case
/// it themselves.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Great-circle distance between two (latitude, longitude) points in
/// kilometers.
pub fn haversine_distance_km(a: (f64, f64), b: (f64, f64)) -> Result<f64, EncoreError> {
    for &(lat, lon) in &[a, b] {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(EncoreError::NonFiniteInput {
                context: "geographic coordinates",
            });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(EncoreError::InvalidCoordinate { lat, lon });
        }
    }

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    Ok(2.0 * EARTH_RADIUS_KM * h.sqrt().asin())
}

/// Haversine-derived similarity: 1 / (1 + distance / scale_km).
///
/// Stays in (0, 1] and decays smoothly with distance rather than cutting
/// off at a radius. `scale_km` sets the distance at which similarity
/// halves.
pub fn haversine_similarity(a: (f64, f64), b: (f64, f64), scale_km: f64) -> Result<f64, EncoreError> {
    if !scale_km.is_finite() || scale_km <= 0.0 {
        return Err(EncoreError::NonFiniteInput {
            context: "haversine scale",
        });
    }
    let distance = haversine_distance_km(a, b)?;
    Ok(1.0 / (1.0 + distance / scale_km))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cosine_is_symmetric_and_self_similar() {
        let a = vec![0.3, 1.2, -0.5];
        let b = vec![2.0, 0.1, 0.9];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-12);

        let aa = cosine_similarity(&a, &a).unwrap();
        assert!((aa - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_zero_vector_is_zero_not_error() {
        let zero = vec![0.0, 0.0, 0.0];
        let any = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &any).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn cosine_orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-12);
    }

    #[test]
    fn cosine_rejects_malformed_input() {
        let a = vec![1.0, f64::NAN];
        let b = vec![1.0, 2.0];
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(EncoreError::NonFiniteInput { .. })
        ));
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 2.0]),
            Err(EncoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn jaccard_conventions() {
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 0.0);
        let a = set(&["rock", "pop"]);
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
        let b = set(&["rock"]);
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn haversine_known_distance() {
        // Paris to London, roughly 344 km.
        let paris = (48.8566, 2.3522);
        let london = (51.5074, -0.1278);
        let d = haversine_distance_km(paris, london).unwrap();
        assert!((d - 344.0).abs() < 5.0);
    }

    #[test]
    fn haversine_similarity_in_unit_interval() {
        let a = (40.7128, -74.0060);
        let b = (34.0522, -118.2437);
        let s = haversine_similarity(a, b, 100.0).unwrap();
        assert!(s > 0.0 && s < 1.0);

        let same = haversine_similarity(a, a, 100.0).unwrap();
        assert!((same - 1.0).abs() < 1e-12);
    }

    #[test]
    fn haversine_rejects_bad_coordinates() {
        assert!(haversine_distance_km((91.0, 0.0), (0.0, 0.0)).is_err());
        assert!(haversine_distance_km((0.0, 181.0), (0.0, 0.0)).is_err());
        assert!(haversine_similarity((0.0, 0.0), (0.0, 0.0), 0.0).is_err());
    }
}
