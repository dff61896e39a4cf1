//! Area-weighted polygon centroid

use agribot_core::Centroid;

/// Centroid of a closed polygon from its first-order moments.
///
/// Returns `None` for fewer than three vertices, zero area, or non-finite
/// vertices. Vertex order (clockwise or not) does not matter.
pub fn polygon_centroid(polygon: &[(f64, f64)]) -> Option<Centroid> {
    if polygon.len() < 3 {
        return None;
    }

    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;

    for (idx, &(x0, y0)) in polygon.iter().enumerate() {
        let (x1, y1) = polygon[(idx + 1) % polygon.len()];
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }

    if !m00.is_finite() || m00.abs() <= f64::EPSILON {
        return None;
    }

    // m00 is twice the signed area; 3 * m00 = 6A
    let cx = m10 / (3.0 * m00);
    let cy = m01 / (3.0 * m00);
    if !cx.is_finite() || !cy.is_finite() {
        return None;
    }
    Some(Centroid::new(cx, cy))
}
