use crate::Polygon;

/// Region with a ground absorption coefficient `G` in [0, 1].
#[derive(Debug, Clone)]
pub struct GroundArea {
    pub(crate) polygon: Polygon,
    pub(crate) g: f64,
}

impl GroundArea {
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn g(&self) -> f64 {
        self.g
    }
}

/// Length-weighted mean `G` over the part `[from, to]` of a sequence of spans.
///
/// Spans are `(length, G)` pairs laid end to end. Returns `None` for an empty range.
pub fn mean_g(spans: &[(f64, f64)], from: f64, to: f64) -> Option<f64> {
    if to <= from {
        return None;
    }
    let mut start = 0.0;
    let mut weighted = 0.0;
    let mut covered = 0.0;
    for &(length, g) in spans {
        let end = start + length;
        let overlap = end.min(to) - start.max(from);
        if overlap > 0.0 {
            weighted += overlap * g;
            covered += overlap;
        }
        start = end;
    }
    if covered > 0.0 { Some(weighted / covered) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_g() {
        let spans = vec![(10.0, 0.0), (30.0, 1.0), (10.0, 0.5)];
        assert!((mean_g(&spans, 0.0, 50.0).unwrap() - 35.0 / 50.0).abs() < 1e-12);
        assert!((mean_g(&spans, 0.0, 10.0).unwrap()).abs() < 1e-12);
        assert!((mean_g(&spans, 5.0, 15.0).unwrap() - 0.5).abs() < 1e-12);
        assert!(mean_g(&spans, 20.0, 20.0).is_none());
    }
}
