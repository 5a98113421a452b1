//! Planar geometry used by edge derivation.

/// Euclidean distance between `(ax, ay)` and `(bx, by)`.
#[must_use]
pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_four_five() {
        assert_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0);
    }

    #[test]
    fn symmetric_and_zero_on_same_point() {
        assert_eq!(distance(10.0, 20.0, 40.0, 60.0), distance(40.0, 60.0, 10.0, 20.0));
        assert_eq!(distance(7.5, 7.5, 7.5, 7.5), 0.0);
    }
}
