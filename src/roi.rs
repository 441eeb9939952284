use crate::dataset::Dataset;

/// Mean profit per row. An empty dataset scores negative infinity so it never
/// wins a comparison against a non-empty one.
pub fn roi(dataset: &Dataset) -> f64 {
    if dataset.is_empty() {
        return f64::NEG_INFINITY;
    }
    dataset.profit_sum() / dataset.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::row;
    use crate::dataset::Schema;

    #[test]
    fn roi_is_mean_profit() {
        let ds = Dataset::new(
            vec![
                row("T", "a", "b", "a", 2.0),
                row("T", "a", "b", "b", -1.0),
                row("T", "a", "b", "a", 0.5),
                row("T", "a", "b", "a", 0.5),
            ],
            Schema::default(),
        );
        assert!((roi(&ds) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_roi_is_negative_infinity() {
        let ds = Dataset::new(Vec::new(), Schema::default());
        assert_eq!(roi(&ds), f64::NEG_INFINITY);
        let filtered = Dataset::new(vec![row("T", "a", "b", "a", 1.0)], Schema::default())
            .retain(|_| false);
        assert!(roi(&filtered) < -1e300);
    }
}
