//! Aligned rendering of weights for tabular display.

/// Format weights with two decimals and integer parts right-aligned to a common width.
pub fn format_weight_column(weights: &[f64]) -> Vec<String> {
    let rendered: Vec<String> = weights.iter().map(|w| format!("{:.2}", w)).collect();
    let int_width = rendered
        .iter()
        .map(|s| s.find('.').unwrap_or(s.len()))
        .max()
        .unwrap_or(0);

    rendered
        .into_iter()
        .map(|s| {
            let int_len = s.find('.').unwrap_or(s.len());
            format!("{}{}", " ".repeat(int_width - int_len), s)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        let column = format_weight_column(&[1.5, 12.0, 0.01]);
        assert_eq!(column, vec![" 1.50", "12.00", " 0.01"]);
    }

    #[test]
    fn test_empty() {
        assert!(format_weight_column(&[]).is_empty());
    }
}
