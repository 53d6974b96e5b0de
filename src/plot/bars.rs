//! Deterministic horizontal bar rendering.

/// Longest label shown before truncation.
const MAX_LABEL: usize = 24;

/// Render a magnitude bar chart, one row per item, scaled to the largest
/// value. Items are drawn in the order given.
pub fn render_importance_bars(items: &[(String, f64)], width: usize) -> String {
    if items.is_empty() {
        return "(no features)\n".to_string();
    }

    let label_w = label_width(items);
    let bar_w = width.saturating_sub(label_w + 12).max(8);
    let max = items
        .iter()
        .map(|(_, v)| v.abs())
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut out = String::new();
    for (label, value) in items {
        let filled = ((value.abs() / max) * bar_w as f64).round() as usize;
        out.push_str(&format!(
            "{:>label_w$} | {}{} {:.4}\n",
            clip(label),
            "█".repeat(filled.min(bar_w)),
            " ".repeat(bar_w - filled.min(bar_w)),
            value,
        ));
    }
    out
}

/// Render a signed (diverging) bar chart around a center axis: negative
/// contributions extend left, positive right.
pub fn render_diverging_bars(items: &[(String, f64)], width: usize) -> String {
    if items.is_empty() {
        return "(no features)\n".to_string();
    }

    let label_w = label_width(items);
    let half_w = (width.saturating_sub(label_w + 14) / 2).max(6);
    let max = items
        .iter()
        .map(|(_, v)| v.abs())
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut out = String::new();
    for (label, value) in items {
        let filled = ((value.abs() / max) * half_w as f64).round() as usize;
        let filled = filled.min(half_w);
        let (left, right) = if *value < 0.0 {
            (filled, 0)
        } else {
            (0, filled)
        };
        out.push_str(&format!(
            "{:>label_w$} {}{}|{}{} {:+.4}\n",
            clip(label),
            " ".repeat(half_w - left),
            "█".repeat(left),
            "█".repeat(right),
            " ".repeat(half_w - right),
            value,
        ));
    }
    out
}

/// Render a 0-100 step progress bar, e.g. `[████░░...] 82/100`.
pub fn render_progress(steps: u16, width: usize) -> String {
    let steps = steps.min(100);
    let width = width.max(10);
    let filled = (steps as usize * width) / 100;
    format!(
        "[{}{}] {steps}/100",
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

fn label_width(items: &[(String, f64)]) -> usize {
    items
        .iter()
        .map(|(label, _)| label.chars().count().min(MAX_LABEL))
        .max()
        .unwrap_or(0)
}

fn clip(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL - 1).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[(&str, f64)]) -> Vec<(String, f64)> {
        values
            .iter()
            .map(|(name, v)| (name.to_string(), *v))
            .collect()
    }

    #[test]
    fn importance_bars_scale_to_largest() {
        // width 61 with one-char labels gives a 48-cell bar area, so the
        // half-size bar is exactly 24 cells.
        let out = render_importance_bars(&items(&[("a", 2.0), ("b", 1.0)]), 61);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let bar_len = |line: &str| line.matches('█').count();
        assert_eq!(bar_len(lines[0]), 48);
        assert_eq!(bar_len(lines[1]), 24);
        assert!(lines[0].contains("2.0000"));
    }

    #[test]
    fn importance_bars_are_deterministic() {
        let a = render_importance_bars(&items(&[("x", 1.0), ("y", 0.5)]), 50);
        let b = render_importance_bars(&items(&[("x", 1.0), ("y", 0.5)]), 50);
        assert_eq!(a, b);
    }

    #[test]
    fn diverging_bars_split_by_sign() {
        let out = render_diverging_bars(&items(&[("up", 1.0), ("down", -1.0)]), 60);
        let lines: Vec<&str> = out.lines().collect();
        let axis_up = lines[0].find('|').unwrap();
        // Positive bars sit to the right of the axis, negative to the left.
        assert!(lines[0][axis_up + 1..].contains('█'));
        assert!(!lines[0][..axis_up].contains('█'));
        let axis_down = lines[1].find('|').unwrap();
        assert!(lines[1][..axis_down].contains('█'));
        assert!(lines[1].contains("-1.0000"));
    }

    #[test]
    fn empty_input_renders_placeholder() {
        assert_eq!(render_importance_bars(&[], 50), "(no features)\n");
        assert_eq!(render_diverging_bars(&[], 50), "(no features)\n");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(render_progress(0, 50), format!("[{}] 0/100", "░".repeat(50)));
        assert_eq!(
            render_progress(100, 50),
            format!("[{}] 100/100", "█".repeat(50))
        );
        let half = render_progress(50, 50);
        assert_eq!(half.matches('█').count(), 25);
        assert!(half.ends_with("50/100"));
    }

    #[test]
    fn long_labels_are_clipped() {
        let out = render_importance_bars(
            &items(&[("a_very_long_feature_name_indeed_it_is", 1.0)]),
            60,
        );
        assert!(out.contains('…'));
    }
}
