//! Formatted terminal output for the non-interactive commands.
//!
//! We keep formatting code in one place so:
//! - client/model code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{ClientId, Prediction};
use crate::explain::{GlobalImportance, LocalAttribution};
use crate::plot;

/// Width used for textual progress bars and charts.
const TEXT_WIDTH: usize = 72;

/// Number of discrete steps the progress indicator fills: `floor(proba*100)`
/// clamped to [0, 100]. Non-finite probabilities fill nothing.
pub fn progress_steps(proba: f64) -> u16 {
    if !proba.is_finite() {
        return 0;
    }
    (proba * 100.0).floor().clamp(0.0, 100.0) as u16
}

/// `0.82` -> `"82.00%"`.
pub fn format_percent(proba: f64) -> String {
    format!("{:.2}%", proba * 100.0)
}

/// Full prediction readout: probability, progress bar, decision banner.
pub fn format_prediction(client_id: ClientId, prediction: &Prediction) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== cscope — applicant {client_id} ===\n"));
    out.push_str(&format!(
        "Probability of repayment: {}\n",
        format_percent(prediction.proba)
    ));
    out.push_str(&plot::render_progress(
        progress_steps(prediction.proba),
        50,
    ));
    out.push('\n');
    out.push_str(prediction.decision.label());
    out.push('\n');
    out
}

pub fn format_client_list(clients: &[ClientId]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} known applicant(s):\n", clients.len()));
    for id in clients {
        out.push_str(&format!("{id}\n"));
    }
    out
}

/// Global importance table + bar chart, limited to the top `top_n` features.
pub fn format_global(global: &GlobalImportance, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Global feature importance (mean |contribution| over {} rows):\n",
        global.rows_used
    ));

    let shown: Vec<(String, f64)> = global
        .features
        .iter()
        .take(top_n)
        .map(|f| (f.name.clone(), f.mean_abs))
        .collect();
    out.push_str(&plot::render_importance_bars(&shown, TEXT_WIDTH));

    let hidden = global.features.len().saturating_sub(top_n);
    if hidden > 0 {
        out.push_str(&format!("({hidden} more feature(s) not shown)\n"));
    }
    out
}

/// Local attribution readout: margins, then a diverging chart of the top
/// contributions.
pub fn format_local(local: &LocalAttribution, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Local attribution for applicant {} (row {}):\n",
        local.client_id, local.row
    ));
    out.push_str(&format!(
        "baseline={:+.4} margin={:+.4} local proba={}\n",
        local.baseline,
        local.margin,
        format_percent(local.proba)
    ));

    let shown: Vec<(String, f64)> = local
        .contributions
        .iter()
        .take(top_n)
        .map(|c| (c.name.clone(), c.contribution))
        .collect();
    out.push_str(&plot::render_diverging_bars(&shown, TEXT_WIDTH));

    let hidden = local.contributions.len().saturating_sub(top_n);
    if hidden > 0 {
        out.push_str(&format!("({hidden} more feature(s) not shown)\n"));
    }
    out
}
