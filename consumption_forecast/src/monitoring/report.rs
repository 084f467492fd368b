//! Self-contained HTML reports written by each monitoring cycle
//!
//! Reports are handlebars templates; every value is HTML-escaped by the
//! template engine on the way in.

use crate::error::{ForecastError, Result};
use consumption_math::summary::{histogram, shared_bin_edges};
use consumption_math::{DriftResult, RegressionMetrics, Summary};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

/// Number of histogram bins drawn in the drift report
const HISTOGRAM_BINS: usize = 20;

const SVG_WIDTH: f64 = 600.0;
const SVG_HEIGHT: f64 = 200.0;

const DRIFT_TEMPLATE: &str = "drift_report";
const PERF_TEMPLATE: &str = "performance_report";

const HEADER_PARTIAL: &str = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>{{header.title}}</title>
<style>body{font-family:sans-serif;margin:2em;color:#222}
table{border-collapse:collapse;margin:1em 0}
td,th{border:1px solid #ccc;padding:4px 10px;text-align:right}
th{background:#f3f3f3}.drift{color:#b00020}.ok{color:#1b5e20}
.legend span{display:inline-block;width:12px;height:12px;margin:0 4px 0 12px}</style></head><body>
<h1>{{header.title}}</h1>
<p>Generated {{header.generated_at}} for model <b>{{header.model_name}}</b> version <b>{{header.model_version}}</b></p>
"#;

const DRIFT_BODY: &str = r#"{{> header}}<h2 class="{{verdict_class}}">{{verdict}}</h2>
<table>
<tr><th>column</th><td>target</td></tr>
<tr><th>test</th><td>{{method}}</td></tr>
<tr><th>statistic</th><td>{{statistic}}</td></tr>
<tr><th>drift score</th><td>{{score}}</td></tr>
<tr><th>threshold</th><td>{{threshold}}</td></tr>
<tr><th>reference rows</th><td>{{reference_size}}</td></tr>
<tr><th>current rows</th><td>{{current_size}}</td></tr>
</table>
{{#if summary}}<h2>Distribution</h2>
<table><tr><th>statistic</th><th>reference</th><th>current</th></tr>
{{#each summary}}<tr><th>{{name}}</th><td>{{reference}}</td><td>{{current}}</td></tr>
{{/each}}</table>
{{/if}}{{#if histogram}}<svg width="{{histogram.width}}" height="{{histogram.height}}" viewBox="0 0 {{histogram.width}} {{histogram.height}}" role="img">
{{#each histogram.bars}}<rect x="{{x}}" y="{{y}}" width="{{width}}" height="{{height}}" fill="{{fill}}"/>
{{/each}}<text x="0" y="{{histogram.label_y}}" font-size="11">{{histogram.low}}</text>
<text x="{{histogram.width}}" y="{{histogram.label_y}}" font-size="11" text-anchor="end">{{histogram.high}}</text></svg>
<p class="legend"><span style="background:#4c78a8"></span>reference<span style="background:#f58518"></span>current</p>
{{/if}}</body></html>"#;

const PERF_BODY: &str = r#"{{> header}}<h2>Regression quality</h2>
<table><tr><th>metric</th><th>reference</th><th>current</th></tr>
{{#each metrics}}<tr><th>{{name}}</th><td>{{reference}}</td><td>{{current}}</td></tr>
{{/each}}</table>
{{#if comparison}}<p class="{{comparison.class}}">RMSE {{comparison.text}} the reference level.</p>
{{/if}}</body></html>"#;

/// Header shared by both reports
#[derive(Debug, Clone, Serialize)]
pub struct ReportHeader<'a> {
    pub title: &'a str,
    pub generated_at: &'a str,
    pub model_name: &'a str,
    pub model_version: &'a str,
}

#[derive(Debug, Serialize)]
struct ComparisonRow {
    name: &'static str,
    reference: String,
    current: String,
}

#[derive(Debug, Serialize)]
struct Bar {
    x: String,
    y: String,
    width: String,
    height: String,
    fill: &'static str,
}

fn template_error(e: impl std::fmt::Display) -> ForecastError {
    ForecastError::ReportError(e.to_string())
}

fn templates() -> Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars
        .register_partial("header", HEADER_PARTIAL)
        .map_err(template_error)?;
    handlebars
        .register_template_string(DRIFT_TEMPLATE, DRIFT_BODY)
        .map_err(template_error)?;
    handlebars
        .register_template_string(PERF_TEMPLATE, PERF_BODY)
        .map_err(template_error)?;
    Ok(handlebars)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

fn summary_rows(reference: &Summary, current: &Summary) -> Vec<ComparisonRow> {
    let rows: [(&'static str, f64, f64); 8] = [
        ("count", reference.count as f64, current.count as f64),
        ("mean", reference.mean, current.mean),
        ("std", reference.std_dev, current.std_dev),
        ("min", reference.min, current.min),
        ("25%", reference.q25, current.q25),
        ("50%", reference.median, current.median),
        ("75%", reference.q75, current.q75),
        ("max", reference.max, current.max),
    ];
    rows.into_iter()
        .map(|(name, r, c)| ComparisonRow {
            name,
            reference: format!("{:.3}", r),
            current: format!("{:.3}", c),
        })
        .collect()
}

/// Side-by-side bars of two distributions, `None` when no bins can be drawn
fn histogram_data(reference: &[f64], current: &[f64]) -> Option<serde_json::Value> {
    let edges = shared_bin_edges(reference, current, HISTOGRAM_BINS).ok()?;
    let ref_shares = histogram(reference, &edges);
    let cur_shares = histogram(current, &edges);
    let peak = ref_shares
        .iter()
        .chain(&cur_shares)
        .fold(0.0f64, |m, &v| m.max(v))
        .max(f64::EPSILON);

    let bar = SVG_WIDTH / (HISTOGRAM_BINS as f64 * 2.0);
    let mut bars = Vec::with_capacity(ref_shares.len() * 2);
    for (i, (r, c)) in ref_shares.iter().zip(&cur_shares).enumerate() {
        let x = i as f64 * bar * 2.0;
        for (offset, share, fill) in [(0.0, r, "#4c78a8"), (bar, c, "#f58518")] {
            let h = share / peak * SVG_HEIGHT;
            bars.push(Bar {
                x: format!("{:.1}", x + offset),
                y: format!("{:.1}", SVG_HEIGHT - h),
                width: format!("{:.1}", bar),
                height: format!("{:.1}", h),
                fill,
            });
        }
    }

    Some(json!({
        "width": SVG_WIDTH,
        "height": SVG_HEIGHT + 20.0,
        "label_y": SVG_HEIGHT + 15.0,
        "low": format!("{:.1}", edges[0]),
        "high": format!("{:.1}", edges[edges.len() - 1]),
        "bars": bars,
    }))
}

/// Data drift report for the `target` column
pub fn render_drift_report(
    header: &ReportHeader<'_>,
    result: &DriftResult,
    reference: &[f64],
    current: &[f64],
) -> Result<String> {
    let (verdict_class, verdict) = if result.drift_detected {
        ("drift", "Drift detected")
    } else {
        ("ok", "No drift detected")
    };
    let summary = match (Summary::of(reference), Summary::of(current)) {
        (Ok(r), Ok(c)) => Some(summary_rows(&r, &c)),
        _ => None,
    };

    let data = json!({
        "header": header,
        "verdict_class": verdict_class,
        "verdict": verdict,
        "method": result.method.to_string(),
        "statistic": format!("{:.6}", result.statistic),
        "score": format!("{:.6}", result.score),
        "threshold": result.threshold.to_string(),
        "reference_size": result.reference_size,
        "current_size": result.current_size,
        "summary": summary,
        "histogram": histogram_data(reference, current),
    });
    templates()?
        .render(DRIFT_TEMPLATE, &data)
        .map_err(template_error)
}

/// Regression performance report comparing reference and current accuracy
pub fn render_performance_report(
    header: &ReportHeader<'_>,
    reference: Option<&RegressionMetrics>,
    current: &RegressionMetrics,
) -> Result<String> {
    let rows: [(&'static str, Option<f64>, Option<f64>); 6] = [
        (
            "rows",
            reference.map(|m| m.count as f64),
            Some(current.count as f64),
        ),
        ("MAE", reference.map(|m| m.mae), Some(current.mae)),
        ("RMSE", reference.map(|m| m.rmse), Some(current.rmse)),
        ("MSE", reference.map(|m| m.mse), Some(current.mse)),
        ("R2", reference.and_then(|m| m.r2), current.r2),
        ("MAPE", reference.and_then(|m| m.mape), current.mape),
    ];
    let metrics: Vec<ComparisonRow> = rows
        .into_iter()
        .map(|(name, r, c)| ComparisonRow {
            name,
            reference: fmt_opt(r),
            current: fmt_opt(c),
        })
        .collect();

    // Flag a current error noticeably worse than the reference one
    let comparison = reference.map(|reference| {
        if current.rmse > reference.rmse * 1.1 {
            json!({ "class": "drift", "text": "exceeds" })
        } else {
            json!({ "class": "ok", "text": "is within 10% of" })
        }
    });

    let data = json!({
        "header": header,
        "metrics": metrics,
        "comparison": comparison,
    });
    templates()?
        .render(PERF_TEMPLATE, &data)
        .map_err(template_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_math::detect_drift;

    fn header() -> ReportHeader<'static> {
        ReportHeader {
            title: "Data drift",
            generated_at: "2025-01-01_00-00-00",
            model_name: "<model>",
            model_version: "3",
        }
    }

    #[test]
    fn drift_report_is_complete_document() {
        let reference: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let current: Vec<f64> = (0..50).map(|i| i as f64 + 100.0).collect();
        let result = detect_drift(&reference, &current).unwrap();

        let html = render_drift_report(&header(), &result, &reference, &current).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.ends_with("</html>"));
        assert!(html.contains("Drift detected"));
        assert!(html.contains("<svg"));
        assert!(html.contains("<th>50%</th>"));
    }

    #[test]
    fn header_values_are_escaped() {
        let reference = [1.0, 2.0, 3.0];
        let result = detect_drift(&reference, &reference).unwrap();

        let html = render_drift_report(&header(), &result, &reference, &reference).unwrap();
        assert!(html.contains("&lt;model&gt;"));
        assert!(!html.contains("<model>"));
    }

    #[test]
    fn performance_report_lists_metrics() {
        let current = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[1.5, 2.0, 2.5]).unwrap();
        let html = render_performance_report(&header(), None, &current).unwrap();
        assert!(html.contains("<th>RMSE</th>"));
        assert!(html.contains("n/a"));
        assert!(!html.contains("reference level"));
    }

    #[test]
    fn performance_report_flags_degraded_rmse() {
        let reference = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.5]).unwrap();
        let current = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap();
        let html = render_performance_report(&header(), Some(&reference), &current).unwrap();
        assert!(html.contains("RMSE exceeds the reference level."));
    }
}
