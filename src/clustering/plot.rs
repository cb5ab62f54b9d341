//! Dual-axis diagnostic chart for the model-selection search.
//!
//! Renders AIC and BIC against the left axis and the silhouette score
//! against a secondary right axis, one point per candidate count, to a
//! bitmap at a caller-specified path. The artifact is an analyst aid, not a
//! machine-readable interface; nothing downstream parses it.
//!
//! Rendering failures (unwritable path, backend errors) surface as
//! [`ClusteringError::PlotRender`] with the offending path so the search can
//! abort instead of silently dropping the artifact.

use std::path::Path;

use plotters::prelude::*;

use crate::clustering::errors::{ClusterResult, ClusteringError};
use crate::clustering::scores::ScoreRecord;

/// Pixel size of the rendered chart.
const PLOT_SIZE: (u32, u32) = (1200, 800);

/// Render the ordered-by-k score series to `path`.
///
/// Parameters
/// ----------
/// - `records`: score series sorted ascending by `k`; must be non-empty.
/// - `path`: output target for the bitmap (extension decides the format).
///
/// Errors
/// ------
/// - `ClusteringError::PlotRender` for an empty series or any backend
///   failure, carrying the path and the underlying reason.
pub fn render_score_plot(records: &[ScoreRecord], path: &Path) -> ClusterResult<()> {
    let render_err = |reason: String| ClusteringError::PlotRender {
        path: path.display().to_string(),
        reason,
    };

    if records.is_empty() {
        return Err(render_err("empty score series".to_string()));
    }

    let k_lo = records[0].k as f64 - 0.5;
    let k_hi = records[records.len() - 1].k as f64 + 0.5;
    let (crit_lo, crit_hi) = padded_range(
        records.iter().flat_map(|r| [r.aic, r.bic]),
    );
    let (sil_lo, sil_hi) = padded_range(records.iter().map(|r| r.silhouette));

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "AIC, BIC and Silhouette Score for different numbers of clusters",
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .right_y_label_area_size(70)
        .build_cartesian_2d(k_lo..k_hi, crit_lo..crit_hi)
        .map_err(|e| render_err(e.to_string()))?
        .set_secondary_coord(k_lo..k_hi, sil_lo..sil_hi);

    chart
        .configure_mesh()
        .x_desc("Number of clusters")
        .y_desc("AIC and BIC")
        .draw()
        .map_err(|e| render_err(e.to_string()))?;
    chart
        .configure_secondary_axes()
        .y_desc("Silhouette Score")
        .draw()
        .map_err(|e| render_err(e.to_string()))?;

    chart
        .draw_series(LineSeries::new(records.iter().map(|r| (r.k as f64, r.aic)), &BLUE))
        .map_err(|e| render_err(e.to_string()))?
        .label("AIC")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart
        .draw_series(LineSeries::new(records.iter().map(|r| (r.k as f64, r.bic)), &RED))
        .map_err(|e| render_err(e.to_string()))?
        .label("BIC")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .draw_secondary_series(LineSeries::new(
            records.iter().map(|r| (r.k as f64, r.silhouette)),
            &GREEN,
        ))
        .map_err(|e| render_err(e.to_string()))?
        .label("Sil Score")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| render_err(e.to_string()))?;

    root.present().map_err(|e| render_err(e.to_string()))?;
    Ok(())
}

/// Min/max of `values` with 5% headroom, widened to a unit span when flat so
/// the axis never degenerates.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let span = hi - lo;
    if span <= 0.0 {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo - 0.05 * span, hi + 0.05 * span)
    }
}
