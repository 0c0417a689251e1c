//! Static regime chart rendering
//!
//! Draws the price line over background rectangles shaded by regime and
//! writes the result as an SVG file. Only dates with a volatility label are
//! plotted.

use chrono::{Datelike, Duration};
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

use crate::error::{RegimeError, RegimeResult};
use crate::pipeline::RegimeAnalysis;
use crate::regime::RegimeLabel;

/// Opacity of the regime background shading
pub const SHADE_ALPHA: f64 = 0.3;

/// Chart dimensions and labels
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            width: 1400,
            height: 800,
        }
    }
}

fn render_err(err: impl std::fmt::Display) -> RegimeError {
    RegimeError::Render(err.to_string())
}

fn regime_color(regime: RegimeLabel) -> RGBColor {
    let (r, g, b) = regime.rgb();
    RGBColor(r, g, b)
}

/// Chart title, e.g. "SPY Price with Volatility Regimes (2010-Present)"
pub fn chart_title(analysis: &RegimeAnalysis) -> String {
    match analysis.prices.first() {
        Some(first) => format!(
            "{} Price with Volatility Regimes ({}-Present)",
            analysis.ticker,
            first.date.year()
        ),
        None => format!("{} Price with Volatility Regimes", analysis.ticker),
    }
}

/// Render the analysis to an SVG file, creating parent directories
pub fn render_svg(
    analysis: &RegimeAnalysis,
    path: impl AsRef<Path>,
    options: &ChartOptions,
) -> RegimeResult<()> {
    let path = path.as_ref();
    let points = analysis.labeled_prices();
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (f.0, l.0),
        _ => return Err(RegimeError::InsufficientData("no labeled prices to plot".to_string())),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let mut y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.05).max(y_max.abs() * 0.01).max(1e-6);
    y_min -= pad;
    y_max += pad;

    let x_end = if last > first { last } else { first + Duration::days(1) };

    {
        let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(chart_title(analysis), ("sans-serif", 26).into_font())
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(first..x_end, y_min..y_max)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_labels(12)
            .y_labels(10)
            .x_label_formatter(&|d| d.format("%Y-%m").to_string())
            .y_label_formatter(&|v| format!("{:.0}", v))
            .x_desc("Date")
            .y_desc(format!("{} Price (USD)", analysis.ticker))
            .axis_desc_style(("sans-serif", 16))
            .light_line_style(BLACK.mix(0.05))
            .bold_line_style(BLACK.mix(0.15))
            .draw()
            .map_err(render_err)?;

        for regime in RegimeLabel::ALL {
            let color = regime_color(regime);
            chart
                .draw_series(
                    analysis
                        .spans
                        .iter()
                        .filter(|span| span.regime == regime)
                        .map(|span| {
                            Rectangle::new(
                                [(span.start, y_min), (span.end, y_max)],
                                color.mix(SHADE_ALPHA).filled(),
                            )
                        }),
                )
                .map_err(render_err)?
                .label(format!("{} Volatility", regime))
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 18, y + 6)], color.mix(SHADE_ALPHA).filled())
                });
        }

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|&(date, close, _)| (date, close)),
                BLACK.stroke_width(2),
            ))
            .map_err(render_err)?
            .label(format!("{} Price", analysis.ticker))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], BLACK.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.4))
            .label_font(("sans-serif", 14))
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    info!("Chart saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compute;
    use crate::types::{PricePoint, PriceSeries, RollingWindow, Ticker};
    use chrono::NaiveDate;

    fn analysis() -> RegimeAnalysis {
        let start = NaiveDate::from_ymd_opt(2012, 1, 2).unwrap();
        let prices = PriceSeries::new(
            (0..120)
                .map(|i| PricePoint {
                    date: start + Duration::days(i),
                    close: 100.0 + (i as f64 * 0.3).sin() * (1.0 + (i / 40) as f64),
                })
                .collect(),
        )
        .unwrap();
        compute(Ticker::new("spy"), RollingWindow::Days20, prices).unwrap()
    }

    #[test]
    fn test_chart_title() {
        assert_eq!(
            chart_title(&analysis()),
            "SPY Price with Volatility Regimes (2012-Present)"
        );
    }

    #[test]
    fn test_render_svg_writes_file() {
        let dir = std::env::temp_dir().join(format!("volregime_chart_{}", std::process::id()));
        let path = dir.join("nested").join("chart.svg");

        render_svg(&analysis(), &path, &ChartOptions::default()).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Low Volatility"));
        assert!(svg.contains("SPY Price"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
