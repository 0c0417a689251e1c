use chrono::{Datelike, NaiveDate};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Polygon};

use crate::pipeline::RegimeAnalysis;
use crate::regime::{RegimeLabel, RegimeStats};

use super::state::InlineError;

const PRICE_PLOT_HEIGHT: f32 = 560.0;

/// Plot x coordinate for a date
pub fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Date nearest to a plot x coordinate
pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

fn regime_color(regime: RegimeLabel, alpha: u8) -> egui::Color32 {
    let (r, g, b) = regime.rgb();
    egui::Color32::from_rgba_unmultiplied(r, g, b, alpha)
}

pub fn render_intro(ui: &mut egui::Ui) {
    ui.heading("Volatility Regime Analyzer");
    ui.add_space(4.0);
    ui.label(
        "Rolling volatility is classified into three regimes by its percentile in the full \
         history. Background shading marks the regime in force at each date.",
    );
    ui.add_space(8.0);
}

pub fn render_error(ui: &mut egui::Ui, error: &InlineError) {
    egui::Frame::group(ui.style())
        .fill(egui::Color32::from_rgba_unmultiplied(220, 50, 50, 24))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), format!("⚠ {}", error.title));
            ui.label(&error.message);
        });
    ui.add_space(8.0);
}

pub fn render_summary(ui: &mut egui::Ui, analysis: &RegimeAnalysis) {
    ui.horizontal(|ui| {
        for regime in RegimeLabel::ALL {
            metric_card(ui, analysis.summary.get(regime));
        }

        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(8.0))
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.small("Thresholds (p33 / p67)");
                    ui.strong(format!(
                        "{:.1}% / {:.1}%",
                        analysis.thresholds.p33 * 100.0,
                        analysis.thresholds.p67 * 100.0
                    ));
                    if let Some(current) = analysis.current_regime() {
                        ui.colored_label(
                            regime_color(current, 255),
                            format!("Current: {}", current),
                        );
                    }
                });
            });
    });
    ui.add_space(8.0);
}

fn metric_card(ui: &mut egui::Ui, stats: &RegimeStats) {
    egui::Frame::group(ui.style())
        .fill(regime_color(stats.regime, 40))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            ui.set_min_width(160.0);
            ui.vertical(|ui| {
                ui.small(format!("{} Volatility", stats.regime));
                ui.strong(format!("{} days", stats.count));
                ui.label(format!("{:.1}%", stats.percentage));
                match stats.mean_volatility {
                    Some(mean) => ui.small(format!("mean vol {:.1}%", mean * 100.0)),
                    None => ui.small("mean vol -"),
                };
            });
        });
}

pub fn render_price_plot(ui: &mut egui::Ui, analysis: &RegimeAnalysis) {
    let labeled = analysis.labeled_prices();
    let lo = labeled.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let hi = labeled.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.05).max(1e-6);
    let (y0, y1) = (lo - pad, hi + pad);

    let price_points: PlotPoints = labeled
        .iter()
        .map(|&(date, close, _)| [date_to_x(date), close])
        .collect();

    let title = crate::chart::chart_title(analysis);
    ui.strong(title);

    Plot::new("regime_price_plot")
        .height(PRICE_PLOT_HEIGHT)
        .allow_drag(true)
        .allow_zoom(true)
        .allow_scroll(true)
        .x_axis_label("Date")
        .y_axis_label("Price (USD)")
        .x_axis_formatter(|mark, _range| {
            x_to_date(mark.value)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .label_formatter(|_name, value| match x_to_date(value.x) {
            Some(date) => format!("Date: {}\nPrice: ${:.2}", date, value.y),
            None => String::new(),
        })
        .show(ui, |plot_ui| {
            for span in &analysis.spans {
                let (x0, x1) = (date_to_x(span.start), date_to_x(span.end));
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]))
                        .fill_color(regime_color(span.regime, 77))
                        .stroke(egui::Stroke::NONE),
                );
            }

            plot_ui.line(
                Line::new(price_points)
                    .name("Price")
                    .color(egui::Color32::BLACK)
                    .width(2.0),
            );
        });
}

pub fn render_legend(ui: &mut egui::Ui) {
    ui.add_space(8.0);
    ui.separator();
    ui.heading("Legend");
    ui.horizontal(|ui| {
        for regime in RegimeLabel::ALL {
            ui.colored_label(regime_color(regime, 255), "■");
            ui.label(format!("{} Volatility: {}", regime, regime.description()));
            ui.add_space(16.0);
        }
    });
}

pub fn render_caption(ui: &mut egui::Ui, analysis: &RegimeAnalysis) {
    ui.add_space(4.0);
    ui.separator();
    if let Some((first, last)) = analysis.date_span() {
        ui.small(format!(
            "Data range: {} to {} | Total trading days: {} | Rolling window: {} days",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d"),
            analysis.prices.len(),
            analysis.window.days()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_axis_round_trip() {
        let date = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
        assert_eq!(x_to_date(date_to_x(date)), Some(date));
        assert_eq!(x_to_date(date_to_x(date) + 0.4), Some(date));
    }
}
