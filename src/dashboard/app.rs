use anyhow::Result;
use eframe::egui;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::data::{PriceProvider, YahooFetcher};
use crate::pipeline::CachedAnalyzer;
use crate::types::RollingWindow;

use super::state::DashboardState;
use super::view;

/// Main application struct for eframe
pub struct RegimeDashboardApp {
    pub state: DashboardState<Box<dyn PriceProvider>>,
    /// A loading frame has been painted; the pending refresh runs next frame
    loading_painted: bool,
}

impl RegimeDashboardApp {
    pub fn new(config: &Config, provider: Box<dyn PriceProvider>) -> Self {
        let ttl = config.dashboard.cache_ttl_secs.map(Duration::from_secs);
        let analyzer = CachedAnalyzer::new(provider, config.analysis.date_range(), ttl);

        Self {
            state: DashboardState::new(
                analyzer,
                &config.analysis.ticker(),
                config.analysis.window,
            ),
            loading_painted: false,
        }
    }

    fn render_settings(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        ui.label("Ticker Symbol");
        let response = ui
            .text_edit_singleline(&mut self.state.ticker_input)
            .on_hover_text("Enter a stock ticker symbol (e.g., SPY, AAPL, MSFT)");
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if response.lost_focus() && !submitted {
            self.state.commit_ticker_edit();
        }

        ui.add_space(8.0);
        let mut window = self.state.window;
        egui::ComboBox::from_label("Rolling Window (days)")
            .selected_text(window.days().to_string())
            .show_ui(ui, |ui| {
                for option in RollingWindow::ALL {
                    ui.selectable_value(&mut window, option, option.days().to_string());
                }
            });
        self.state.select_window(window);

        ui.add_space(8.0);
        if submitted || ui.button("Analyze").clicked() {
            self.state.submit_ticker();
        }

        ui.add_space(16.0);
        ui.separator();
        ui.small(format!("{} cached analyses", self.state.cached_count()));
    }
}

impl eframe::App for RegimeDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.needs_refresh && self.loading_painted {
            self.state.refresh();
            self.loading_painted = false;
        }

        egui::SidePanel::left("settings_panel")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| self.render_settings(ui));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.state.needs_refresh {
                    ui.spinner();
                    ui.label(format!("Loading data for {}...", self.state.ticker()));
                } else {
                    ui.label(&self.state.status_message);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink(false).show(ui, |ui| {
                view::render_intro(ui);

                if let Some(error) = &self.state.error {
                    view::render_error(ui, error);
                }

                match &self.state.analysis {
                    Some(analysis) => {
                        view::render_summary(ui, analysis);
                        view::render_price_plot(ui, analysis);
                        view::render_legend(ui);
                        view::render_caption(ui, analysis);
                    }
                    None if self.state.error.is_none() => {
                        ui.label("Loading...");
                    }
                    None => {}
                }
            });
        });

        if self.state.needs_refresh {
            self.loading_painted = true;
            ctx.request_repaint();
        }
    }
}

/// Open the dashboard window backed by the Yahoo Finance fetcher
pub fn run_dashboard(config: &Config) -> Result<()> {
    let provider: Box<dyn PriceProvider> = Box::new(YahooFetcher::new(&config.fetch)?);
    let app = RegimeDashboardApp::new(config, provider);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.dashboard.width, config.dashboard.height])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    info!("Opening dashboard for {}", config.analysis.ticker());
    eframe::run_native(
        "Volatility Regime Analyzer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("Dashboard failed: {}", e))
}
