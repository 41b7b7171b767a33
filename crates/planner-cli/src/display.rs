//! Terminal output: progress bar, per-layer tables and run summary.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use planner_core::{LayerGeometry, LayerReport, TensorShape};

use crate::colors::{Paint, Tone};
use crate::driver::RunSummary;

const NAME_WIDTH: usize = 16;
const KIND_WIDTH: usize = 18;
const SHAPE_WIDTH: usize = 22;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn create_progress_bar(&self, total_layers: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total_layers);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} layer {pos}/{len} [{bar:32.green/white}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        progress_bar
    }

    pub fn show_header(&self, title: &str, input: TensorShape) {
        println!();
        println!("  {} {}", "e-planner".tone(Tone::Shape).bold(), title.tone(Tone::Label));
        println!("  {} {}", "input".tone(Tone::Label), input.to_string().as_str().tone(Tone::Shape));
        println!();
    }

    fn table_header(&self) {
        println!(
            "  {:<NAME_WIDTH$} {:<KIND_WIDTH$} {:<SHAPE_WIDTH$} {:<SHAPE_WIDTH$} {}",
            "Layer".bold(),
            "Type".bold(),
            "Input".bold(),
            "Output".bold(),
            "Status".bold(),
        );
        println!(
            "  {}",
            "-".repeat(NAME_WIDTH + KIND_WIDTH + 2 * SHAPE_WIDTH + 12).as_str().tone(Tone::Label)
        );
    }

    fn row(&self, name: &str, kind: &str, input: TensorShape, output: TensorShape, status: &str, tone: Tone) {
        println!(
            "  {:<NAME_WIDTH$} {:<KIND_WIDTH$} {:<SHAPE_WIDTH$} {:<SHAPE_WIDTH$} {}",
            name,
            kind,
            input.to_string(),
            output.to_string(),
            status.tone(tone),
        );
    }

    /// Shape-inference table for `inspect`.
    pub fn show_geometries(&self, geometries: &[LayerGeometry]) {
        self.table_header();
        for g in geometries {
            let status = if g.kind.is_hardware_modeled() {
                format!("k{}x{} s{} p{}", g.kernel_height, g.kernel_width, g.stride, g.padding_width)
            } else {
                "pass".to_string()
            };
            self.row(
                &g.layer_name,
                g.kind.as_str(),
                g.input_shape(),
                g.output_shape(),
                &status,
                Tone::for_kind(g.kind),
            );
        }
        println!();
    }

    fn report_row(&self, report: &LayerReport) {
        let status = if report.simulated() {
            format!("done {:.2}s", report.elapsed.as_secs_f64())
        } else {
            "pass".to_string()
        };
        self.row(
            &report.layer,
            report.kind.as_str(),
            report.input,
            report.output,
            &status,
            Tone::for_kind(report.kind),
        );
    }

    pub fn show_summary(&self, summary: &RunSummary) {
        self.table_header();
        for report in &summary.reports {
            self.report_row(report);
        }
        for skipped in &summary.skipped {
            println!(
                "  {:<NAME_WIDTH$} {}",
                skipped.layer,
                format!("skipped: {}", skipped.error).as_str().tone(Tone::Failed),
            );
        }
        println!();

        let simulated = summary.reports.iter().filter(|r| r.simulated()).count();
        let skipped_tone = if summary.skipped.is_empty() {
            Tone::Label
        } else {
            Tone::Skipped
        };
        println!(
            "  {} {} layers simulated, {} passed through, {} skipped",
            summary.network.as_str().tone(Tone::Shape).bold(),
            simulated.to_string().as_str().tone(Tone::Simulated),
            (summary.reports.len() - simulated).to_string().as_str().tone(Tone::PassThrough),
            summary.skipped.len().to_string().as_str().tone(skipped_tone),
        );
        println!("  {} {}", "output".tone(Tone::Label), summary.output.to_string().as_str().tone(Tone::Shape));
        println!("  {} {}", "report".tone(Tone::Label), summary.report_file);
        println!("  {} {}", "elapsed".tone(Tone::Label), format_elapsed(summary.elapsed.as_secs()));
        println!();
    }
}

/// `H hours M min S sec`.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02} hours {:02} min {:02} sec", secs / 3600, (secs % 3600) / 60, secs % 60)
}
