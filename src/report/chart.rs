//! Stacked bar chart rendering.
//!
//! One bar per period, one stacked segment per contact type, drawn with
//! plotters to SVG or PNG depending on the output path.

use crate::cli::ChartFormat;
use crate::config::ChartConfig;
use crate::models::PivotTable;
use anyhow::{anyhow, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Segment colours, cycled when there are more contact types.
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Gray
    RGBColor(188, 189, 34),  // Olive
    RGBColor(23, 190, 207),  // Cyan
];

/// Bar width as a fraction of one period slot.
const BAR_WIDTH: f64 = 0.8;

/// Most x-axis labels drawn, however many periods there are.
const MAX_X_LABELS: usize = 12;

/// Chart appearance.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self::from(&ChartConfig::default())
    }
}

impl From<&ChartConfig> for ChartOptions {
    fn from(config: &ChartConfig) -> Self {
        Self {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

/// Colour of the n-th contact-type series.
pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Render the table as a stacked bar chart at `path`.
pub fn render_chart(table: &PivotTable, path: &Path, options: &ChartOptions) -> Result<()> {
    let format = ChartFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unsupported chart format: {}", path.display()))?;
    let size = (options.width, options.height);

    debug!(
        "Rendering {:?} chart {}x{} with {} periods",
        format,
        options.width,
        options.height,
        table.periods.len()
    );

    match format {
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_stacked_bars(&root, table, options)?;
            root.present()?;
        }
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_stacked_bars(&root, table, options)?;
            root.present()?;
        }
    }

    info!("Chart written to {}", path.display());
    Ok(())
}

/// Delete a chart left at `path` by an earlier run.
///
/// Returns whether a file was removed.
pub fn remove_stale_chart(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(path)
        .with_context(|| format!("Failed to remove stale chart {}", path.display()))?;
    debug!("Removed stale chart {}", path.display());
    Ok(true)
}

fn draw_stacked_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    table: &PivotTable,
    options: &ChartOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let labels: Vec<String> = table
        .periods
        .iter()
        .map(|p| p.format("%Y-%m-%d").to_string())
        .collect();
    let slots = labels.len().max(1);

    let max_total = table.row_totals().into_iter().max().unwrap_or(0).max(1);
    let y_max = max_total + max_total / 10 + 1;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), 0u64..y_max)?;

    let label_for = |x: &f64| -> String {
        let nearest = x.round();
        if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
            return String::new();
        }
        labels.get(nearest as usize).cloned().unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots.min(MAX_X_LABELS))
        .x_label_formatter(&label_for)
        .y_label_formatter(&|y| y.to_string())
        .x_desc("Date")
        .y_desc("Number of Violations")
        .draw()?;

    let mut stacked = vec![0u64; table.periods.len()];

    for (col, contact) in table.contact_types.iter().enumerate() {
        let color = series_color(col);

        let mut bars = Vec::new();
        for (row, counts) in table.counts.iter().enumerate() {
            let count = counts[col];
            if count == 0 {
                continue;
            }
            let bottom = stacked[row];
            let top = bottom + count;
            stacked[row] = top;

            let center = row as f64;
            bars.push(Rectangle::new(
                [
                    (center - BAR_WIDTH / 2.0, bottom),
                    (center + BAR_WIDTH / 2.0, top),
                ],
                color.filled(),
            ));
        }

        chart
            .draw_series(bars)?
            .label(contact.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Granularity;
    use chrono::NaiveDate;

    fn create_test_table() -> PivotTable {
        PivotTable {
            granularity: Granularity::Weekly,
            periods: vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            ],
            contact_types: vec!["Officer".to_string(), "Warning".to_string()],
            counts: vec![vec![3, 1], vec![0, 2]],
        }
    }

    #[test]
    fn test_series_color_cycles() {
        assert_eq!(series_color(0), series_color(PALETTE.len()));
        assert_ne!(series_color(0), series_color(1));
    }

    #[test]
    fn test_render_svg_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");

        render_chart(&create_test_table(), &path, &ChartOptions::default()).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Violations by Contact Type"));
        assert!(svg.contains("Officer"));
        assert!(svg.contains("Warning"));
    }

    #[test]
    fn test_render_single_period_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.svg");
        let table = PivotTable {
            granularity: Granularity::Monthly,
            periods: vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
            contact_types: vec!["Officer".to_string()],
            counts: vec![vec![2]],
        };

        render_chart(&table, &path, &ChartOptions::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_render_png_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");

        let options = ChartOptions {
            title: "Test".to_string(),
            width: 320,
            height: 200,
        };
        render_chart(&create_test_table(), &path, &options).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_remove_stale_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");

        render_chart(&create_test_table(), &path, &ChartOptions::default()).unwrap();
        assert!(remove_stale_chart(&path).unwrap());
        assert!(!path.exists());

        assert!(!remove_stale_chart(&path).unwrap());
    }

    #[test]
    fn test_render_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.gif");
        assert!(render_chart(&create_test_table(), &path, &ChartOptions::default()).is_err());
    }
}
