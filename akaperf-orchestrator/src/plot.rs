//! Comparison chart rendering.
//!
//! Renders the 2×2 performance comparison grid (registration time, peak
//! CPU, memory, run duration versus UE count, one series per
//! authentication method) into a PNG next to the consolidated reports.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use akaperf_common::{AuthMethod, Error};

use crate::results::GroupStats;

type Series = Vec<(AuthMethod, Vec<(f64, f64)>)>;

fn series_for(stats: &[GroupStats], metric: impl Fn(&GroupStats) -> Option<f64>) -> Series {
    let mut series: Series = Vec::new();
    for group in stats {
        let Some(value) = metric(group) else { continue };
        let point = (f64::from(group.ue_count), value);
        match series.iter_mut().find(|(m, _)| *m == group.method) {
            Some((_, points)) => points.push(point),
            None => series.push((group.method, vec![point])),
        }
    }
    for (_, points) in &mut series {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    series
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    title: &str,
    y_desc: &str,
    series: &Series,
) -> Result<(), Error> {
    let plot_err = |e: &dyn std::fmt::Display| Error::Plot(format!("{title}: {e}"));

    let x_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.0))
        .fold(0.0, f64::max);
    let y_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.1))
        .fold(0.0, f64::max);
    let x_range = 0.0..(x_max * 1.1).max(1.0);
    let y_range = 0.0..(y_max * 1.15).max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| plot_err(&e))?;

    chart
        .configure_mesh()
        .x_desc("Number of UEs")
        .y_desc(y_desc)
        .draw()
        .map_err(|e| plot_err(&e))?;

    for (idx, (method, points)) in series.iter().enumerate() {
        let color: RGBAColor = Palette99::pick(idx).mix(1.0);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(|e| plot_err(&e))?
            .label(method.to_string())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
            .map_err(|e| plot_err(&e))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| plot_err(&e))?;

    Ok(())
}

/// Renders `performance_comparison.png` from the grouped statistics.
pub fn render_comparison_chart(path: &Path, stats: &[GroupStats]) -> Result<(), Error> {
    if stats.is_empty() {
        return Err(Error::Plot("no statistics to plot".into()));
    }

    let root = BitMapBackend::new(path, (1400, 1100)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| Error::Plot(e.to_string()))?;
    let panels = root.split_evenly((2, 2));

    draw_panel(
        &panels[0],
        "Average Registration Time by UE Count",
        "Registration Time (s)",
        &series_for(stats, |g| g.reg_time_mean),
    )?;
    draw_panel(
        &panels[1],
        "Maximum CPU Usage by UE Count",
        "CPU Usage (%)",
        &series_for(stats, |g| g.max_cpu_mean),
    )?;
    draw_panel(
        &panels[2],
        "Average Memory Usage by UE Count",
        "Memory Usage (MB)",
        &series_for(stats, |g| g.avg_memory_mean),
    )?;
    draw_panel(
        &panels[3],
        "Test Duration by UE Count",
        "Duration (s)",
        &series_for(stats, |g| g.duration_mean),
    )?;

    root.present().map_err(|e| Error::Plot(e.to_string()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(method: AuthMethod, ue_count: u32, reg: f64) -> GroupStats {
        GroupStats {
            method,
            ue_count,
            samples: 3,
            reg_time_mean: Some(reg),
            reg_time_std: Some(0.1),
            max_cpu_mean: Some(40.0),
            max_cpu_std: None,
            avg_memory_mean: Some(128.0),
            avg_memory_std: None,
            duration_mean: Some(65.0),
            duration_std: None,
        }
    }

    #[test]
    fn test_series_for_groups_and_sorts() {
        let input = vec![
            stats(AuthMethod::FiveGAka, 50, 2.0),
            stats(AuthMethod::FiveGAka, 10, 1.0),
            stats(AuthMethod::EapAkaPrime, 10, 3.0),
        ];
        let series = series_for(&input, |g| g.reg_time_mean);
        assert_eq!(series.len(), 2);
        let (method, points) = &series[0];
        assert_eq!(*method, AuthMethod::FiveGAka);
        assert_eq!(points, &vec![(10.0, 1.0), (50.0, 2.0)]);
    }

    #[test]
    fn test_render_comparison_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance_comparison.png");
        let input = vec![
            stats(AuthMethod::FiveGAka, 10, 1.0),
            stats(AuthMethod::FiveGAka, 25, 1.5),
            stats(AuthMethod::EapAkaPrime, 10, 1.2),
            stats(AuthMethod::EapAkaPrime, 25, 1.9),
        ];
        render_comparison_chart(&path, &input).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_render_comparison_chart_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_comparison_chart(&dir.path().join("x.png"), &[]).is_err());
    }
}
