//! Plot data and text rendering.
//!
//! Two charts are produced: a volcano-style scatter of the gene scores
//! (`|diff_expr|` against `diff_expr`) and a bar chart of the combined
//! scores of the top enrichment terms.

use crate::models::{EnrichmentTerm, PathwayBar, PlotData, ScoredGene, VolcanoPoint};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Longest term label shown in the bar chart.
const MAX_LABEL_CHARS: usize = 40;

/// Volcano points for every scored gene.
pub fn volcano_points(genes: &[ScoredGene]) -> Vec<VolcanoPoint> {
    genes
        .iter()
        .filter_map(|g| {
            g.diff_expr.map(|d| VolcanoPoint {
                gene_symbol: g.display_name().to_string(),
                x: d,
                y: d.abs(),
                up: d > 0.0,
            })
        })
        .collect()
}

/// Bars for the first `n` terms.
pub fn pathway_bars(terms: &[EnrichmentTerm], n: usize) -> Vec<PathwayBar> {
    terms
        .iter()
        .take(n)
        .map(|t| PathwayBar {
            term: t.term.clone(),
            combined_score: t.combined_score,
        })
        .collect()
}

/// Build both plots.
pub fn build_plot_data(
    genes: &[ScoredGene],
    terms: Option<&[EnrichmentTerm]>,
    top_terms: usize,
) -> PlotData {
    PlotData {
        volcano: volcano_points(genes),
        pathways: terms.map(|t| pathway_bars(t, top_terms)).unwrap_or_default(),
    }
}

/// Render the volcano points on a `width` x `height` character grid.
///
/// `+` marks up-regulated genes, `-` down-regulated ones, `0` no change.
pub fn render_volcano(points: &[VolcanoPoint], width: usize, height: usize) -> String {
    let width = width.max(3);
    let height = height.max(2);
    let mut grid = vec![vec![' '; width]; height];

    let x_max = points.iter().map(|p| p.x.abs()).fold(0.0, f64::max);
    let y_max = points.iter().map(|p| p.y).fold(0.0, f64::max);

    for point in points {
        let col = if x_max > 0.0 {
            ((point.x + x_max) / (2.0 * x_max) * (width - 1) as f64).round() as usize
        } else {
            width / 2
        };
        let row = if y_max > 0.0 {
            height - 1 - (point.y / y_max * (height - 1) as f64).round() as usize
        } else {
            height - 1
        };
        grid[row][col.min(width - 1)] = if point.up {
            '+'
        } else if point.x < 0.0 {
            '-'
        } else {
            '0'
        };
    }

    let mut out = String::new();
    for (i, line) in grid.iter().enumerate() {
        let label = if i == 0 {
            format!("{:>8.3}", y_max)
        } else if i == height - 1 {
            format!("{:>8.3}", 0.0)
        } else {
            " ".repeat(8)
        };
        out.push_str(&format!("{} |{}\n", label, line.iter().collect::<String>().trim_end()));
    }
    out.push_str(&format!("{} +{}\n", " ".repeat(8), "-".repeat(width)));
    out.push_str(&format!(
        "{}  {:<w$}{:>w2$}\n",
        " ".repeat(8),
        format!("{:.3}", -x_max),
        format!("{:.3}", x_max),
        w = width / 2,
        w2 = width - width / 2
    ));

    out
}

/// Render horizontal bars scaled to the largest combined score.
pub fn render_bar_chart(bars: &[PathwayBar], width: usize) -> String {
    let max = bars.iter().map(|b| b.combined_score).fold(0.0, f64::max);
    let label_width = bars
        .iter()
        .map(|b| truncate_label(&b.term).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for bar in bars {
        let len = if max > 0.0 {
            (bar.combined_score.max(0.0) / max * width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{:<lw$} | {} {:.2}\n",
            truncate_label(&bar.term),
            "█".repeat(len),
            bar.combined_score,
            lw = label_width
        ));
    }

    out
}

fn truncate_label(term: &str) -> String {
    if term.chars().count() <= MAX_LABEL_CHARS {
        term.to_string()
    } else {
        let mut label: String = term.chars().take(MAX_LABEL_CHARS - 1).collect();
        label.push('…');
        label
    }
}

/// Write `volcano.csv` and `pathways.csv` into `dir`.
pub fn write_plot_data(plots: &PlotData, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create plot directory: {}", dir.display()))?;

    let volcano_path = dir.join("volcano.csv");
    let mut writer = csv::Writer::from_path(&volcano_path)
        .with_context(|| format!("Failed to create {}", volcano_path.display()))?;
    for point in &plots.volcano {
        writer.serialize(point)?;
    }
    writer.flush()?;

    let pathways_path = dir.join("pathways.csv");
    let mut writer = csv::Writer::from_path(&pathways_path)
        .with_context(|| format!("Failed to create {}", pathways_path.display()))?;
    for bar in &plots.pathways {
        writer.serialize(bar)?;
    }
    writer.flush()?;

    info!("Wrote plot data to {}", dir.display());
    Ok(())
}
