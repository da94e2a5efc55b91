//! Visualization utilities for GA-TSP solutions.
//!
//! Generates SVG drawings of tours and of the best-score curve, plus plain
//! text exports for external plotting.

use crate::instance::TspInstance;
use crate::solution::Solution;
use std::fs::File;
use std::io::Write;
use std::path::Path;
#[cfg(not(feature = "native-png"))]
use std::process::Command;
#[cfg(feature = "native-png")]
use resvg::render;
#[cfg(feature = "native-png")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "native-png")]
use resvg::usvg;
#[cfg(feature = "native-png")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "native-png")]
use resvg::FitTo;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// City radius
    pub node_radius: f64,
    /// Draw city indices next to the markers
    pub labels: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 6.0,
            labels: true,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// SVG of the cities with the closed tour drawn over them
    pub fn generate_svg(&self, instance: &TspInstance, solution: &Solution) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = instance.bounds();

        let span = |lo: f64, hi: f64| if hi > lo { hi - lo } else { 1.0 };
        let scale_x = (self.width - 2.0 * self.margin) / span(min_x, max_x);
        let scale_y = (self.height - 2.0 * self.margin) / span(min_y, max_y);
        let scale = scale_x.min(scale_y);

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .city {{ fill: #3498db; stroke: #2c3e50; stroke-width: 2; }}
    .anchor {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 2; }}
    .edge {{ stroke: #34495e; stroke-width: 2; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        let generations = solution
            .iterations
            .map(|g| format!(" | Generations: {}", g))
            .unwrap_or_default();
        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">{} | {} | Length: {:.4}{}</text>
"##,
            self.margin, instance.name, solution.algorithm, solution.cost, generations
        ));

        let transform = |x: f64, y: f64| -> (f64, f64) {
            let tx = self.margin + (x - min_x) * scale;
            let ty = self.height - self.margin - (y - min_y) * scale;
            (tx, ty)
        };

        if solution.tour.len() > 1 {
            let points: Vec<String> = solution
                .closed_tour()
                .iter()
                .filter_map(|&c| instance.cities.get(c))
                .map(|city| {
                    let (x, y) = transform(city.x, city.y);
                    format!("{:.2},{:.2}", x, y)
                })
                .collect();
            svg.push_str(&format!(
                r#"<polyline points="{}" class="edge"/>
"#,
                points.join(" ")
            ));
        }

        let anchor = instance.anchor();
        for (index, city) in instance.cities.iter().enumerate() {
            let (x, y) = transform(city.x, city.y);
            let class = if index == anchor { "anchor" } else { "city" };
            let radius = if index == anchor { self.node_radius * 1.5 } else { self.node_radius };

            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="{}"/>
"##,
                x, y, radius, class
            ));

            if self.labels {
                svg.push_str(&format!(
                    r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                    x,
                    y - radius - 3.0,
                    index
                ));
            }
        }

        let legend_y = self.height - 30.0;
        svg.push_str(&format!(
            r##"
<rect x="{}" y="{}" width="15" height="15" class="anchor"/>
<text x="{}" y="{}" class="label">Anchor</text>
<rect x="{}" y="{}" width="15" height="15" class="city"/>
<text x="{}" y="{}" class="label">City</text>
"##,
            self.margin,
            legend_y,
            self.margin + 20.0,
            legend_y + 12.0,
            self.margin + 80.0,
            legend_y,
            self.margin + 100.0,
            legend_y + 12.0
        ));

        svg.push_str("</svg>");

        svg
    }

    /// Line chart of the best score per generation
    pub fn generate_convergence_svg(&self, history: &[f64], title: &str) -> String {
        let mut svg = String::new();

        let width = self.width;
        let height = 400.0;
        let margin = 60.0;

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .line {{ stroke: #3498db; stroke-width: 2; fill: none; }}
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .label {{ font-family: Arial; font-size: 12px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            width, height, width, height
        ));

        svg.push_str(&format!(
            r#"<text x="{}" y="25" class="title">Convergence - {}</text>
"#,
            margin, title
        ));

        let plot_width = width - 2.0 * margin;
        let plot_height = height - 2.0 * margin;
        let bottom = height - margin;

        svg.push_str(&format!(
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" class="axis"/>
<line x1="{}" y1="{}" x2="{}" y2="{}" class="axis"/>
"##,
            margin, bottom, width - margin, bottom, margin, margin, margin, bottom
        ));

        let finite: Vec<f64> = history.iter().copied().filter(|s| s.is_finite()).collect();
        if !finite.is_empty() {
            let y_min = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let y_max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let y_span = if y_max > y_min { y_max - y_min } else { 1.0 };
            let x_scale = plot_width / (finite.len().saturating_sub(1)).max(1) as f64;
            let y_scale = plot_height / y_span;

            let mut path = String::new();
            for (i, &score) in finite.iter().enumerate() {
                let x = margin + i as f64 * x_scale;
                let y = bottom - (score - y_min) * y_scale;

                if i == 0 {
                    path.push_str(&format!("M {:.2} {:.2}", x, y));
                } else {
                    path.push_str(&format!(" L {:.2} {:.2}", x, y));
                }
            }

            svg.push_str(&format!(
                r##"<path d="{}" class="line"/>
"##,
                path
            ));

            svg.push_str(&format!(
                r##"<text x="{}" y="{}" class="label" text-anchor="end">{:.2}</text>
<text x="{}" y="{}" class="label" text-anchor="end">{:.2}</text>
<text x="{}" y="{}" class="label">0</text>
<text x="{}" y="{}" class="label" text-anchor="end">{}</text>
<text x="{}" y="{}" class="label" text-anchor="middle">generation</text>
"##,
                margin - 5.0,
                margin + 4.0,
                y_max,
                margin - 5.0,
                bottom + 4.0,
                y_min,
                margin,
                bottom + 18.0,
                width - margin,
                bottom + 18.0,
                finite.len() - 1,
                margin + plot_width / 2.0,
                bottom + 36.0
            ));
        }

        svg.push_str("</svg>");

        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG. Uses the built-in renderer with the `native-png`
    /// feature, otherwise tries `rsvg-convert`, `magick` and `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let path = path.as_ref();

        #[cfg(feature = "native-png")]
        {
            return self.render_png(svg, path);
        }

        #[cfg(not(feature = "native-png"))]
        {
            convert_with_external_tool(svg, path)
        }
    }

    #[cfg(feature = "native-png")]
    fn render_png(&self, svg: &str, path: &Path) -> std::io::Result<()> {
        let other = |msg: String| std::io::Error::new(std::io::ErrorKind::Other, msg);

        let opt = usvg::Options::default();
        let rtree = usvg::Tree::from_str(svg, &opt).map_err(|e| other(format!("usvg parse error: {}", e)))?;

        let w = svg_dimension(svg, "width").unwrap_or(self.width) as u32;
        let h = svg_dimension(svg, "height").unwrap_or(self.height) as u32;
        let mut pixmap = Pixmap::new(w.max(1), h.max(1)).ok_or_else(|| other("Failed to create pixmap".to_string()))?;
        render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
            .ok_or_else(|| other("resvg render failed".to_string()))?;
        pixmap.save_png(path).map_err(|e| other(format!("save_png failed: {}", e)))
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, instance: &TspInstance, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# GA-TSP Solution Data\n");
        data.push_str(&format!("# Instance: {}\n", instance.name));
        data.push_str(&format!("# Length: {:.4}\n", solution.cost));
        data.push_str(&format!("# Algorithm: {}\n\n", solution.algorithm));

        data.push_str("# Cities: index, x, y, anchor\n");
        let anchor = instance.anchor();
        for (index, city) in instance.cities.iter().enumerate() {
            data.push_str(&format!("{},{},{},{}\n", index, city.x, city.y, index == anchor));
        }

        data.push_str("\n# Tour: closed sequence of city indices\n");
        let tour_str: Vec<String> = solution.closed_tour().iter().map(|n| n.to_string()).collect();
        data.push_str(&tour_str.join(","));
        data.push('\n');

        data
    }
}

/// Read a numeric `width="…"` style attribute from the SVG header
#[cfg_attr(not(feature = "native-png"), allow(dead_code))]
fn svg_dimension(svg: &str, attribute: &str) -> Option<f64> {
    let key = format!("{}=\"", attribute);
    let (_, rest) = svg.split_once(key.as_str())?;
    let (value, _) = rest.split_once('"')?;
    value.parse().ok()
}

#[cfg(not(feature = "native-png"))]
fn convert_with_external_tool(svg: &str, path: &Path) -> std::io::Result<()> {
    let tmp_svg = path.with_extension("svg.tmp");
    std::fs::write(&tmp_svg, svg)?;

    let out = path.to_string_lossy();
    let input = tmp_svg.to_string_lossy();
    let attempts: [(&str, Vec<&str>); 3] = [
        ("rsvg-convert", vec!["-o", out.as_ref(), input.as_ref()]),
        ("magick", vec!["convert", input.as_ref(), out.as_ref()]),
        ("inkscape", vec![input.as_ref(), "--export-type=png", "--export-filename", out.as_ref()]),
    ];

    for (program, args) in &attempts {
        if let Ok(status) = Command::new(program).args(args).status() {
            if status.success() {
                let _ = std::fs::remove_file(&tmp_svg);
                return Ok(());
            }
        }
    }

    let _ = std::fs::remove_file(&tmp_svg);
    Err(std::io::Error::new(
        std::io::ErrorKind::Other,
        "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)",
    ))
}
