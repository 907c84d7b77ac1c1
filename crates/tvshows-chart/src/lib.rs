use std::io::BufWriter;

use ab_glyph::{FontRef, PxScale};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder as _, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};

type Result<T> = anyhow::Result<T>;

pub const CHART_SIZE: u32 = 800;

const FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const LEFT: u32 = 70;
const RIGHT: u32 = 20;
const LEGEND_WIDTH: u32 = 170;
const TOP: u32 = 60;
const BOTTOM: u32 = 80;
const GRID_LINES: u32 = 5;
const BAR_FILL: f64 = 0.8;

const TITLE_SCALE: f32 = 22.0;
const LABEL_SCALE: f32 = 14.0;
const LEGEND_SWATCH: u32 = 12;
const LEGEND_ROW: u32 = 20;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);

pub const PALETTE: [Rgb<u8>; 10] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
    Rgb([188, 189, 34]),
    Rgb([23, 190, 207]),
];

/// Texts around the plot area.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    pub title: &'a str,
    pub y_axis: &'a str,
    /// One name per bar, drawn under the bar.
    pub categories: &'a [String],
}

/// PNG with one bar per value, bars scaled to the largest value.
pub fn bar_chart(labels: Labels<'_>, values: &[f64]) -> Result<Vec<u8>> {
    let stacks: Vec<Vec<f64>> = values.iter().map(|v| vec![*v]).collect();
    render(labels, &[], &stacks)
}

/// PNG with one stacked bar per entry and a legend naming the `series`.
/// Segment `i` of every bar gets the color of `series[i]`.
pub fn stacked_bar_chart(labels: Labels<'_>, series: &[String], stacks: &[Vec<f64>]) -> Result<Vec<u8>> {
    if stacks.iter().any(|s| s.len() != series.len()) {
        anyhow::bail!("Every stack needs one value per series");
    }
    render(labels, series, stacks)
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    if width > 0 && height > 0 {
        draw_filled_rect_mut(img, Rect::at(x as i32, y as i32).of_size(width, height), color);
    }
}

/// Drops trailing characters until `text` fits into `width` pixels.
fn fit(font: &FontRef<'_>, scale: PxScale, text: &str, width: u32) -> String {
    let mut fitted = text.to_string();
    while !fitted.is_empty() && text_size(scale, font, &fitted).0 > width {
        fitted.pop();
    }
    fitted
}

fn tick_label(value: f64) -> String {
    if value >= 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn render(labels: Labels<'_>, series: &[String], stacks: &[Vec<f64>]) -> Result<Vec<u8>> {
    if stacks.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        anyhow::bail!("Chart values must be finite and non-negative");
    }
    if labels.categories.len() != stacks.len() {
        anyhow::bail!("Every bar needs a category name");
    }
    let font = FontRef::try_from_slice(FONT).map_err(|e| anyhow::anyhow!("Invalid chart font: {e}"))?;
    let title_scale = PxScale::from(TITLE_SCALE);
    let label_scale = PxScale::from(LABEL_SCALE);

    let right = if series.is_empty() { RIGHT } else { LEGEND_WIDTH };
    let plot_width = CHART_SIZE - LEFT - right;
    let plot_height = CHART_SIZE - TOP - BOTTOM;
    let baseline = CHART_SIZE - BOTTOM;
    let mut img = RgbImage::from_pixel(CHART_SIZE, CHART_SIZE, BACKGROUND);

    let title = fit(&font, title_scale, labels.title, CHART_SIZE - 20);
    let (title_width, _) = text_size(title_scale, &font, &title);
    draw_text_mut(
        &mut img,
        AXIS,
        ((CHART_SIZE - title_width) / 2) as i32,
        12,
        title_scale,
        &font,
        &title,
    );
    draw_text_mut(&mut img, AXIS, 10, (TOP - 22) as i32, label_scale, &font, labels.y_axis);

    let max_total = stacks
        .iter()
        .map(|s| s.iter().sum::<f64>())
        .fold(0.0, f64::max);

    for i in 1..=GRID_LINES {
        let y = baseline - plot_height * i / GRID_LINES;
        fill_rect(&mut img, LEFT, y, plot_width, 1, GRID);
        if max_total > 0.0 {
            let tick = tick_label(max_total * i as f64 / GRID_LINES as f64);
            let (w, h) = text_size(label_scale, &font, &tick);
            draw_text_mut(
                &mut img,
                AXIS,
                LEFT.saturating_sub(w + 6) as i32,
                y.saturating_sub(h / 2) as i32,
                label_scale,
                &font,
                &tick,
            );
        }
    }

    if !stacks.is_empty() {
        let slot = plot_width as f64 / stacks.len() as f64;
        let bar_width = (slot * BAR_FILL).max(1.0);
        let stagger = labels
            .categories
            .iter()
            .any(|c| text_size(label_scale, &font, c).0 as f64 > slot);
        for (i, stack) in stacks.iter().enumerate() {
            let x = LEFT + (slot * i as f64 + (slot - bar_width) / 2.0).round() as u32;
            if max_total > 0.0 {
                let mut bottom = baseline as f64;
                for (j, value) in stack.iter().enumerate() {
                    let top = bottom - value / max_total * plot_height as f64;
                    let (y_top, y_bottom) = (top.round() as u32, bottom.round() as u32);
                    fill_rect(
                        &mut img,
                        x,
                        y_top,
                        bar_width.round() as u32,
                        y_bottom - y_top,
                        PALETTE[j % PALETTE.len()],
                    );
                    bottom = top;
                }
            }

            // crowded names alternate between two rows and may use two slots
            let (row, room) = if stagger { ((i % 2) as u32, 2.0 * slot) } else { (0, slot) };
            let name = fit(&font, label_scale, &labels.categories[i], room as u32);
            let (w, h) = text_size(label_scale, &font, &name);
            let center = LEFT as f64 + slot * (i as f64 + 0.5);
            let x = (center - w as f64 / 2.0).max(0.0) as i32;
            let y = baseline + 8 + row * (h + 6);
            draw_text_mut(&mut img, AXIS, x, y as i32, label_scale, &font, &name);
        }
    }

    let legend_x = CHART_SIZE - LEGEND_WIDTH + 12;
    for (k, name) in series.iter().enumerate() {
        let y = TOP + k as u32 * LEGEND_ROW;
        if y + LEGEND_ROW > baseline {
            break;
        }
        fill_rect(&mut img, legend_x, y, LEGEND_SWATCH, LEGEND_SWATCH, PALETTE[k % PALETTE.len()]);
        let room = LEGEND_WIDTH - 12 - LEGEND_SWATCH - 6 - 4;
        let name = fit(&font, label_scale, name, room);
        draw_text_mut(
            &mut img,
            AXIS,
            (legend_x + LEGEND_SWATCH + 6) as i32,
            y as i32 - 1,
            label_scale,
            &font,
            &name,
        );
    }

    fill_rect(&mut img, LEFT, TOP, 2, plot_height, AXIS);
    fill_rect(&mut img, LEFT, baseline, plot_width, 2, AXIS);

    let data = Vec::with_capacity(16 * 1024);
    let mut writer = BufWriter::new(data);
    PngEncoder::new(&mut writer).write_image(
        img.as_raw(),
        CHART_SIZE,
        CHART_SIZE,
        ExtendedColorType::Rgb8,
    )?;
    Ok(writer.into_inner()?)
}
