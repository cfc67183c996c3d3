//! PNG-картинки для чата: QR-коды конфигов и график метрик сервера.

use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
use qrcode::QrCode;
use std::io::Cursor;

const CHART_WIDTH: u32 = 600;
const CHART_HEIGHT: u32 = 400;
const CHART_MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
const GREEN: Rgb<u8> = Rgb([44, 160, 44]);
const ORANGE: Rgb<u8> = Rgb([255, 127, 14]);

pub fn qr_png(payload: &str) -> Result<Vec<u8>, anyhow::Error> {
    let qr = QrCode::new(payload.as_bytes())?;
    let image = qr
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(512, 512)
        .build();
    encode_png(DynamicImage::ImageLuma8(image))
}

/// Столбики CPU, RAM и диска по шкале 0..100 с сеткой через 10.
pub fn metrics_chart_png(cpu: f64, ram: f64, disk: f64) -> Result<Vec<u8>, anyhow::Error> {
    let mut image = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);
    let plot_height = CHART_HEIGHT - 2 * CHART_MARGIN;
    let baseline = CHART_HEIGHT - CHART_MARGIN;

    for step in 0..=10 {
        let y = baseline - plot_height * step / 10;
        for x in CHART_MARGIN..CHART_WIDTH - CHART_MARGIN {
            image.put_pixel(x, y, GRID);
        }
    }

    let slot = (CHART_WIDTH - 2 * CHART_MARGIN) / 3;
    for (index, (value, color)) in [(cpu, BLUE), (ram, GREEN), (disk, ORANGE)]
        .into_iter()
        .enumerate()
    {
        let height = bar_height(value, plot_height);
        let left = CHART_MARGIN + slot * index as u32 + slot / 4;
        for x in left..left + slot / 2 {
            for y in baseline - height..baseline {
                image.put_pixel(x, y, color);
            }
        }
    }

    for y in CHART_MARGIN..=baseline {
        image.put_pixel(CHART_MARGIN, y, AXIS);
    }
    for x in CHART_MARGIN..CHART_WIDTH - CHART_MARGIN {
        image.put_pixel(x, baseline, AXIS);
    }

    encode_png(DynamicImage::ImageRgb8(image))
}

fn leading_number(raw: &str) -> f64 {
    let number: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse::<f64>().unwrap_or(0.0)
}

/// Процент CPU или RAM; значение без `%` на графике равно 0.
pub fn percent_value(raw: Option<&str>) -> f64 {
    match raw {
        Some(raw) if raw.contains('%') => leading_number(raw),
        _ => 0.0,
    }
}

/// Занятый диск в GB: `12.5 GB` -> 12.5.
pub fn disk_value(raw: Option<&str>) -> f64 {
    raw.map(|raw| leading_number(raw.replace("GB", "").trim()))
        .unwrap_or(0.0)
}

fn bar_height(value: f64, plot_height: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(0.0, 100.0) / 100.0 * f64::from(plot_height)).round() as u32
}

fn encode_png(image: DynamicImage) -> Result<Vec<u8>, anyhow::Error> {
    let mut bytes = Vec::new();
    {
        let mut cursor = Cursor::new(&mut bytes);
        image.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn qr_is_png_of_minimum_size() {
        let bytes = qr_png("[Interface]\nPrivateKey = abc\n").unwrap();
        assert_eq!(&bytes[..8], &PNG_MAGIC);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.width() >= 512);
        assert!(decoded.height() >= 512);
    }

    #[test]
    fn chart_draws_bars_in_their_colours() {
        let bytes = metrics_chart_png(50.0, 100.0, 0.0).unwrap();
        assert_eq!(&bytes[..8], &PNG_MAGIC);
        let chart = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(chart.dimensions(), (CHART_WIDTH, CHART_HEIGHT));

        let slot = (CHART_WIDTH - 2 * CHART_MARGIN) / 3;
        let center = |index: u32| CHART_MARGIN + slot * index + slot / 2;
        let just_above_base = CHART_HEIGHT - CHART_MARGIN - 2;

        assert_eq!(*chart.get_pixel(center(0), just_above_base), BLUE);
        assert_eq!(*chart.get_pixel(center(1), CHART_MARGIN + 1), GREEN);
        assert_ne!(*chart.get_pixel(center(2), just_above_base), ORANGE);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(bar_height(150.0, 320), 320);
        assert_eq!(bar_height(-5.0, 320), 0);
        assert_eq!(bar_height(f64::NAN, 320), 0);
    }

    #[test]
    fn cpu_and_ram_need_percent_sign() {
        assert_eq!(percent_value(Some("45%")), 45.0);
        assert_eq!(percent_value(Some(" 12.5 %")), 12.5);
        assert_eq!(percent_value(Some("45")), 0.0);
        assert_eq!(percent_value(Some("n/a")), 0.0);
        assert_eq!(percent_value(None), 0.0);
    }

    #[test]
    fn disk_value_drops_gb_suffix() {
        assert_eq!(disk_value(Some(" 12.5 GB")), 12.5);
        assert_eq!(disk_value(Some("3GB")), 3.0);
        assert_eq!(disk_value(Some("7")), 7.0);
        assert_eq!(disk_value(Some("unknown")), 0.0);
        assert_eq!(disk_value(None), 0.0);
    }
}
