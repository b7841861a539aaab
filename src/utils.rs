use anyhow::{Context, Result};

use crate::data::transform::DecodedImage;

pub fn get_env(key: &str) -> Result<String> {
    std::env::var(key).context(format!("getting env variable `{key}`"))
}

/// Render a decoded image as colored terminal cells.
///
/// Images come out of the transform normalized, so the channel statistics
/// used to normalize them are needed to recover displayable values.
pub fn show_image_terminal_color(img: &DecodedImage, mean: [f32; 3], std: [f32; 3]) {
    let [channels, height, width] = img.shape;
    for i in 0..height {
        for j in 0..width {
            let value = |c: usize| {
                let c = c.min(channels - 1);
                let v = img.pixels[c * height * width + i * width + j] * std[c] + mean[c];
                (v.clamp(0.0, 1.0) * 255.0) as u8
            };
            let color = termion::color::Rgb(value(0), value(1), value(2));
            print!("{} ", termion::color::Bg(color));
        }
        println!("{}", termion::color::Bg(termion::color::Reset));
    }
}

/// Pixel statistics over a set of decoded images.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub value_range: [f32; 2],
    pub mean: f32,
    pub stddev: f32,
}

impl Stats {
    pub fn from_images<'a>(iter: impl Iterator<Item = &'a DecodedImage>) -> Self {
        let mut s = 0.0f64;
        let mut s2 = 0.0f64;
        let mut count = 0usize;
        let mut value_range = [f32::INFINITY, f32::NEG_INFINITY];

        for img in iter {
            for &x in &img.pixels {
                value_range[0] = value_range[0].min(x);
                value_range[1] = value_range[1].max(x);
                s += x as f64;
                s2 += (x as f64) * (x as f64);
                count += 1;
            }
        }

        if count == 0 {
            return Self {
                value_range: [0.0, 0.0],
                mean: 0.0,
                stddev: 0.0,
            };
        }

        let n = count as f64;
        let mean = s / n;
        let var = (s2 / n) - mean * mean;
        Self {
            value_range,
            mean: mean as f32,
            stddev: var.max(0.0).sqrt() as f32,
        }
    }
}
