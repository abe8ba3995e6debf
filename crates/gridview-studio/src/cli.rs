use std::path::PathBuf;

use clap::Parser;

use gridview_engine::mesh::PointColor;
use gridview_engine::paint::Color;

/// gridview: draws an N×N triangle grid in a window.
#[derive(Parser, Debug)]
#[command(name = "gridview", version, about)]
pub struct Args {
    /// Cells per side.
    #[arg(short = 'n', long, default_value_t = 2)]
    pub grid_size: i64,

    /// WGSL vertex shader; the built-in one is used when omitted.
    #[arg(long)]
    pub vertex: Option<PathBuf>,

    /// WGSL fragment shader; the built-in one is used when omitted.
    #[arg(long)]
    pub fragment: Option<PathBuf>,

    /// Recolor a grid point: `X,Y,RRGGBB` or `X,Y,RRGGBBAA`. Repeatable.
    #[arg(long = "point", value_parser = parse_point)]
    pub points: Vec<PointColor>,

    /// Background as `R,G,B` floats in [0, 1].
    #[arg(long, value_parser = parse_clear_color)]
    pub clear_color: Option<Color>,

    /// Prefer an sRGB surface format.
    #[arg(long)]
    pub srgb: bool,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Log filter override (e.g. debug, gridview_engine=trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

fn parse_point(s: &str) -> Result<PointColor, String> {
    let mut parts = s.split(',');
    let (Some(x), Some(y), Some(hex), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected X,Y,RRGGBB[AA], got `{s}`"));
    };

    let x = x.trim().parse::<u32>().map_err(|e| format!("bad x `{x}`: {e}"))?;
    let y = y.trim().parse::<u32>().map_err(|e| format!("bad y `{y}`: {e}"))?;
    let hex = hex.trim().trim_start_matches('#');

    let byte = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|b| u8::from_str_radix(b, 16).ok())
            .ok_or_else(|| format!("bad color `{hex}`"))
    };
    let color = match hex.len() {
        6 => Color::from_u8(byte(0)?, byte(2)?, byte(4)?, 255),
        8 => Color::from_u8(byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return Err(format!("bad color `{hex}`: expected 6 or 8 hex digits")),
    };

    Ok(PointColor { x, y, color })
}

fn parse_clear_color(s: &str) -> Result<Color, String> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<f32>().map_err(|e| format!("bad channel `{c}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    let [r, g, b] = channels[..] else {
        return Err(format!("expected R,G,B, got `{s}`"));
    };

    let color = Color::new(r, g, b, 1.0);
    if !color.is_finite() {
        return Err(format!("non-finite color `{s}`"));
    }
    Ok(color.clamped())
}
