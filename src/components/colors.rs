use image::Rgba;

use crate::canvas::Color;

/// The fixed 16-colour palette used by the picker and by GIF export.
/// Index order is part of the GIF output.
pub const PALETTE: [Color; 16] = [
    Rgba([0, 0, 0, 255]),       // black
    Rgba([0, 0, 168, 255]),     // dark blue
    Rgba([87, 0, 127, 255]),    // dark purple
    Rgba([0, 147, 0, 255]),     // dark green
    Rgba([170, 85, 0, 255]),    // brown
    Rgba([85, 85, 85, 255]),    // dark gray
    Rgba([170, 170, 170, 255]), // light gray
    Rgba([255, 255, 255, 255]), // white
    Rgba([255, 0, 0, 255]),     // red
    Rgba([255, 85, 0, 255]),    // orange
    Rgba([255, 255, 0, 255]),   // yellow
    Rgba([0, 255, 0, 255]),     // green
    Rgba([0, 0, 255, 255]),     // blue
    Rgba([85, 0, 255, 255]),    // indigo
    Rgba([255, 85, 255, 255]),  // pink
    Rgba([255, 187, 153, 255]), // peach
];

pub const PALETTE_NAMES: [&str; 16] = [
    "black",
    "dark-blue",
    "dark-purple",
    "dark-green",
    "brown",
    "dark-gray",
    "light-gray",
    "white",
    "red",
    "orange",
    "yellow",
    "green",
    "blue",
    "indigo",
    "pink",
    "peach",
];

/// Palette index for a pixel: transparent maps to 0, anything else to the
/// entry with the smallest squared RGB distance (lowest index on ties).
pub fn nearest_palette_index(color: Color) -> u8 {
    if color[3] == 0 {
        return 0;
    }
    let mut best_index = 0usize;
    let mut best_dist = u32::MAX;
    for (i, entry) in PALETTE.iter().enumerate() {
        let dr = color[0] as i32 - entry[0] as i32;
        let dg = color[1] as i32 - entry[1] as i32;
        let db = color[2] as i32 - entry[2] as i32;
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best_dist = dist;
            best_index = i;
        }
    }
    best_index as u8
}

/// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA` (leading `#` optional), a palette
/// name such as `dark-blue`, or `transparent`.
pub fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("transparent") {
        return Some(Rgba([0, 0, 0, 0]));
    }
    if let Some(i) = PALETTE_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(s))
    {
        return Some(PALETTE[i]);
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Rgba([nib(0)?, nib(1)?, nib(2)?, 255]))
        }
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// `#RRGGBBAA`.
pub fn format_color(color: Color) -> String {
    format!(
        "#{:02X}{:02X}{:02X}{:02X}",
        color[0], color[1], color[2], color[3]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_palette_colours_map_to_themselves() {
        for (i, c) in PALETTE.iter().enumerate() {
            assert_eq!(nearest_palette_index(*c) as usize, i);
        }
    }

    #[test]
    fn transparent_maps_to_zero_regardless_of_rgb() {
        assert_eq!(nearest_palette_index(Rgba([255, 255, 255, 0])), 0);
    }

    #[test]
    fn nearest_and_ties() {
        assert_eq!(nearest_palette_index(Rgba([250, 5, 3, 255])), 8);
        assert_eq!(nearest_palette_index(Rgba([255, 42, 0, 255])), 8);
        // 84 away from both black and dark blue
        assert_eq!(nearest_palette_index(Rgba([0, 0, 84, 255])), 0);
    }

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(parse_color("#ff0000"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color("00ff0080"), Some(Rgba([0, 255, 0, 128])));
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("Dark-Blue"), Some(PALETTE[1]));
        assert_eq!(parse_color("transparent"), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gg0000"), None);
        assert_eq!(format_color(Rgba([1, 2, 255, 16])), "#0102FF10");
    }
}
