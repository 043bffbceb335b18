//! Shared colors for the interactive and exported charts.

/// Maximum bar / trend line (#90EE90)
pub const HIGHLIGHT_RGB: (u8, u8, u8) = (144, 238, 144);
/// Non-maximum bars (#D3D3D3)
pub const MUTED_RGB: (u8, u8, u8) = (211, 211, 211);
pub const CASUAL_RGB: (u8, u8, u8) = (52, 152, 219);
pub const REGISTERED_RGB: (u8, u8, u8) = (243, 156, 18);
/// Heatmap cells without a defined correlation
pub const MISSING_RGB: (u8, u8, u8) = (120, 120, 120);

const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// Bar color depending on whether the bar holds the maximum value.
pub fn bar_rgb(is_max: bool) -> (u8, u8, u8) {
    if is_max {
        HIGHLIGHT_RGB
    } else {
        MUTED_RGB
    }
}

/// Diverging blue-white-red scale over [-1, 1].
pub fn coolwarm_rgb(value: f64) -> (u8, u8, u8) {
    if value.is_nan() {
        return MISSING_RGB;
    }

    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (COOL, NEUTRAL, v + 1.0)
    } else {
        (NEUTRAL, WARM, v)
    };

    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Dark text on light cells, light text on saturated ones.
pub fn annotation_is_dark(value: f64) -> bool {
    value.is_nan() || value.abs() < 0.6
}

/// Heatmap annotation with two decimals.
pub fn format_correlation(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// Plain integer formatting with thousands separators.
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
