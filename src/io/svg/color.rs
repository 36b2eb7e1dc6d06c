//! Color utilities for SVG charts.

use std::fmt;

/// HSL color: h in degrees, s and l in [0.0, 1.0].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Hsl {
    pub(crate) h: f64,
    pub(crate) s: f64,
    pub(crate) l: f64,
}

impl fmt::Display for Hsl {
    /// Format as CSS HSL:
    ///   hsl({h:.1},{s:.0}%,{l:.0}%)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // normalize hue into [0,360)
        let h = (self.h % 360.0 + 360.0) % 360.0;
        let s = (self.s * 100.0).clamp(0.0, 100.0);
        let l = (self.l * 100.0).clamp(0.0, 100.0);
        write!(f, "hsl({:.1},{:.0}%,{:.0}%)", h, s, l)
    }
}

const GOLDEN_ANGLE: f64 = 137.50776405;

/// Well-separated categorical colors.
pub(crate) fn golden_angle_color(index: usize) -> Hsl {
    Hsl { h: ((index as f64) * GOLDEN_ANGLE) % 360.0, s: 0.70, l: 0.55 }
}

/// Escape text for use in SVG/HTML element content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_formats_as_css() {
        assert_eq!(golden_angle_color(0).to_string(), "hsl(0.0,70%,55%)");
        assert_eq!(Hsl { h: -30.0, s: 1.5, l: 0.5 }.to_string(), "hsl(330.0,100%,50%)");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml(r#"<b>"A&B"</b>"#), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
