//! SVG writing operations.

use std::io::Write;

use anyhow::{Context, Result};

/// String-based SVG writer; charts are embedded inline in the dashboard page.
pub(crate) struct SvgStringWriter {
    buffer: Vec<u8>
}

/// Implement std::io::Write so `write!` / `writeln!` work.
impl Write for SvgStringWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}

impl SvgStringWriter {
    /// Create a new string-based SVG writer
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Get the SVG string
    pub(crate) fn into_string(self) -> Result<String> {
        String::from_utf8(self.buffer)
            .context("[io::svg] SVG output is not valid UTF-8")
    }

    /// Write the opening <svg> tag and a white background.
    pub(crate) fn write_header(&mut self, width: f64, height: f64) -> Result<()> {
        writeln!(self, r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##)?;
        writeln!(self, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
        Ok(())
    }

    /// Write SVG styles for chart elements.
    pub(crate) fn write_styles(&mut self) -> Result<()> {
        writeln!(self, r##"<defs>
<style>
    .title {{ font: 600 15px sans-serif; fill: #111827; }}
    .label {{ font: 12px sans-serif; fill: #374151; }}
    .tick {{ font: 11px sans-serif; fill: #6b7280; }}
    .axis {{ stroke: #9ca3af; stroke-width: 1; }}
    .grid {{ stroke: #e5e7eb; stroke-width: 1; }}
</style>
</defs>"##)?;
        Ok(())
    }

    /// Write the closing </svg> tag.
    pub(crate) fn write_footer(&mut self) -> Result<()> {
        writeln!(self, "</svg>")?;
        Ok(())
    }
}
