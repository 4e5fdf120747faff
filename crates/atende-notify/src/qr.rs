//! Login QR rendering: PNG bytes, data URLs, and terminal output.

use atende_core::error::AtendeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::{Color, EcLevel, QrCode};

const MODULE_SIZE: u32 = 10;
const QUIET_ZONE: u32 = 2;

fn encode(code_text: &str) -> Result<QrCode, AtendeError> {
    if code_text.is_empty() {
        return Err(AtendeError::Notify("QR text is empty".into()));
    }
    QrCode::with_error_correction_level(code_text.as_bytes(), EcLevel::L)
        .map_err(|e| AtendeError::Notify(format!("QR generation failed: {e}")))
}

/// Render the login code as a compact terminal QR using half-block characters.
///
/// Two module rows share one text line (`▀`, `▄`, `█`, space).
pub fn render_terminal(code_text: &str) -> Result<String, AtendeError> {
    let code = encode(code_text)?;
    let width = code.width();
    let colors: Vec<Color> = code.into_colors();
    let dark = |row: usize, col: usize| row < width && colors[row * width + col] == Color::Dark;

    let mut out = String::with_capacity((width + 1) * width.div_ceil(2));
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (dark(row, col), dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}

/// Render the login code as a grayscale PNG with a white border.
pub fn render_png(code_text: &str) -> Result<Vec<u8>, AtendeError> {
    use image::{ImageBuffer, Luma};

    let code = encode(code_text)?;
    let modules = code.width() as u32;
    let side = (modules + QUIET_ZONE * 2) * MODULE_SIZE;

    let img = ImageBuffer::from_fn(side, side, |x, y| {
        let (cx, cy) = (x / MODULE_SIZE, y / MODULE_SIZE);
        let inside = (QUIET_ZONE..QUIET_ZONE + modules).contains(&cx)
            && (QUIET_ZONE..QUIET_ZONE + modules).contains(&cy);
        if inside
            && code[((cx - QUIET_ZONE) as usize, (cy - QUIET_ZONE) as usize)] == Color::Dark
        {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| AtendeError::Notify(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// `data:image/png;base64,...` URL for embedding a PNG in HTML.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
