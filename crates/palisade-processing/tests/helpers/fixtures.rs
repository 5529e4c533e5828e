//! Test fixtures: small encoded images, a PDF and polyglot variants.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Valid PNG of the given dimensions.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90]))),
        ImageFormat::Png,
    )
}

pub fn create_test_jpeg() -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([200, 100, 0]))),
        ImageFormat::Jpeg,
    )
}

pub fn create_test_gif() -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255]))),
        ImageFormat::Gif,
    )
}

/// Valid PNG with a PHP payload appended after `IEND`.
pub fn create_polyglot_png() -> Vec<u8> {
    let mut data = create_test_png(8, 8);
    data.extend_from_slice(b"<?php system($_GET['cmd']); ?>");
    data
}

/// PNG signature followed directly by script text.
pub fn create_header_only_png() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(b"<script>alert(document.cookie)</script>");
    data
}

pub fn create_test_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n"
        .to_vec()
}

/// PNG whose pixels are pseudo-random, so it does not compress below its raw size.
pub fn create_noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// PNG with its compressed `IDAT` payload flipped. Signature and chunk layout
/// are intact; only a full decode notices.
pub fn create_corrupted_png() -> Vec<u8> {
    let mut data = create_test_png(8, 8);
    let idat = data
        .windows(4)
        .position(|w| w == b"IDAT")
        .expect("encoder writes an IDAT chunk");
    for byte in &mut data[idat + 4..idat + 12] {
        *byte ^= 0xFF;
    }
    data
}
