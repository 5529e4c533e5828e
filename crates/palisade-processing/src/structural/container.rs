//! Container walkers.
//!
//! Each walker follows the format's own framing from the signature to its
//! terminator and returns the offset one past the terminator. The image
//! decoders stop reading there, so anything after it is invisible to them and
//! has to be found here.

use palisade_core::StructureKind;

use super::StructuralError;

const PNG_SIGNATURE_LEN: usize = 8;
const GIF_HEADER_LEN: usize = 6;
const GIF_SCREEN_DESCRIPTOR_LEN: usize = 7;
const GIF_IMAGE_DESCRIPTOR_LEN: usize = 9;

const GIF_EXTENSION_INTRODUCER: u8 = 0x21;
const GIF_IMAGE_SEPARATOR: u8 = 0x2C;
const GIF_TRAILER: u8 = 0x3B;

const JPEG_MARKER_PREFIX: u8 = 0xFF;
const JPEG_SOI: u8 = 0xD8;
const JPEG_EOI: u8 = 0xD9;
const JPEG_SOS: u8 = 0xDA;
const JPEG_TEM: u8 = 0x01;

/// Byte length of the container at the start of `data`.
pub fn container_len(kind: StructureKind, data: &[u8]) -> Result<usize, StructuralError> {
    match kind {
        StructureKind::Png => png_len(data),
        StructureKind::Gif => gif_len(data),
        StructureKind::Jpeg => jpeg_len(data),
    }
}

fn malformed(format: StructureKind, detail: &'static str) -> StructuralError {
    StructuralError::Malformed { format, detail }
}

fn read_u16_be(data: &[u8], pos: usize) -> Option<usize> {
    let bytes = data.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
}

fn read_u32_be(data: &[u8], pos: usize) -> Option<usize> {
    let bytes = data.get(pos..pos.checked_add(4)?)?;
    let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    usize::try_from(value).ok()
}

/// Chunks are `length | type | data | crc`; the stream ends with `IEND`.
fn png_len(data: &[u8]) -> Result<usize, StructuralError> {
    const FORMAT: StructureKind = StructureKind::Png;

    if data.len() < PNG_SIGNATURE_LEN {
        return Err(malformed(FORMAT, "missing signature"));
    }

    let mut pos = PNG_SIGNATURE_LEN;
    loop {
        let length =
            read_u32_be(data, pos).ok_or_else(|| malformed(FORMAT, "truncated chunk header"))?;
        let chunk_type = data
            .get(pos + 4..pos + 8)
            .ok_or_else(|| malformed(FORMAT, "truncated chunk header"))?;

        // header (8) + data + crc (4)
        let end = pos
            .checked_add(12)
            .and_then(|n| n.checked_add(length))
            .ok_or_else(|| malformed(FORMAT, "chunk length overflow"))?;
        if end > data.len() {
            return Err(malformed(FORMAT, "chunk runs past end of file"));
        }

        if chunk_type == b"IEND" {
            return Ok(end);
        }
        pos = end;
    }
}

/// Skip a chain of GIF data sub-blocks, returning the offset after the
/// zero-length terminator.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Result<usize, StructuralError> {
    loop {
        let size = *data
            .get(pos)
            .ok_or_else(|| malformed(StructureKind::Gif, "unterminated data sub-blocks"))?
            as usize;
        pos += 1;
        if size == 0 {
            return Ok(pos);
        }
        pos += size;
    }
}

fn gif_color_table_len(packed: u8) -> usize {
    if packed & 0x80 == 0 {
        0
    } else {
        3 * (1 << ((packed & 0x07) + 1))
    }
}

/// Header, screen descriptor and optional global table, then a sequence of
/// extension and image blocks up to the `;` trailer.
fn gif_len(data: &[u8]) -> Result<usize, StructuralError> {
    const FORMAT: StructureKind = StructureKind::Gif;

    let descriptor_end = GIF_HEADER_LEN + GIF_SCREEN_DESCRIPTOR_LEN;
    let packed = *data
        .get(descriptor_end - 3)
        .ok_or_else(|| malformed(FORMAT, "truncated screen descriptor"))?;
    let mut pos = descriptor_end + gif_color_table_len(packed);

    loop {
        let introducer = *data
            .get(pos)
            .ok_or_else(|| malformed(FORMAT, "missing trailer"))?;
        match introducer {
            GIF_TRAILER => return Ok(pos + 1),
            GIF_EXTENSION_INTRODUCER => {
                // introducer + label, then sub-blocks
                pos = skip_sub_blocks(data, pos + 2)?;
            }
            GIF_IMAGE_SEPARATOR => {
                let descriptor = pos + 1;
                let packed = *data
                    .get(descriptor + GIF_IMAGE_DESCRIPTOR_LEN - 1)
                    .ok_or_else(|| malformed(FORMAT, "truncated image descriptor"))?;
                pos = descriptor + GIF_IMAGE_DESCRIPTOR_LEN + gif_color_table_len(packed);
                // LZW minimum code size
                pos += 1;
                pos = skip_sub_blocks(data, pos)?;
            }
            _ => return Err(malformed(FORMAT, "unknown block introducer")),
        }
    }
}

/// Position of the next marker after entropy-coded data starting at `pos`.
///
/// Inside scan data `FF 00` is a stuffed byte and `FF D0`..`FF D7` are restart
/// markers; neither ends the scan.
fn skip_entropy_coded(data: &[u8], mut pos: usize) -> Result<usize, StructuralError> {
    while pos + 1 < data.len() {
        if data[pos] == JPEG_MARKER_PREFIX {
            match data[pos + 1] {
                0x00 | 0xD0..=0xD7 | JPEG_MARKER_PREFIX => pos += 1,
                _ => return Ok(pos),
            }
        } else {
            pos += 1;
        }
    }
    Err(malformed(StructureKind::Jpeg, "scan data runs past end of file"))
}

/// Marker segments from SOI to EOI, skipping scan data after each SOS.
fn jpeg_len(data: &[u8]) -> Result<usize, StructuralError> {
    const FORMAT: StructureKind = StructureKind::Jpeg;

    if data.get(..2) != Some(&[JPEG_MARKER_PREFIX, JPEG_SOI][..]) {
        return Err(malformed(FORMAT, "missing start of image"));
    }

    let mut pos = 2;
    loop {
        if data.get(pos) != Some(&JPEG_MARKER_PREFIX) {
            return Err(malformed(FORMAT, "expected marker"));
        }
        // Fill bytes
        while data.get(pos + 1) == Some(&JPEG_MARKER_PREFIX) {
            pos += 1;
        }
        let marker = *data
            .get(pos + 1)
            .ok_or_else(|| malformed(FORMAT, "missing end of image"))?;

        match marker {
            JPEG_EOI => return Ok(pos + 2),
            JPEG_TEM | 0xD0..=0xD7 => pos += 2,
            _ => {
                let length = read_u16_be(data, pos + 2)
                    .ok_or_else(|| malformed(FORMAT, "truncated segment length"))?;
                if length < 2 {
                    return Err(malformed(FORMAT, "invalid segment length"));
                }
                pos += 2 + length;
                if pos > data.len() {
                    return Err(malformed(FORMAT, "segment runs past end of file"));
                }
                if marker == JPEG_SOS {
                    pos = skip_entropy_coded(data, pos)?;
                }
            }
        }
    }
}
