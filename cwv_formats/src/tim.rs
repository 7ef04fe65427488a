use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};

use crate::error::{FormatError, Result};
use crate::reader::{read_u16, read_u32, slice};

const TIM_ID: u32 = 0x10;
const BLOCK_HEADER_SIZE: usize = 12;
const FLAG_CLUT: u32 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    Indexed4,
    Indexed8,
    Direct15,
    Direct24,
}

impl PixelMode {
    fn from_flags(flags: u32) -> Self {
        match flags & 0x03 {
            0 => PixelMode::Indexed4,
            1 => PixelMode::Indexed8,
            2 => PixelMode::Direct15,
            _ => PixelMode::Direct24,
        }
    }

    /// Converts a width in 16-bit framebuffer words into pixels.
    fn pixel_width(self, words: u16) -> u32 {
        let words = words as u32;
        match self {
            PixelMode::Indexed4 => words * 4,
            PixelMode::Indexed8 => words * 2,
            PixelMode::Direct15 => words,
            PixelMode::Direct24 => words * 2 / 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clut {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub colors: Vec<u16>,
}

/// A decoded PlayStation TIM texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimImage {
    pub mode: PixelMode,
    pub clut: Option<Clut>,
    pub x: u16,
    pub y: u16,
    /// Image width in 16-bit words as stored.
    pub width: u16,
    /// Image width in pixels.
    pub width_actual: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

struct Block<'a> {
    len: usize,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    payload: &'a [u8],
}

fn read_block<'a>(bytes: &'a [u8], offset: usize, what: &'static str) -> Result<Block<'a>> {
    let len = read_u32(bytes, offset, what)? as usize;
    let x = read_u16(bytes, offset + 4, what)?;
    let y = read_u16(bytes, offset + 6, what)?;
    let width = read_u16(bytes, offset + 8, what)?;
    let height = read_u16(bytes, offset + 10, what)?;
    let payload_len = width as usize * height as usize * 2;
    let payload = slice(bytes, offset + BLOCK_HEADER_SIZE, payload_len, what)?;
    Ok(Block {
        len: len.max(BLOCK_HEADER_SIZE + payload_len),
        x,
        y,
        width,
        height,
        payload,
    })
}

impl TimImage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let id = read_u32(bytes, 0, "TIM header")?;
        if id != TIM_ID {
            return Err(FormatError::BadTimMagic(id));
        }
        let flags = read_u32(bytes, 4, "TIM header")?;
        let mode = PixelMode::from_flags(flags);

        let mut offset = 8;
        let clut = if flags & FLAG_CLUT != 0 {
            let block = read_block(bytes, offset, "TIM palette")?;
            offset += block.len;
            Some(Clut {
                x: block.x,
                y: block.y,
                width: block.width,
                height: block.height,
                colors: block
                    .payload
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            })
        } else {
            None
        };

        let image = read_block(bytes, offset, "TIM image")?;
        let width_actual = mode.pixel_width(image.width);
        if width_actual == 0 || image.height == 0 {
            return Err(FormatError::EmptyTexture);
        }

        Ok(TimImage {
            mode,
            clut,
            x: image.x,
            y: image.y,
            width: image.width,
            width_actual,
            height: image.height as u32,
            data: image.payload.to_vec(),
        })
    }

    /// Expands the image into tightly packed RGBA8 rows.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let stride = self.width as usize * 2;
        let width = self.width_actual as usize;
        let palette = self
            .clut
            .as_ref()
            .map(|clut| clut.colors.as_slice())
            .unwrap_or_default();
        let lookup = |index: usize| palette.get(index).copied().map_or([0; 4], color_to_rgba);

        let mut rgba = Vec::with_capacity(width * self.height as usize * 4);
        for row in self.data.chunks_exact(stride) {
            match self.mode {
                PixelMode::Indexed4 => {
                    for byte in row.iter().take(width.div_ceil(2)) {
                        rgba.extend_from_slice(&lookup((byte & 0x0F) as usize));
                        rgba.extend_from_slice(&lookup((byte >> 4) as usize));
                    }
                }
                PixelMode::Indexed8 => {
                    for &byte in row.iter().take(width) {
                        rgba.extend_from_slice(&lookup(byte as usize));
                    }
                }
                PixelMode::Direct15 => {
                    for pair in row.chunks_exact(2).take(width) {
                        rgba.extend_from_slice(&color_to_rgba(u16::from_le_bytes([
                            pair[0], pair[1],
                        ])));
                    }
                }
                PixelMode::Direct24 => {
                    for rgb in row.chunks_exact(3).take(width) {
                        rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
                    }
                }
            }
        }
        rgba
    }

    /// Encodes the image as a PNG file.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let rgba = self.to_rgba8();
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            &rgba,
            self.width_actual,
            self.height,
            ColorType::Rgba8.into(),
        )?;
        Ok(png)
    }
}

/// PlayStation colours are A1B5G5R5; pure black with the STP bit clear is
/// the hardware's transparent colour.
fn color_to_rgba(color: u16) -> [u8; 4] {
    let expand = |value: u16| {
        let value = (value & 0x1F) as u8;
        (value << 3) | (value >> 2)
    };
    let alpha = if color == 0 { 0 } else { 0xFF };
    [expand(color), expand(color >> 5), expand(color >> 10), alpha]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn push_block(data: &mut Vec<u8>, width: u16, height: u16, words: &[u16]) {
        let len = (BLOCK_HEADER_SIZE + words.len() * 2) as u32;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        for word in words {
            data.extend_from_slice(&word.to_le_bytes());
        }
    }

    /// A direct-colour texture `width` pixels wide and `height` tall.
    pub(crate) fn build_direct_tim(width: u16, height: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        let words: Vec<u16> = (0..width * height).map(|i| 0x7C00 | i).collect();
        push_block(&mut data, width, height, &words);
        data
    }

    #[test]
    fn decodes_direct_colour_texture() {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        push_block(&mut data, 2, 1, &[0x001F, 0x0000]);

        let tim = TimImage::decode(&data).unwrap();
        assert_eq!(tim.mode, PixelMode::Direct15);
        assert_eq!(tim.width_actual, 2);
        assert_eq!(tim.height, 1);
        assert!(tim.clut.is_none());
        assert_eq!(tim.to_rgba8(), vec![0xFF, 0, 0, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn decodes_four_bit_texture_through_palette() {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&(FLAG_CLUT).to_le_bytes());
        let mut palette = vec![0u16; 16];
        palette[1] = 0x03E0;
        palette[2] = 0x7C00;
        push_block(&mut data, 16, 1, &palette);
        // One word holds four pixels: indices 1, 2, 0, 1.
        push_block(&mut data, 1, 1, &[0x1021]);

        let tim = TimImage::decode(&data).unwrap();
        assert_eq!(tim.mode, PixelMode::Indexed4);
        assert_eq!(tim.width, 1);
        assert_eq!(tim.width_actual, 4);
        assert_eq!(tim.clut.as_ref().unwrap().colors.len(), 16);

        let rgba = tim.to_rgba8();
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0xFF, 0, 0xFF]);
        assert_eq!(&rgba[4..8], &[0, 0, 0xFF, 0xFF]);
        assert_eq!(&rgba[8..12], &[0, 0, 0, 0]);
        assert_eq!(&rgba[12..16], &[0, 0xFF, 0, 0xFF]);
    }

    #[test]
    fn eight_bit_width_is_twice_the_word_count() {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&(FLAG_CLUT | 1).to_le_bytes());
        push_block(&mut data, 256, 1, &[0x7FFF; 256]);
        push_block(&mut data, 32, 16, &[0u16; 32 * 16]);

        let tim = TimImage::decode(&data).unwrap();
        assert_eq!(tim.mode, PixelMode::Indexed8);
        assert_eq!(tim.width_actual, 64);
        assert_eq!(tim.height, 16);
        assert_eq!(tim.to_rgba8().len(), 64 * 16 * 4);
    }

    #[test]
    fn decodes_twenty_four_bit_texture() {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        // Three words per row hold two RGB pixels.
        push_block(
            &mut data,
            3,
            2,
            &[0x2010, 0x4030, 0x6050, 0x0201, 0x0403, 0x0605],
        );

        let tim = TimImage::decode(&data).unwrap();
        assert_eq!(tim.mode, PixelMode::Direct24);
        assert_eq!(tim.width, 3);
        assert_eq!(tim.width_actual, 2);
        assert_eq!(tim.height, 2);
        assert_eq!(
            tim.to_rgba8(),
            vec![
                0x10, 0x20, 0x30, 0xFF, 0x40, 0x50, 0x60, 0xFF, //
                0x01, 0x02, 0x03, 0xFF, 0x04, 0x05, 0x06, 0xFF,
            ]
        );
        assert_eq!(&tim.to_png().unwrap()[..4], b"\x89PNG");
    }

    #[test]
    fn rejects_foreign_data() {
        let data = [0x42u8, 0, 0, 0, 2, 0, 0, 0];
        assert!(matches!(
            TimImage::decode(&data),
            Err(FormatError::BadTimMagic(0x42))
        ));
    }

    #[test]
    fn rejects_empty_image() {
        let mut data = Vec::new();
        data.extend_from_slice(&TIM_ID.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        push_block(&mut data, 0, 4, &[]);
        assert!(matches!(
            TimImage::decode(&data),
            Err(FormatError::EmptyTexture)
        ));
    }

    #[test]
    fn encodes_png() {
        let tim = TimImage::decode(&build_direct_tim(4, 2)).unwrap();
        let png = tim.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
