//! Truevision TGA file format support.
//!
//! Only true-color and grayscale images are handled, both uncompressed and
//! run-length encoded:
//!
//! Type | Pixel data
//! -----|---------------------------
//! 2    | uncompressed true-color
//! 3    | uncompressed grayscale
//! 10   | run-length encoded true-color
//! 11   | run-length encoded grayscale

use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use Error::*;

use super::{Format, PixelBuffer};

const HEADER_LEN: usize = 18;
const FOOTER: &[u8; 18] = b"TRUEVISION-XFILE.\0";
/// Image descriptor bit set when row 0 is the top row.
const TOP_ORIGIN: u8 = 0x20;
/// Image descriptor bit set when column 0 is the rightmost one.
const RIGHT_ORIGIN: u8 = 0x10;
/// Maximum number of pixels in one packet.
const MAX_PACKET_LEN: usize = 128;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
enum DataType {
    RawColor = 2,
    RawGray = 3,
    RleColor = 10,
    RleGray = 11,
}

impl DataType {
    fn new(format: Format, rle: bool) -> Self {
        return match (format, rle) {
            (Format::Grayscale, false) => DataType::RawGray,
            (Format::Grayscale, true) => DataType::RleGray,
            (_, false) => DataType::RawColor,
            (_, true) => DataType::RleColor,
        };
    }

    fn is_rle(self) -> bool {
        return matches!(self, DataType::RleColor | DataType::RleGray);
    }
}

impl TryFrom<u8> for DataType {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        return Ok(match code {
            2 => DataType::RawColor,
            3 => DataType::RawGray,
            10 => DataType::RleColor,
            11 => DataType::RleGray,
            other => Err(Unsupported(other))?,
        });
    }
}

/// The fixed-size header of a TGA image.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Header {
    id_len: u8,
    data_type: DataType,
    width: u16,
    height: u16,
    format: Format,
    descriptor: u8,
}

impl Header {
    /// Parses the 18 header bytes, all multi-byte fields are little-endian.
    fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        if bytes[1] != 0 {
            return Err(ColorMapped(bytes[1]));
        }
        let data_type = bytes[2].try_into()?;
        let width = u16::from_le_bytes([bytes[12], bytes[13]]);
        let height = u16::from_le_bytes([bytes[14], bytes[15]]);
        if width == 0 || height == 0 {
            return Err(BadDimensions(width, height));
        }
        let format = Format::from_bytes_per_pixel(bytes[16] as usize / 8)
            .filter(|_| bytes[16] % 8 == 0)
            .ok_or(BadDepth(bytes[16]))?;
        return Ok(Self {
            id_len: bytes[0],
            data_type,
            width,
            height,
            format,
            descriptor: bytes[17],
        });
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0; HEADER_LEN];
        bytes[0] = self.id_len;
        bytes[2] = self.data_type as u8;
        bytes[12..14].copy_from_slice(&self.width.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.height.to_le_bytes());
        bytes[16] = 8 * self.format.bytes_per_pixel() as u8;
        bytes[17] = self.descriptor;
        return bytes;
    }
}

/// Error during loading, decoding or encoding a TGA file.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// An I/O error occurred.
    Io(io::ErrorKind),
    /// Unsupported image type.
    Unsupported(u8),
    /// Image has a color map of the given type, color maps aren't supported.
    ColorMapped(u8),
    /// Zero width or height.
    BadDimensions(u16, u16),
    /// Bits per pixel other than 8, 24 or 32.
    BadDepth(u8),
    /// Image too large to be described by the header.
    TooLarge(u32, u32),
    /// Unexpected end of input while decoding.
    UnexpectedEnd,
    /// Run-length encoded data describes more pixels than the image has.
    TooManyPixels,
}

/// Result of loading, decoding or encoding a TGA file.
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Io(kind) => write!(f, "tga i/o error: {kind}"),
            Unsupported(code) => write!(f, "unsupported tga image type {code}"),
            ColorMapped(kind) => write!(f, "unsupported tga color map type {kind}"),
            BadDimensions(w, h) => write!(f, "bad tga dimensions {w}x{h}"),
            BadDepth(bits) => write!(f, "bad tga pixel depth {bits}"),
            TooLarge(w, h) => write!(f, "image of {w}x{h} is too large for tga"),
            UnexpectedEnd => write!(f, "unexpected end of tga data"),
            TooManyPixels => write!(f, "too many pixels in rle tga data"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        return match e.kind() {
            io::ErrorKind::UnexpectedEof => UnexpectedEnd,
            kind => Io(kind),
        };
    }
}

/// Loads a TGA image from a path into a buffer whose row 0 is the top row.
///
/// # Errors
/// Returns [`tga::Error`][Error] in case of an I/O error or invalid TGA image.
pub fn load_tga(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    return read_tga(BufReader::new(File::open(path)?));
}

/// Decodes a TGA image. The origin is normalized, so that row 0 of the
/// result is the top row and column 0 the leftmost one.
///
/// # Errors
/// Returns [`tga::Error`][Error] in case of an I/O error or invalid TGA image.
pub fn read_tga(mut src: impl Read) -> Result<PixelBuffer> {
    let mut bytes = [0; HEADER_LEN];
    src.read_exact(&mut bytes)?;
    let h = Header::parse(&bytes)?;

    // Image id isn't used.
    io::copy(&mut (&mut src).take(h.id_len as u64), &mut io::sink())?;

    let bytes_per_pixel = h.format.bytes_per_pixel();
    let pixel_count = h.width as usize * h.height as usize;
    let data = if h.data_type.is_rle() {
        read_rle(&mut src, pixel_count, bytes_per_pixel)?
    } else {
        let mut data = vec![0; pixel_count * bytes_per_pixel];
        src.read_exact(&mut data)?;
        data
    };

    let mut image = PixelBuffer::from_raw(h.width as u32, h.height as u32, h.format, data)
        .ok_or(UnexpectedEnd)?;
    if h.descriptor & TOP_ORIGIN == 0 {
        image.flip_vertically();
    }
    if h.descriptor & RIGHT_ORIGIN != 0 {
        image.flip_horizontally();
    }
    return Ok(image);
}

/// Writes an image to a file in TGA format.
///
/// Caution: This function overwrites the file if it already exists.
///
/// # Errors
/// Returns [`tga::Error`][Error] if the image is too large or writing fails.
pub fn save_tga(path: impl AsRef<Path>, image: &PixelBuffer, rle: bool) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_tga(&mut out, image, rle)?;
    out.flush()?;
    return Ok(());
}

/// Writes an image to `out` in TGA format, row 0 being the top row.
///
/// # Errors
/// Returns [`tga::Error`][Error] if the image is too large or writing fails.
pub fn write_tga(mut out: impl Write, image: &PixelBuffer, rle: bool) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    let too_large = || TooLarge(width, height);
    let header = Header {
        id_len: 0,
        data_type: DataType::new(image.format(), rle),
        width: width.try_into().map_err(|_| too_large())?,
        height: height.try_into().map_err(|_| too_large())?,
        format: image.format(),
        descriptor: TOP_ORIGIN,
    };
    out.write_all(&header.to_bytes())?;

    if rle {
        write_rle(&mut out, image.as_bytes(), image.format().bytes_per_pixel())?;
    } else {
        out.write_all(image.as_bytes())?;
    }

    // Developer and extension area offsets, neither is present.
    out.write_all(&[0; 8])?;
    out.write_all(FOOTER)?;
    return Ok(());
}

/// Reads run-length encoded packets until `pixel_count` pixels are decoded.
fn read_rle(src: &mut impl Read, pixel_count: usize, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let total = pixel_count * bytes_per_pixel;
    let mut data = Vec::with_capacity(total);
    while data.len() < total {
        let mut packet_header = [0; 1];
        src.read_exact(&mut packet_header)?;
        let packet_header = packet_header[0] as usize;

        let start = data.len();
        if packet_header < 128 {
            // Raw packet: header + 1 literal pixels.
            let len = (packet_header + 1) * bytes_per_pixel;
            if start + len > total {
                return Err(TooManyPixels);
            }
            data.resize(start + len, 0);
            src.read_exact(&mut data[start..])?;
        } else {
            // Run-length packet: one pixel repeated header - 127 times.
            let count = packet_header - 127;
            if start + count * bytes_per_pixel > total {
                return Err(TooManyPixels);
            }
            let mut pixel = [0; 4];
            src.read_exact(&mut pixel[..bytes_per_pixel])?;
            for _ in 0..count {
                data.extend_from_slice(&pixel[..bytes_per_pixel]);
            }
        }
    }
    return Ok(data);
}

/// Encodes pixel data as a sequence of raw and run-length packets.
fn write_rle(out: &mut impl Write, data: &[u8], bytes_per_pixel: usize) -> io::Result<()> {
    let pixels: Vec<&[u8]> = data.chunks_exact(bytes_per_pixel).collect();
    let mut start = 0;
    while start < pixels.len() {
        let rest = &pixels[start..];
        let max_len = rest.len().min(MAX_PACKET_LEN);
        if rest.len() > 1 && rest[0] == rest[1] {
            let len = rest[..max_len].iter().take_while(|&&p| p == rest[0]).count();
            out.write_all(&[(len + 127) as u8])?;
            out.write_all(rest[0])?;
            start += len;
        } else {
            // Literal pixels up to the start of the next repeat.
            let mut len = 1;
            while len < max_len && !(len + 1 < rest.len() && rest[len] == rest[len + 1]) {
                len += 1;
            }
            out.write_all(&[(len - 1) as u8])?;
            out.write_all(&data[start * bytes_per_pixel..(start + len) * bytes_per_pixel])?;
            start += len;
        }
    }
    return Ok(());
}
