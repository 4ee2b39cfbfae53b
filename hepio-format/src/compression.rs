use std::fmt;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

pub mod constants {
    pub const LEVEL_STORED: u32 = 0;
    pub const LEVEL_FAST: u32 = 1;
    pub const LEVEL_DEFAULT: u32 = 6;
    pub const LEVEL_BEST: u32 = 9;
}

use self::constants::*;

/// The gzip (DEFLATE) level applied to the header stream and to every tuple
/// stream of a container. Each stream is compressed independently.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Compression(u32);

impl Default for Compression {
    fn default() -> Self {
        Compression(LEVEL_DEFAULT)
    }
}

impl Compression {
    pub fn new(level: u32) -> std::io::Result<Compression> {
        if level > LEVEL_BEST {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Cannot handle compression level {}", level),
            ));
        }

        Ok(Compression(level))
    }

    pub const fn stored() -> Compression {
        Compression(LEVEL_STORED)
    }

    pub const fn fast() -> Compression {
        Compression(LEVEL_FAST)
    }

    pub const fn best() -> Compression {
        Compression(LEVEL_BEST)
    }

    #[inline(always)]
    pub const fn level(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn encoder<W: Write>(self, writer: W) -> GzEncoder<W> {
        GzEncoder::new(writer, flate2::Compression::new(self.0))
    }

    #[inline(always)]
    pub fn decoder<R: Read>(reader: R) -> GzDecoder<R> {
        GzDecoder::new(reader)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            LEVEL_STORED => write!(f, "gzip (stored)"),
            level => write!(f, "gzip (level {})", level),
        }
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(Compression::default().level(), 6);
        assert_eq!(Compression::new(9).unwrap(), Compression::best());
        assert!(Compression::new(10).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Compression::default().to_string(), "gzip (level 6)");
        assert_eq!(Compression::stored().to_string(), "gzip (stored)");
    }

    #[test]
    fn stream() {
        let v = "This, this, this, this, this is a compressable string string string string string.\n";

        let mut encoder = Compression::best().encoder(vec![]);
        encoder.write_all(v.as_bytes()).unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(bytes.len() < v.len());

        let mut out = String::new();
        Compression::decoder(&bytes[..])
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, v);
    }
}
