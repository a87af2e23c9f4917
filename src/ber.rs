// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Streaming BER tag-length plumbing.

The engine's outer framing (ContentInfo, the signed-data SEQUENCE, the
encapsulated content) is indefinite-length BER that has to be read and
written incrementally, one header at a time, while the reader or writer
advances monotonically. `bcder` decodes complete values from a buffer, so
the engine keeps this small layer for headers and hands every captured
sub-region to `bcder` for tree-level work.
*/

use {
    crate::CmsError,
    std::io::{Read, Write},
};

pub(crate) const CLASS_UNIVERSAL: u8 = 0;
pub(crate) const CLASS_CONTEXT: u8 = 2;

pub(crate) const TAG_INTEGER: u32 = 2;
pub(crate) const TAG_OCTET_STRING: u32 = 4;
pub(crate) const TAG_OID: u32 = 6;
pub(crate) const TAG_SEQUENCE: u32 = 16;
pub(crate) const TAG_SET: u32 = 17;

/// A decoded identifier-and-length header.
///
/// `raw` holds the exact octets the header was read from so captured
/// regions can be reassembled without re-encoding.
#[derive(Clone, Debug)]
pub(crate) struct Header {
    pub class: u8,
    pub constructed: bool,
    pub tag: u32,
    /// Content length; `None` is indefinite form.
    pub length: Option<usize>,
    pub raw: Vec<u8>,
}

impl Header {
    pub fn is_end_of_contents(&self) -> bool {
        self.class == CLASS_UNIVERSAL && !self.constructed && self.tag == 0
            && self.length == Some(0)
    }

    pub fn is(&self, class: u8, constructed: bool, tag: u32) -> bool {
        self.class == class && self.constructed == constructed && self.tag == tag
    }
}

/// A byte reader that tracks its absolute position.
///
/// Definite-length regions are delimited by comparing `pos` against a
/// recorded end offset; indefinite regions end at their end-of-contents
/// header.
pub(crate) struct BerReader<'a> {
    inner: &'a mut (dyn Read + 'a),
    pos: u64,
}

impl<'a> BerReader<'a> {
    pub fn new(inner: &'a mut (dyn Read + 'a)) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    fn read_byte(&mut self) -> Result<u8, CmsError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).map_err(map_eof)?;
        self.pos += 1;
        Ok(buf[0])
    }

    /// Read one identifier-and-length header.
    pub fn read_header(&mut self) -> Result<Header, CmsError> {
        let mut raw = Vec::with_capacity(4);

        let b0 = self.read_byte()?;
        raw.push(b0);

        let class = b0 >> 6;
        let constructed = b0 & 0x20 != 0;
        let mut tag = u32::from(b0 & 0x1f);

        if tag == 0x1f {
            tag = 0;
            loop {
                let b = self.read_byte()?;
                raw.push(b);
                if tag > u32::MAX >> 7 {
                    return Err(CmsError::InvalidCmsObject("BER tag number too large"));
                }
                tag = tag << 7 | u32::from(b & 0x7f);
                if b & 0x80 == 0 {
                    break;
                }
            }
        }

        let l0 = self.read_byte()?;
        raw.push(l0);

        let length = if l0 < 0x80 {
            Some(usize::from(l0))
        } else if l0 == 0x80 {
            if !constructed {
                return Err(CmsError::InvalidCmsObject(
                    "indefinite length on a primitive value",
                ));
            }
            None
        } else if l0 == 0xff {
            return Err(CmsError::InvalidCmsObject("reserved BER length octet"));
        } else {
            let count = usize::from(l0 & 0x7f);
            if count > 4 {
                return Err(CmsError::InvalidCmsObject("BER length too large"));
            }
            let mut value: usize = 0;
            for _ in 0..count {
                let b = self.read_byte()?;
                raw.push(b);
                value = value << 8 | usize::from(b);
            }
            Some(value)
        };

        Ok(Header {
            class,
            constructed,
            tag,
            length,
            raw,
        })
    }

    /// Read exactly `len` content octets into a fresh buffer.
    pub fn read_content(&mut self, len: usize) -> Result<Vec<u8>, CmsError> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(map_eof)?;
        self.pos += len as u64;
        Ok(buf)
    }

    /// Stream `len` content octets through `sink` in bounded chunks.
    pub fn copy_content(
        &mut self,
        mut len: usize,
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<(), CmsError> {
        let mut buf = [0u8; 4096];
        while len > 0 {
            let want = len.min(buf.len());
            self.inner.read_exact(&mut buf[..want]).map_err(map_eof)?;
            self.pos += want as u64;
            sink(&buf[..want]);
            len -= want;
        }
        Ok(())
    }

    /// Append the complete encoding of the value introduced by `hdr`
    /// (header octets included) to `out`.
    ///
    /// Indefinite-length constructed values are walked child by child up
    /// to and including their end-of-contents octets, preserving every
    /// original byte.
    pub fn capture(&mut self, hdr: &Header, out: &mut Vec<u8>) -> Result<(), CmsError> {
        out.extend_from_slice(&hdr.raw);
        match hdr.length {
            Some(len) => {
                let content = self.read_content(len)?;
                out.extend_from_slice(&content);
            }
            None => loop {
                let child = self.read_header()?;
                if child.is_end_of_contents() {
                    out.extend_from_slice(&child.raw);
                    break;
                }
                self.capture(&child, out)?;
            },
        }
        Ok(())
    }

    /// Discard the value introduced by `hdr`.
    pub fn skip(&mut self, hdr: &Header) -> Result<(), CmsError> {
        match hdr.length {
            Some(mut len) => {
                let mut buf = [0u8; 4096];
                while len > 0 {
                    let want = len.min(buf.len());
                    self.inner.read_exact(&mut buf[..want]).map_err(map_eof)?;
                    self.pos += want as u64;
                    len -= want;
                }
                Ok(())
            }
            None => loop {
                let child = self.read_header()?;
                if child.is_end_of_contents() {
                    return Ok(());
                }
                self.skip(&child)?;
            },
        }
    }
}

fn map_eof(e: std::io::Error) -> CmsError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        CmsError::InvalidCmsObject("unexpected end of input")
    } else {
        CmsError::Io(e)
    }
}

/// Write an identifier-and-length header. `length` of `None` selects the
/// indefinite form.
pub(crate) fn write_header(
    w: &mut dyn Write,
    class: u8,
    constructed: bool,
    tag: u32,
    length: Option<usize>,
) -> Result<(), CmsError> {
    let mut buf = Vec::with_capacity(8);

    let leading = class << 6 | if constructed { 0x20 } else { 0 };
    if tag < 0x1f {
        buf.push(leading | tag as u8);
    } else {
        buf.push(leading | 0x1f);
        let mut shift = (31 - tag.leading_zeros()) / 7 * 7;
        while shift > 0 {
            buf.push((tag >> shift & 0x7f) as u8 | 0x80);
            shift -= 7;
        }
        buf.push((tag & 0x7f) as u8);
    }

    match length {
        None => buf.push(0x80),
        Some(len) if len < 0x80 => buf.push(len as u8),
        Some(len) => {
            let bytes = len.to_be_bytes();
            let skip = bytes.iter().take_while(|&&b| b == 0).count();
            buf.push(0x80 | (bytes.len() - skip) as u8);
            buf.extend_from_slice(&bytes[skip..]);
        }
    }

    w.write_all(&buf)?;
    Ok(())
}

/// Write the end-of-contents octets terminating one indefinite region.
pub(crate) fn write_end_of_contents(w: &mut dyn Write) -> Result<(), CmsError> {
    w.write_all(&[0x00, 0x00])?;
    Ok(())
}

/// Write a primitive OCTET STRING holding `data`.
pub(crate) fn write_octet_string(w: &mut dyn Write, data: &[u8]) -> Result<(), CmsError> {
    write_header(w, CLASS_UNIVERSAL, false, TAG_OCTET_STRING, Some(data.len()))?;
    w.write_all(data)?;
    Ok(())
}

/// Write an OBJECT IDENTIFIER holding the given content octets.
pub(crate) fn write_oid(w: &mut dyn Write, content: &[u8]) -> Result<(), CmsError> {
    write_header(w, CLASS_UNIVERSAL, false, TAG_OID, Some(content.len()))?;
    w.write_all(content)?;
    Ok(())
}

/// Split one definite-length TLV in `data` into its header and content.
pub(crate) fn split_tlv(data: &[u8]) -> Result<(&[u8], &[u8]), CmsError> {
    let mut slice = data;
    let reader: &mut dyn Read = &mut slice;
    let mut rdr = BerReader::new(reader);
    let hdr = rdr.read_header()?;
    let hlen = hdr.raw.len();
    let clen = hdr
        .length
        .ok_or(CmsError::InvalidCmsObject("expected definite length"))?;
    if data.len() < hlen + clen {
        return Err(CmsError::InvalidCmsObject("truncated value"));
    }
    Ok((&data[..hlen], &data[hlen..hlen + clen]))
}
