use std::io::{BufReader, BufWriter, Read, Write};

use crate::error::VecError;
use crate::memory::MemoryIndex;
use crate::vecstore::VecIndex;

const LIBRARY_MAGIC: [u8; 4] = *b"VLIB";
const LIBRARY_VERSION: u32 = 1;
const MAX_STRING_LEN: u32 = 4096;

/// Metadata stored at the top of a voice-library file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryHeader {
    /// Embedding model that produced the vectors.
    pub model: String,
    pub dim: usize,
    pub count: usize,
}

/// Serialize a voice library (clip filename → vector) to a writer.
///
/// ```text
/// [4B magic "VLIB"] [4B version=1]
/// [4B modelLen] [modelLen bytes model name]
/// [4B dim] [4B count]
/// For each entry:
///   [4B idLen] [idLen bytes filename]
///   [dim x 4B float32 vector]
/// ```
///
/// All multi-byte values are little-endian.
pub fn save(index: &MemoryIndex, model: &str, w: &mut dyn Write) -> Result<(), VecError> {
    let entries = index.entries();
    let dim = index.dimension().unwrap_or(0);
    let mut bw = BufWriter::new(w);

    bw.write_all(&LIBRARY_MAGIC)?;
    bw.write_all(&LIBRARY_VERSION.to_le_bytes())?;
    write_str(&mut bw, model)?;
    bw.write_all(&(dim as u32).to_le_bytes())?;
    bw.write_all(&(entries.len() as u32).to_le_bytes())?;

    for (id, vector) in &entries {
        write_str(&mut bw, id)?;
        for v in vector {
            bw.write_all(&v.to_le_bytes())?;
        }
    }

    bw.flush()?;
    Ok(())
}

/// Deserialize a voice library written by [`save`].
pub fn load(r: &mut dyn Read) -> Result<(LibraryHeader, MemoryIndex), VecError> {
    let mut br = BufReader::new(r);

    let mut magic = [0u8; 4];
    br.read_exact(&mut magic)?;
    if magic != LIBRARY_MAGIC {
        return Err(VecError::InvalidFormat(format!("invalid magic {magic:?}")));
    }

    let version = read_u32(&mut br)?;
    if version != LIBRARY_VERSION {
        return Err(VecError::InvalidFormat(format!(
            "unsupported version {version} (want {LIBRARY_VERSION})"
        )));
    }

    let model = read_str(&mut br)?;
    let dim = read_u32(&mut br)? as usize;
    let count = read_u32(&mut br)? as usize;
    if dim == 0 && count > 0 {
        return Err(VecError::InvalidFormat("invalid dimension 0".into()));
    }

    let index = MemoryIndex::with_dimension(dim);
    let mut buf = vec![0u8; dim * 4];
    let mut vector = vec![0f32; dim];
    for _ in 0..count {
        let id = read_str(&mut br)?;
        br.read_exact(&mut buf)?;
        for (slot, bytes) in vector.iter_mut().zip(buf.chunks_exact(4)) {
            *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        index.insert(&id, &vector)?;
    }

    let header = LibraryHeader {
        model,
        dim,
        count: index.len(),
    };
    Ok((header, index))
}

fn write_str(w: &mut impl Write, s: &str) -> Result<(), VecError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LEN as usize {
        return Err(VecError::InvalidFormat(format!(
            "string too long: {} bytes",
            bytes.len()
        )));
    }
    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> Result<u32, VecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_str(r: &mut impl Read) -> Result<String, VecError> {
    let len = read_u32(r)?;
    if len > MAX_STRING_LEN {
        return Err(VecError::InvalidFormat(format!("string length {len} too large")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| VecError::InvalidFormat(e.to_string()))
}
