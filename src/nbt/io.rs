//! Reading and writing tag files, plain or gzip-compressed.
//!
//! Files are trusted local data and decode with the unlimited accountant.

use super::{read_root, write_root, CompoundTag, NbtError, SizeAccountant};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::{
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn read_compressed(input: impl Read) -> Result<CompoundTag, NbtError> {
    let mut decoder = BufReader::new(GzDecoder::new(input));
    read_root(&mut decoder, &mut SizeAccountant::unlimited())
}

pub fn write_compressed(root: &CompoundTag, output: impl Write) -> Result<(), NbtError> {
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    write_root(&mut encoder, root)?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn read_plain(mut input: impl Read) -> Result<CompoundTag, NbtError> {
    read_root(&mut input, &mut SizeAccountant::unlimited())
}

pub fn write_plain(root: &CompoundTag, mut output: impl Write) -> Result<(), NbtError> {
    write_root(&mut output, root)?;
    output.flush()?;
    Ok(())
}

/// Reads a root compound, detecting gzip compression by its magic bytes.
pub fn read_any(bytes: &[u8]) -> Result<CompoundTag, NbtError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        read_compressed(bytes)
    } else {
        read_plain(bytes)
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<CompoundTag, NbtError> {
    let bytes = fs_err::read(path.as_ref())?;
    read_any(&bytes)
}

/// Writes `root` next to `path` and renames it into place, so a crash
/// mid-write never leaves a truncated file behind.
pub fn write_file(root: &CompoundTag, path: impl AsRef<Path>, compressed: bool) -> Result<(), NbtError> {
    let path = path.as_ref();
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");

    let file = fs_err::File::create(&temp)?;
    if compressed {
        write_compressed(root, file)?;
    } else {
        write_plain(root, BufWriter::new(file))?;
    }
    fs_err::rename(&temp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompoundTag {
        let mut root = CompoundTag::new();
        root.put_string("LevelName", "world");
        root.put_long("Seed", -42);
        root.put_int_array("Pos", vec![1, 2, 3]);
        root
    }

    #[test]
    fn read_any_sniffs_compression() {
        let root = sample();

        let mut gzip = Vec::new();
        write_compressed(&root, &mut gzip).unwrap();
        assert_eq!(&gzip[..2], &GZIP_MAGIC);
        assert_eq!(read_any(&gzip).unwrap(), root);

        let mut plain = Vec::new();
        write_plain(&root, &mut plain).unwrap();
        assert_eq!(plain[0], 10);
        assert_eq!(read_any(&plain).unwrap(), root);
    }

    #[test]
    fn file_write_replaces_atomically() {
        let dir = std::env::temp_dir().join(format!("mcnet-io-{}", std::process::id()));
        fs_err::create_dir_all(&dir).unwrap();
        let path = dir.join("level.dat");

        write_file(&sample(), &path, true).unwrap();
        assert!(!dir.join("level.dat.tmp").exists());
        assert_eq!(read_file(&path).unwrap(), sample());

        fs_err::remove_dir_all(&dir).unwrap();
    }
}
