use std::{
    io::{self, Read, BufRead, BufReader, Write, BufWriter, stdin},
    fs::{self, File},
    path::{Path, PathBuf},
    ffi::OsStr,
};
use flate2::{
    bufread::MultiGzDecoder,
    write::GzEncoder,
    Compression,
};

/// Returns
/// - stdin if filename is `-`,
/// - gzip reader if the file starts with gzip magic number,
/// - regular text file otherwise.
pub fn open(filename: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if filename == OsStr::new("-") || filename == OsStr::new("/dev/stdin") {
        Ok(Box::new(BufReader::new(stdin())))
    } else {
        let mut stream = BufReader::new(File::open(filename)?);
        let mut two_bytes = [0_u8; 2];
        let bytes_read = stream.read(&mut two_bytes)?;
        stream.seek_relative(-(bytes_read as i64))?;
        // Check gzip magic number.
        if bytes_read == 2 && two_bytes[0] == 0x1f && two_bytes[1] == 0x8b {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(stream))))
        } else {
            Ok(Box::new(stream))
        }
    }
}

/// Creates a buffered gzip file.
pub fn create_gzip(filename: &Path) -> io::Result<BufWriter<GzEncoder<File>>> {
    let file = File::create(filename)?;
    Ok(BufWriter::new(GzEncoder::new(file, Compression::default())))
}

/// Buffered output file, possibly gzip-compressed.
pub enum Output {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
}

impl Output {
    /// Flushes the buffer, and for gzip output writes the stream trailer.
    /// Must be called before the output is dropped, otherwise write errors are lost.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut w) => w.flush(),
            Self::Gzip(w) => w.into_inner().map_err(io::IntoInnerError::into_error)?.finish().map(|_| ()),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

/// Creates a buffered file, gzip-compressed if `gzip` is true.
pub fn create(filename: &Path, gzip: bool) -> io::Result<Output> {
    if gzip {
        create_gzip(filename).map(Output::Gzip)
    } else {
        Ok(Output::Plain(BufWriter::new(File::create(filename)?)))
    }
}

/// Returns a path with a new suffix appended to the end.
pub fn append_path(path: &Path, suffix: impl AsRef<OsStr>) -> PathBuf {
    let mut os_string = path.as_os_str().to_owned();
    os_string.push(suffix.as_ref());
    os_string.into()
}

/// Create directory (and its parents), if it does not exist yet.
pub fn mkdir(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path)
    } else {
        Ok(())
    }
}
