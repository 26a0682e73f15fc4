use crate::err::{self, Error};
use bytes::{Bytes, BytesMut};
use futures::future::Either;
use futures::stream::{self, MapOk, TryStreamExt};
use snafu::ResultExt;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio_util::codec::{BytesCodec, FramedRead};

/// A local file picked for upload.
#[derive(Clone, Debug)]
pub struct FileHandle {
    /// File name, without directories. Also used as the object key.
    pub name: String,
    /// Size in bytes
    pub size: u64,
    pub mime_type: String,
    pub source: ObjectSource,
}
impl FileHandle {
    /// Stat the file at `path`.
    pub async fn open(path: PathBuf) -> Result<Self, Error> {
        let metadata = tokio::fs::metadata(&path).await.context(err::Io {
            description: path.display().to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            mime_type: mime_type_for(&name).to_string(),
            name,
            size: metadata.len(),
            source: ObjectSource::file(path),
        })
    }
    pub fn from_data<D: Into<Bytes>>(name: &str, data: D) -> Self {
        let data = data.into();
        Self {
            name: name.to_string(),
            size: data.len() as u64,
            mime_type: mime_type_for(name).to_string(),
            source: ObjectSource::Data { data },
        }
    }
}

#[derive(Clone, Debug)]
pub enum ObjectSource {
    File { path: PathBuf },
    Data { data: Bytes },
}

/// Chunks of a file read from disk.
pub type FileChunks = MapOk<FramedRead<tokio::fs::File, BytesCodec>, fn(BytesMut) -> Bytes>;
/// Chunks of an in-memory object.
pub type DataChunks = stream::Iter<std::vec::IntoIter<io::Result<Bytes>>>;
/// Content of an [`ObjectSource`], read in chunks. `Send + Sync` so it can back a request body.
pub type SourceStream = Either<FileChunks, DataChunks>;

impl ObjectSource {
    pub fn file(path: PathBuf) -> Self {
        Self::File { path }
    }
    pub fn data<D: Into<Bytes>>(data: D) -> Self {
        Self::Data { data: data.into() }
    }
    /// Open the content as a stream of chunks of at most `chunk_size` bytes, together with the
    /// total length.
    pub async fn open(&self, chunk_size: usize) -> Result<(SourceStream, u64), Error> {
        let chunk_size = chunk_size.max(1);
        match self {
            Self::File { path } => {
                let file = tokio::fs::File::open(path.clone()).await.with_context({
                    let path = path.clone();
                    move || err::Io {
                        description: path.display().to_string(),
                    }
                })?;
                let metadata = file.metadata().await.with_context({
                    let path = path.clone();
                    move || err::Io {
                        description: path.display().to_string(),
                    }
                })?;
                let freeze: fn(BytesMut) -> Bytes = BytesMut::freeze;
                Ok((
                    Either::Left(
                        FramedRead::with_capacity(file, BytesCodec::new(), chunk_size)
                            .map_ok(freeze),
                    ),
                    metadata.len(),
                ))
            }
            Self::Data { data } => {
                let chunks = (0..data.len())
                    .step_by(chunk_size)
                    .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
                    .collect::<Vec<_>>();
                Ok((Either::Right(stream::iter(chunks)), data.len() as u64))
            }
        }
    }
}

/// Human-readable size: base 1024, at most two decimals, trailing zeros dropped.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let (mut exp, mut scaled) = (0, bytes);
    while scaled >= 1024 && exp < UNITS.len() - 1 {
        scaled /= 1024;
        exp += 1;
    }
    // Round half up to two decimals before printing; `{:.2}` alone rounds half to even
    let value = (bytes as f64 / 1024f64.powi(exp as i32) * 100.0).round() / 100.0;
    let value = format!("{:.2}", value);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, UNITS[exp])
}

/// MIME type guessed from the file extension.
pub fn mime_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Convenience function (using `walkdir`) to collect all files under `path`. A path that is
/// itself a file yields just that file.
pub fn files_recursive(path: PathBuf) -> impl Iterator<Item = PathBuf> {
    walkdir::WalkDir::new(path)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                if entry.file_type().is_file() {
                    Some(entry.path().to_owned())
                } else {
                    None
                }
            })
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_files_recursive() {
        let tmp_dir = TempDir::new("upload-tracker").unwrap();
        let dir = tmp_dir.path();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for i in 0..10 {
            std::fs::write(dir.join(format!("img_{}.tif", i)), "file contents").unwrap();
        }
        std::fs::write(dir.join("nested").join("deep.txt"), "deep").unwrap();
        assert_eq!(files_recursive(dir.to_owned()).count(), 11);
        assert_eq!(files_recursive(dir.join("img_3.tif")).count(), 1);
    }

    #[test]
    fn human_readable_sizes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(100), "100 Bytes");
        assert_eq!(format_bytes(200), "200 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
        // Halves round up
        assert_eq!(format_bytes(1152), "1.13 KB");
        assert_eq!(format_bytes(3200), "3.13 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for("a.txt"), "text/plain");
        assert_eq!(mime_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(mime_type_for("Makefile"), "application/octet-stream");
    }

    #[tokio::test]
    async fn open_file_handle() {
        let tmp_dir = TempDir::new("upload-tracker").unwrap();
        let path = tmp_dir.path().join("notes.md");
        std::fs::write(&path, vec![b'x'; 2048]).unwrap();

        let file = FileHandle::open(path).await.unwrap();
        assert_eq!(file.name, "notes.md");
        assert_eq!(file.size, 2048);
        assert_eq!(file.mime_type, "text/markdown");

        let missing = FileHandle::open(tmp_dir.path().join("missing")).await;
        assert!(matches!(missing, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn data_is_chunked() {
        let source = ObjectSource::data(vec![7u8; 10]);
        let (stream, len) = source.open(4).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(len, 10);
        assert_eq!(
            chunks.iter().map(|c| c.len()).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
    }

    #[tokio::test]
    async fn file_is_streamed() {
        let tmp_dir = TempDir::new("upload-tracker").unwrap();
        let path = tmp_dir.path().join("blob.bin");
        std::fs::write(&path, vec![1u8; 3000]).unwrap();
        let (stream, len) = ObjectSource::file(path).open(1024).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(len, 3000);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 3000);
    }
}
