use crate::{FileDropError, Result};
use sha2::{Digest, Sha256};
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Read granularity of the hashing pass: 1 MiB.
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Size and SHA-256 of a fully consumed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDigest {
    pub size: u64,
    pub sha256: String,
}

/// Hashes a seekable stream in bounded chunks while enforcing a size limit.
///
/// The limit is checked after every chunk, so at most `max_bytes + chunk_size`
/// bytes are read before an oversized stream is rejected. On success the
/// stream is rewound to its start for the next consumer.
#[derive(Debug, Clone, Copy)]
pub struct StreamHasher {
    max_bytes: u64,
    chunk_size: usize,
}

impl StreamHasher {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            chunk_size: HASH_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn hash_and_rewind<R>(&self, reader: &mut R) -> Result<StreamDigest>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        let mut hasher = Sha256::new();
        let mut size = 0u64;
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = read_chunk(reader, &mut buf).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buf[..n]);
            size += n as u64;

            if size > self.max_bytes {
                tracing::debug!(
                    "Rejecting stream after {} bytes (limit {})",
                    size,
                    self.max_bytes
                );
                return Err(FileDropError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        reader.seek(SeekFrom::Start(0)).await?;

        Ok(StreamDigest {
            size,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Compute SHA256 hash of in-memory data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
