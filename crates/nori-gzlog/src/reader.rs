//! Forward and reverse cursors over a log file.
//!
//! Readers never take the file lock. A frame still being written shows up as
//! a short tail and ends the forward scan without an error.

use crate::codec::Compression;
use crate::frame::{self, FrameError, FRAME_OVERHEAD, HEADER_LEN, TRAILER_LEN};
use crate::log::LogError;
use bytes::Bytes;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, BufReader};

/// Reads until `buf` is full or EOF, returning the number of bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
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

/// Cursor yielding records oldest-first.
pub struct LogReader {
    reader: BufReader<File>,
    compression: Compression,
    skip: usize,
    index: usize,
    offset: u64,
    done: bool,
}

impl LogReader {
    pub(crate) async fn open(
        path: &Path,
        compression: Compression,
        skip: usize,
    ) -> Result<Self, LogError> {
        let file = File::open(path).await?;
        tracing::debug!(path = %path.display(), skip, "opened log reader");

        Ok(Self {
            reader: BufReader::new(file),
            compression,
            skip,
            index: 0,
            offset: 0,
            done: false,
        })
    }

    /// Returns the next decompressed record, or `None` once no further
    /// complete frame can be parsed.
    ///
    /// After an error the cursor stays exhausted.
    pub async fn next_record(&mut self) -> Result<Option<Bytes>, LogError> {
        if self.done {
            return Ok(None);
        }

        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    /// Number of frames consumed so far, skipped ones included.
    pub fn position(&self) -> usize {
        self.index
    }

    async fn advance(&mut self) -> Result<Option<Bytes>, LogError> {
        loop {
            let frame_start = self.offset;

            let mut head = [0u8; HEADER_LEN];
            if read_full(&mut self.reader, &mut head).await? < HEADER_LEN {
                return Ok(None);
            }
            let len = frame::decode_len(&head, frame_start)?;
            self.offset += HEADER_LEN as u64;

            if self.index < self.skip {
                let jump = u64::from(len) + TRAILER_LEN as u64;
                self.reader.seek(SeekFrom::Current(jump as i64)).await?;
                self.offset += jump;
                self.index += 1;
                continue;
            }

            let mut payload = Vec::new();
            (&mut self.reader)
                .take(u64::from(len))
                .read_to_end(&mut payload)
                .await?;
            if payload.len() < len as usize {
                tracing::debug!(offset = frame_start, len, "truncated tail frame");
                return Ok(None);
            }
            self.offset += u64::from(len);

            let mut tail = [0u8; TRAILER_LEN];
            if read_full(&mut self.reader, &mut tail).await? < TRAILER_LEN {
                // The trailer is still being written; nothing past it is readable yet.
                self.done = true;
            } else {
                let tail_len = frame::decode_len(&tail, self.offset)?;
                if tail_len != len {
                    return Err(FrameError::Corrupt {
                        offset: frame_start,
                        reason: format!(
                            "header length {len} does not match trailer length {tail_len}"
                        ),
                    }
                    .into());
                }
                self.offset += TRAILER_LEN as u64;
            }

            self.index += 1;
            let record = self.compression.decompress(&payload)?;
            return Ok(Some(Bytes::from(record)));
        }
    }
}

/// Cursor yielding records newest-first, walking the trailing length copies.
pub struct ReverseReader {
    file: File,
    compression: Compression,
    pos: u64,
    /// Header length of a frame at `pos` whose trailer is not written yet.
    pending: Option<u32>,
    done: bool,
}

impl ReverseReader {
    pub(crate) async fn open(path: &Path, compression: Compression) -> Result<Self, LogError> {
        let mut file = File::open(path).await?;
        let len = file.metadata().await?.len();

        let (pos, pending) = if tail_is_complete(&mut file, len).await? {
            (len, None)
        } else {
            last_complete_end(&mut file, len).await?
        };
        tracing::debug!(path = %path.display(), len, start = pos, "opened reverse log reader");

        Ok(Self {
            file,
            compression,
            pos,
            pending,
            done: false,
        })
    }

    /// Returns the previous record, or `None` at the start of the file.
    pub async fn next_record(&mut self) -> Result<Option<Bytes>, LogError> {
        if self.done {
            return Ok(None);
        }

        let result = self.retreat().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    async fn retreat(&mut self) -> Result<Option<Bytes>, LogError> {
        if let Some(len) = self.pending.take() {
            let mut payload = vec![0u8; len as usize];
            self.file
                .seek(SeekFrom::Start(self.pos + HEADER_LEN as u64))
                .await?;
            self.file.read_exact(&mut payload).await?;

            let record = self.compression.decompress(&payload)?;
            return Ok(Some(Bytes::from(record)));
        }

        if self.pos == 0 {
            return Ok(None);
        }
        if self.pos < FRAME_OVERHEAD as u64 {
            return Err(FrameError::Corrupt {
                offset: 0,
                reason: format!("{} leading bytes do not form a frame", self.pos),
            }
            .into());
        }

        let trailer_at = self.pos - TRAILER_LEN as u64;
        let mut tail = [0u8; TRAILER_LEN];
        self.file.seek(SeekFrom::Start(trailer_at)).await?;
        self.file.read_exact(&mut tail).await?;
        let len = frame::decode_len(&tail, trailer_at)?;

        let frame_len = u64::from(len) + FRAME_OVERHEAD as u64;
        let start = self
            .pos
            .checked_sub(frame_len)
            .ok_or_else(|| FrameError::Corrupt {
                offset: trailer_at,
                reason: format!("trailer length {len} runs past the start of the file"),
            })?;

        let mut buf = vec![0u8; frame_len as usize];
        self.file.seek(SeekFrom::Start(start)).await?;
        self.file.read_exact(&mut buf).await?;
        let (payload, _) = frame::decode(&buf, start)?;

        let record = self.compression.decompress(payload)?;
        self.pos = start;
        Ok(Some(Bytes::from(record)))
    }
}

/// Checks whether the last bytes of the file close a consistent frame.
async fn tail_is_complete(file: &mut File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    if len < FRAME_OVERHEAD as u64 {
        return Ok(false);
    }

    let mut tail = [0u8; TRAILER_LEN];
    file.seek(SeekFrom::Start(len - TRAILER_LEN as u64)).await?;
    file.read_exact(&mut tail).await?;

    let Ok(frame_len) = frame::decode_len(&tail, len - TRAILER_LEN as u64) else {
        return Ok(false);
    };
    let Some(start) = len.checked_sub(u64::from(frame_len) + FRAME_OVERHEAD as u64) else {
        return Ok(false);
    };

    let mut head = [0u8; HEADER_LEN];
    file.seek(SeekFrom::Start(start)).await?;
    file.read_exact(&mut head).await?;

    Ok(head == tail)
}

/// Walks frame headers from the start to find where the last complete frame ends.
///
/// A final frame whose payload is complete but whose trailer is still being
/// written is returned as its header length, matching what the forward reader
/// yields for it.
async fn last_complete_end(file: &mut File, len: u64) -> Result<(u64, Option<u32>), LogError> {
    let mut pos = 0u64;
    let mut pending = None;
    while pos + HEADER_LEN as u64 <= len {
        let mut head = [0u8; HEADER_LEN];
        file.seek(SeekFrom::Start(pos)).await?;
        file.read_exact(&mut head).await?;

        let frame_len = frame::decode_len(&head, pos)?;
        let payload_end = pos + HEADER_LEN as u64 + u64::from(frame_len);
        let next = payload_end + TRAILER_LEN as u64;
        if next > len {
            if payload_end <= len {
                pending = Some(frame_len);
            }
            break;
        }
        pos = next;
    }

    tracing::debug!(
        len,
        end = pos,
        partial_trailer = pending.is_some(),
        "reverse reader skipped truncated tail"
    );
    Ok((pos, pending))
}
