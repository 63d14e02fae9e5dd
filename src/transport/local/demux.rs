//! Engine API stream demultiplexing
//!
//! Without a TTY the Engine API multiplexes stdout and stderr onto one byte stream.
//! Each frame is an 8-byte header `[stream, 0, 0, 0, size_be32]` followed by
//! `size` bytes of payload. Data that does not start with a valid header is a
//! raw (TTY) stream and is treated as stdout.

const HEADER_LEN: usize = 8;

/// Origin of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Standard input echo (stream 0)
    Stdin,
    /// Standard output (stream 1)
    Stdout,
    /// Standard error (stream 2)
    Stderr,
}

/// One payload chunk and the stream it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Origin stream
    pub stream: StreamKind,
    /// Payload bytes
    pub data: &'a [u8],
}

fn parse_header(buf: &[u8]) -> Option<(StreamKind, usize)> {
    if buf.len() < HEADER_LEN || buf[1..4] != [0, 0, 0] {
        return None;
    }
    let stream = match buf[0] {
        0 => StreamKind::Stdin,
        1 => StreamKind::Stdout,
        2 => StreamKind::Stderr,
        _ => return None,
    };
    let size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    Some((stream, size))
}

/// Split a multiplexed buffer into frames in arrival order
#[must_use]
pub fn frames(buf: &[u8]) -> Vec<Frame<'_>> {
    let mut out = Vec::new();
    let mut rest = buf;

    while !rest.is_empty() {
        let Some((stream, size)) = parse_header(rest) else {
            out.push(Frame {
                stream: StreamKind::Stdout,
                data: rest,
            });
            break;
        };
        let body = &rest[HEADER_LEN..];
        let take = size.min(body.len());
        out.push(Frame {
            stream,
            data: &body[..take],
        });
        rest = &body[take..];
    }

    out
}

/// Collect stdout and stderr separately
#[must_use]
pub fn split(buf: &[u8]) -> (String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for frame in frames(buf) {
        match frame.stream {
            StreamKind::Stdout | StreamKind::Stdin => stdout.extend_from_slice(frame.data),
            StreamKind::Stderr => stderr.extend_from_slice(frame.data),
        }
    }
    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

/// Concatenate every frame's payload in arrival order
#[must_use]
pub fn merged(buf: &[u8]) -> String {
    let bytes: Vec<u8> = frames(buf)
        .into_iter()
        .flat_map(|frame| frame.data.iter().copied())
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
