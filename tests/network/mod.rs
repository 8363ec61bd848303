use libiot_dp::network::error::Error;
use libiot_dp::network::*;
use std::collections::VecDeque;


/// In-memory connection with scripted reads and captured writes.
///
/// Each queued read is handed out by one `read` call (split if the caller's
/// buffer is smaller). Once the script is exhausted `read` reports end of
/// stream.
#[derive(Debug)]
pub struct MockConnection {
    reads: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub write_calls: usize,
    /// Most bytes accepted by a single `write` call.
    pub write_limit: Option<usize>,
    pub is_open: bool,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            written: Vec::new(),
            write_calls: 0,
            write_limit: None,
            is_open: true,
        }
    }

    /// Queue `data` to be returned by a single read.
    pub fn push_read(&mut self, data: &[u8]) {
        self.reads.push_back(data.to_vec());
    }

    /// Queue `data` split into reads of at most `chunk` bytes.
    pub fn push_chunked(&mut self, data: &[u8], chunk: usize) {
        for piece in data.chunks(chunk) {
            self.push_read(piece);
        }
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl Read for MockConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if !self.is_open {
            return Err(Error::NotOpen);
        }
        let Some(mut next) = self.reads.pop_front() else {
            return Ok(0);
        };
        let len = buf.len().min(next.len());
        buf[..len].copy_from_slice(&next[..len]);
        if len < next.len() {
            next.drain(..len);
            self.reads.push_front(next);
        }
        Ok(len)
    }
}

impl Write for MockConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if !self.is_open {
            return Err(Error::NotOpen);
        }
        self.write_calls += 1;
        let len = self.write_limit.map_or(buf.len(), |limit| buf.len().min(limit));
        self.written.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.is_open {
            return Err(Error::NotOpen);
        }
        Ok(())
    }
}

impl Connection for MockConnection {}

#[test]
fn test_read_write() {
    let mut conn = MockConnection::new();
    let write_data = [1, 2, 3, 4];

    let bytes_written = conn.write(&write_data).unwrap();
    assert_eq!(bytes_written, write_data.len());
    assert_eq!(conn.written, write_data);

    conn.push_read(&[5, 6, 7, 8]);
    let mut read_buf = [0; 4];
    let bytes_read = conn.read(&mut read_buf).unwrap();
    assert_eq!(bytes_read, 4);
    assert_eq!(read_buf, [5, 6, 7, 8]);
}

#[test]
fn test_read_split_across_calls() {
    let mut conn = MockConnection::new();
    conn.push_read(&[1, 2, 3, 4, 5]);

    let mut read_buf = [0; 3];
    assert_eq!(conn.read(&mut read_buf), Ok(3));
    assert_eq!(read_buf, [1, 2, 3]);
    assert_eq!(conn.read(&mut read_buf), Ok(2));
    assert_eq!(&read_buf[..2], &[4, 5]);
    assert_eq!(conn.read(&mut read_buf), Ok(0));
}

#[test]
fn test_write_vectored_stops_at_short_write() {
    let mut conn = MockConnection::new();
    conn.write_limit = Some(3);

    let written = conn.write_vectored(&[b"ab", b"", b"cdef", b"gh"]).unwrap();
    assert_eq!(written, 5);
    assert_eq!(conn.written, b"abcde");
    assert_eq!(conn.write_calls, 2);
}

#[test]
fn test_op_on_closed_connection() {
    let mut conn = MockConnection::new();
    conn.is_open = false;

    let mut buf = [0; 4];
    assert_eq!(conn.read(&mut buf), Err(Error::NotOpen));
    assert_eq!(conn.write(&[1, 2]), Err(Error::NotOpen));
    assert_eq!(conn.flush(), Err(Error::NotOpen));
}
