use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Size of every client request: a type byte followed by two big-endian i32s.
pub const REQUEST_LEN: usize = 9;
/// Size of every server response: one big-endian i32.
pub const RESPONSE_LEN: usize = 4;

pub mod message_type {
    pub const INSERT: u8 = b'I';
    pub const QUERY: u8 = b'Q';
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Request {
    Insert { timestamp: i32, price: i32 },
    Query { min_time: i32, max_time: i32 },
    // a well-sized frame with a type byte we don't know, it's ignored
    Unknown { ty: u8 },
}

impl Request {
    pub fn from_bytes(bytes: &[u8; REQUEST_LEN]) -> Self {
        let ty = bytes[0];
        let i1 = i32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let i2 = i32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);

        match ty {
            message_type::INSERT => Request::Insert {
                timestamp: i1,
                price: i2,
            },
            message_type::QUERY => Request::Query {
                min_time: i1,
                max_time: i2,
            },
            _ => Request::Unknown { ty },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    average: i32,
}

impl Response {
    pub fn create_query_response(average: i32) -> Self {
        Self { average }
    }

    pub fn average(&self) -> i32 {
        self.average
    }

    pub fn to_bytes(&self) -> [u8; RESPONSE_LEN] {
        self.average.to_be_bytes()
    }
}

/// Splits a byte stream into requests.
///
/// Frames split across several reads are held in the read buffer until all
/// 9 bytes have arrived; several frames in one read are yielded one by one.
#[derive(Debug, Default)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = tokio::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < REQUEST_LEN {
            src.reserve(REQUEST_LEN - src.len());
            return Ok(None);
        }

        let mut frame = [0u8; REQUEST_LEN];
        src.copy_to_slice(&mut frame);

        Ok(Some(Request::from_bytes(&frame)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None => {
                // the peer left in the middle of a frame, there is nobody to tell
                if !src.is_empty() {
                    tracing::debug!("discarding {} bytes of an incomplete frame", src.len());
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use tokio_util::codec::Decoder;

    use super::{Request, RequestCodec, Response};

    #[test]
    fn check_request_parsing() {
        let raw_requests = [
            b"\x49\x00\x00\xa0\x00\x00\x00\x00\x05",
            b"\x51\x00\x00\x30\x00\x00\x00\x40\x00",
            b"\x49\xff\xff\xff\xff\x80\x00\x00\x00",
            b"\x58\x00\x00\x30\x39\x00\x00\x00\x65",
        ];

        let expected_requests = [
            Request::Insert {
                timestamp: 40960,
                price: 5,
            },
            Request::Query {
                min_time: 12288,
                max_time: 16384,
            },
            Request::Insert {
                timestamp: -1,
                price: i32::MIN,
            },
            Request::Unknown { ty: b'X' },
        ];

        for (raw, expected) in raw_requests.iter().zip(expected_requests) {
            assert_eq!(Request::from_bytes(raw), expected);
        }
    }

    #[test]
    fn check_response_encoding() {
        assert_eq!(Response::create_query_response(101).to_bytes(), [0, 0, 0, 101]);
        assert_eq!(
            Response::create_query_response(-2).to_bytes(),
            [0xff, 0xff, 0xff, 0xfe]
        );
    }

    #[test]
    fn decoder_waits_for_a_full_frame() {
        let mut codec = RequestCodec;
        let mut buffer = BytesMut::from(&b"\x49\x00\x00\x30"[..]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert_eq!(buffer.len(), 4);

        buffer.extend_from_slice(b"\x39\x00\x00\x00\x65");
        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some(Request::Insert {
                timestamp: 12345,
                price: 101
            })
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn decoder_splits_back_to_back_frames() {
        let mut codec = RequestCodec;
        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(b"\x49\x00\x00\x30\x39\x00\x00\x00\x65");
        buffer.extend_from_slice(b"\x51\x00\x00\x30\x00\x00\x00\x40\x00");
        buffer.extend_from_slice(b"\x51\x00");

        assert!(matches!(
            codec.decode(&mut buffer).unwrap(),
            Some(Request::Insert { .. })
        ));
        assert!(matches!(
            codec.decode(&mut buffer).unwrap(),
            Some(Request::Query { .. })
        ));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn decoder_drops_trailing_partial_frame_on_eof() {
        let mut codec = RequestCodec;
        let mut buffer = BytesMut::from(&b"\x49\x00\x00"[..]);
        assert_eq!(codec.decode_eof(&mut buffer).unwrap(), None);
        assert!(buffer.is_empty());
    }
}
