//! Frontend message encoding and the few backend messages the watchdog reads.

use bytes::{BufMut, BytesMut};

/// Protocol version 3.0.
pub const PROTOCOL_VERSION: i32 = 196_608;

/// Backend message tags.
pub mod tag {
    pub const AUTHENTICATION: u8 = b'R';
    pub const PARAMETER_STATUS: u8 = b'S';
    pub const BACKEND_KEY_DATA: u8 = b'K';
    pub const READY_FOR_QUERY: u8 = b'Z';
    pub const DATA_ROW: u8 = b'D';
    pub const ERROR_RESPONSE: u8 = b'E';
    pub const NOTICE_RESPONSE: u8 = b'N';
}

/// `AuthenticationOk` sub-code.
pub const AUTH_OK: u32 = 0;

/// Encode a `StartupMessage` with the given parameters.
pub fn startup_message(params: &[(&str, &str)], buf: &mut BytesMut) {
    let start = buf.len();
    buf.put_i32(0);
    buf.put_i32(PROTOCOL_VERSION);
    for (key, value) in params {
        put_cstr(buf, key);
        put_cstr(buf, value);
    }
    buf.put_u8(0);
    patch_len(buf, start);
}

/// Encode a simple `Query` message.
pub fn query_message(query: &str, buf: &mut BytesMut) {
    buf.put_u8(b'Q');
    let start = buf.len();
    buf.put_i32(0);
    put_cstr(buf, query);
    patch_len(buf, start);
}

/// Encode a `Terminate` message.
pub fn terminate_message(buf: &mut BytesMut) {
    buf.put_u8(b'X');
    buf.put_i32(4);
}

/// Extract the human readable message (`M` field) of an `ErrorResponse`
/// body. Falls back to a generic text when the field is missing.
pub fn error_message(body: &[u8]) -> String {
    let mut fields = body;
    while let Some((&code, rest)) = fields.split_first() {
        if code == 0 {
            break;
        }
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        if code == b'M' {
            return String::from_utf8_lossy(&rest[..end]).into_owned();
        }
        fields = rest.get(end + 1..).unwrap_or_default();
    }
    "unknown backend error".to_string()
}

fn put_cstr(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}

fn patch_len(buf: &mut BytesMut, start: usize) {
    let len = (buf.len() - start) as i32;
    buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
}
