//! Translation server client
//!
//! Every request is one HTTP/1.1 exchange over a fresh connection:
//! connect, send, receive until the server closes, keep the body. Any
//! failure collapses into [`CONNECT_FAILURE_TEXT`], which the confirmation
//! workflow shows like any other item.

use core::fmt::Write;

use heapless::String;

use crate::config::{
    CONNECT_FAILURE_TEXT, HTTP_CHUNK_SIZE, HTTP_REQUEST_SIZE, HTTP_RESPONSE_SIZE, ITEM_SIZE,
    SERVER_HOST, SERVER_PORT,
};
use crate::microphone::linear16_le_bytes;

/// Translated item text
pub type Item = String<ITEM_SIZE>;

pub type Request = String<HTTP_REQUEST_SIZE>;

/// Network failures, all reported to the user as a connection problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetError {
    Connect,
    /// The request did not fit the request buffer
    Request,
    Send,
    Receive,
}

/// Byte stream to the server
#[allow(async_fn_in_trait)]
pub trait Connection {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), NetError>;

    /// Read into `buf`, `Ok(0)` once the peer has closed the stream
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError>;
}

/// Opens byte streams
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Connection: Connection;

    async fn connect(&mut self, host: &str, port: u16) -> Result<Self::Connection, NetError>;
}

/// Turns raw artifacts into item text
#[allow(async_fn_in_trait)]
pub trait Translator {
    async fn translate_barcode(&mut self, barcode: &str) -> Item;
    async fn translate_audio(&mut self, samples: &[u16]) -> Item;
}

/// Copy `text` into an [`Item`], cutting at the last whole character that fits
pub fn text_item(text: &str) -> Item {
    let mut item = Item::new();
    for c in text.chars() {
        if item.push(c).is_err() {
            break;
        }
    }
    item
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn write_path_segment(out: &mut Request, segment: &str) -> core::fmt::Result {
    for &byte in segment.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char).map_err(|_| core::fmt::Error)?;
        } else {
            write!(out, "%{:02X}", byte)?;
        }
    }
    Ok(())
}

/// `GET /barcode/<code>` request, the code percent-encoded
pub fn barcode_request(host: &str, barcode: &str) -> Result<Request, NetError> {
    let mut request = Request::new();
    request.push_str("GET /barcode/").map_err(|_| NetError::Request)?;
    write_path_segment(&mut request, barcode).map_err(|_| NetError::Request)?;
    write!(
        request,
        " HTTP/1.1\r\nHost: {}\r\nConnection: Close\r\n\r\n",
        host
    )
    .map_err(|_| NetError::Request)?;
    Ok(request)
}

/// Header of the `POST /speech` request carrying `body_len` bytes of audio
pub fn audio_request_header(host: &str, body_len: usize) -> Result<Request, NetError> {
    let mut request = Request::new();
    write!(
        request,
        "POST /speech HTTP/1.1\r\nHost: {}\r\nConnection: Close\r\nContent-Length: {}\r\nContent-Type: audio/wav\r\n\r\n",
        host, body_len
    )
    .map_err(|_| NetError::Request)?;
    Ok(request)
}

/// Body of an HTTP response, empty if the header never terminates
pub fn parse_body(response: &[u8]) -> &[u8] {
    response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|end| &response[end + 4..])
        .unwrap_or(&[])
}

/// Body text as an item; invalid UTF-8 ends the text
pub fn item_from_body(body: &[u8]) -> Item {
    let text = match core::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&body[..e.valid_up_to()]).unwrap_or(""),
    };
    text_item(text.trim())
}

/// Read until the peer closes or `buf` is full, returns the byte count
async fn receive_until_close<S: Connection>(stream: &mut S, buf: &mut [u8]) -> Result<usize, NetError> {
    let mut total = 0;
    while total < buf.len() {
        let received = stream.read(&mut buf[total..]).await?;
        if received == 0 {
            break;
        }
        total += received;
    }
    Ok(total)
}

/// [`Translator`] talking HTTP to the translation server
pub struct HttpTranslator<C> {
    connector: C,
    host: &'static str,
    port: u16,
}

impl<C: Connector> HttpTranslator<C> {
    pub fn new(connector: C) -> Self {
        Self::with_server(connector, SERVER_HOST, SERVER_PORT)
    }

    pub fn with_server(connector: C, host: &'static str, port: u16) -> Self {
        Self {
            connector,
            host,
            port,
        }
    }

    async fn request_barcode(&mut self, barcode: &str) -> Result<Item, NetError> {
        let request = barcode_request(self.host, barcode)?;
        let mut stream = self.connector.connect(self.host, self.port).await?;
        stream.write_all(request.as_bytes()).await?;

        let mut response = [0u8; HTTP_RESPONSE_SIZE];
        let len = receive_until_close(&mut stream, &mut response).await?;
        Ok(item_from_body(parse_body(&response[..len])))
    }

    async fn request_audio(&mut self, samples: &[u16]) -> Result<Item, NetError> {
        let header = audio_request_header(self.host, samples.len() * 2)?;
        let mut stream = self.connector.connect(self.host, self.port).await?;
        stream.write_all(header.as_bytes()).await?;

        let mut bytes = [0u8; HTTP_CHUNK_SIZE * 2];
        for chunk in samples.chunks(HTTP_CHUNK_SIZE) {
            let len = linear16_le_bytes(chunk, &mut bytes);
            stream.write_all(&bytes[..len]).await?;
        }

        let mut response = [0u8; HTTP_RESPONSE_SIZE];
        let len = receive_until_close(&mut stream, &mut response).await?;
        Ok(item_from_body(parse_body(&response[..len])))
    }
}

impl<C: Connector> Translator for HttpTranslator<C> {
    async fn translate_barcode(&mut self, barcode: &str) -> Item {
        match self.request_barcode(barcode).await {
            Ok(item) => {
                debug!("Client: barcode {} -> {}", barcode, item.as_str());
                item
            }
            Err(e) => {
                warn!("Client: barcode request failed: {}", e);
                text_item(CONNECT_FAILURE_TEXT)
            }
        }
    }

    async fn translate_audio(&mut self, samples: &[u16]) -> Item {
        match self.request_audio(samples).await {
            Ok(item) => {
                debug!("Client: {} samples -> {}", samples.len(), item.as_str());
                item
            }
            Err(e) => {
                warn!("Client: speech request failed: {}", e);
                text_item(CONNECT_FAILURE_TEXT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_request_format() {
        let request = barcode_request("10.0.0.1", "0123").unwrap();
        assert_eq!(
            request.as_str(),
            "GET /barcode/0123 HTTP/1.1\r\nHost: 10.0.0.1\r\nConnection: Close\r\n\r\n"
        );
    }

    #[test]
    fn barcode_key_names_are_encoded() {
        let request = barcode_request("h", "12KP 1/").unwrap();
        assert!(request.starts_with("GET /barcode/12KP%201%2F HTTP/1.1\r\n"));
    }

    #[test]
    fn audio_header_has_length() {
        let header = audio_request_header("h", 640).unwrap();
        assert!(header.starts_with("POST /speech HTTP/1.1\r\n"));
        assert!(header.contains("Content-Length: 640\r\n"));
        assert!(header.ends_with("Content-Type: audio/wav\r\n\r\n"));
    }

    #[test]
    fn body_after_headers() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\napple";
        assert_eq!(parse_body(response), b"apple");
    }

    #[test]
    fn missing_terminator_is_empty_body() {
        assert_eq!(parse_body(b"HTTP/1.1 200 OK\r\n"), b"");
    }

    #[test]
    fn item_text_is_bounded() {
        let long = [b'x'; ITEM_SIZE + 10];
        assert_eq!(item_from_body(&long).len(), ITEM_SIZE);
        assert_eq!(item_from_body(b"milk\r\n").as_str(), "milk");
    }
}
