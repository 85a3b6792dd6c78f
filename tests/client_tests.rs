//! Translation client tests against a scripted connection

use std::cell::RefCell;
use std::rc::Rc;

use embassy_futures::block_on;
use fit_acquisition::client::{Connection, Connector, HttpTranslator, NetError, Translator};
use fit_acquisition::config::{CONNECT_FAILURE_TEXT, HTTP_CHUNK_SIZE};

#[derive(Default)]
struct Script {
    refuse_connect: bool,
    fail_send: bool,
    fail_receive: bool,
    /// Bytes handed out per read call
    read_size: usize,
    response: Vec<u8>,
    sent: Vec<u8>,
    writes: usize,
    connected_to: Option<(String, u16)>,
}

#[derive(Clone, Default)]
struct MockConnector(Rc<RefCell<Script>>);

impl MockConnector {
    fn responding(response: &str) -> Self {
        let connector = Self::default();
        {
            let mut script = connector.0.borrow_mut();
            script.response = response.as_bytes().to_vec();
            script.read_size = 7;
        }
        connector
    }

    fn sent(&self) -> Vec<u8> {
        self.0.borrow().sent.clone()
    }
}

struct MockStream {
    script: Rc<RefCell<Script>>,
    offset: usize,
}

impl Connection for MockStream {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), NetError> {
        let mut script = self.script.borrow_mut();
        if script.fail_send {
            return Err(NetError::Send);
        }
        script.sent.extend_from_slice(buf);
        script.writes += 1;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let script = self.script.borrow();
        if script.fail_receive {
            return Err(NetError::Receive);
        }
        let remaining = &script.response[self.offset..];
        let count = remaining.len().min(buf.len()).min(script.read_size);
        buf[..count].copy_from_slice(&remaining[..count]);
        self.offset += count;
        Ok(count)
    }
}

impl Connector for MockConnector {
    type Connection = MockStream;

    async fn connect(&mut self, host: &str, port: u16) -> Result<MockStream, NetError> {
        let mut script = self.0.borrow_mut();
        if script.refuse_connect {
            return Err(NetError::Connect);
        }
        script.connected_to = Some((host.to_string(), port));
        Ok(MockStream {
            script: self.0.clone(),
            offset: 0,
        })
    }
}

const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nbanana";

#[test]
fn test_barcode_round_trip() {
    let connector = MockConnector::responding(OK_RESPONSE);
    let mut translator = HttpTranslator::with_server(connector.clone(), "example.test", 8080);

    let item = block_on(translator.translate_barcode("0123456789"));
    assert_eq!(item.as_str(), "banana");

    let sent = String::from_utf8(connector.sent()).unwrap();
    assert_eq!(
        sent,
        "GET /barcode/0123456789 HTTP/1.1\r\nHost: example.test\r\nConnection: Close\r\n\r\n"
    );
    assert_eq!(
        connector.0.borrow().connected_to,
        Some(("example.test".to_string(), 8080))
    );
}

#[test]
fn test_default_server() {
    let connector = MockConnector::responding(OK_RESPONSE);
    let mut translator = HttpTranslator::new(connector.clone());
    block_on(translator.translate_barcode("1"));
    assert_eq!(
        connector.0.borrow().connected_to,
        Some(("13.56.5.40".to_string(), 80))
    );
}

#[test]
fn test_audio_body_is_little_endian() {
    let connector = MockConnector::responding(OK_RESPONSE);
    let mut translator = HttpTranslator::with_server(connector.clone(), "h", 80);
    let samples: Vec<u16> = (0..(HTTP_CHUNK_SIZE as u16 * 2 + 3)).map(|i| i.wrapping_mul(0x0101)).collect();

    let item = block_on(translator.translate_audio(&samples));
    assert_eq!(item.as_str(), "banana");

    let sent = connector.sent();
    let header_end = sent.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let header = std::str::from_utf8(&sent[..header_end]).unwrap();
    assert!(header.starts_with("POST /speech HTTP/1.1\r\n"));
    assert!(header.contains(&format!("Content-Length: {}\r\n", samples.len() * 2)));
    assert!(header.contains("Content-Type: audio/wav\r\n"));

    let body = &sent[header_end..];
    assert_eq!(body.len(), samples.len() * 2);
    for (bytes, sample) in body.chunks(2).zip(&samples) {
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), *sample);
    }
    // Header plus three body chunks
    assert_eq!(connector.0.borrow().writes, 4);
}

#[test]
fn test_connect_failure_yields_sentinel() {
    let connector = MockConnector::default();
    connector.0.borrow_mut().refuse_connect = true;
    let mut translator = HttpTranslator::new(connector);

    assert_eq!(block_on(translator.translate_barcode("1")).as_str(), CONNECT_FAILURE_TEXT);
    assert_eq!(block_on(translator.translate_audio(&[1, 2, 3])).as_str(), CONNECT_FAILURE_TEXT);
}

#[test]
fn test_send_failure_yields_sentinel() {
    let connector = MockConnector::responding(OK_RESPONSE);
    connector.0.borrow_mut().fail_send = true;
    let mut translator = HttpTranslator::new(connector);

    assert_eq!(block_on(translator.translate_barcode("1")).as_str(), CONNECT_FAILURE_TEXT);
}

#[test]
fn test_receive_failure_yields_sentinel() {
    let connector = MockConnector::responding(OK_RESPONSE);
    connector.0.borrow_mut().fail_receive = true;
    let mut translator = HttpTranslator::new(connector);

    assert_eq!(block_on(translator.translate_audio(&[7; 10])).as_str(), CONNECT_FAILURE_TEXT);
}

#[test]
fn test_response_without_body() {
    let connector = MockConnector::responding("HTTP/1.1 500 Internal Server Error\r\n");
    let mut translator = HttpTranslator::new(connector);

    assert_eq!(block_on(translator.translate_barcode("1")).as_str(), "");
}
