use crate::error::Error;
use crate::stack::{AcceptEvent, SocketEvent};
use crate::tests::mock::MockSerialPort;
use crate::wifi::Adapter;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use std::sync::Mutex;

fn adapter() -> Adapter<MockSerialPort> {
    Adapter::new(MockSerialPort::new())
}

fn ignore_data(_link_id: usize, _event: SocketEvent) {}

#[test]
fn test_tcp_connect_command() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");

    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();
    assert_eq!(0, link_id);

    assert_eq!("AT+CIPSTART=0,\"TCP\",\"h\",80\r\n".to_string(), adapter.serial.written_string());
    assert!(adapter.sessions[0].open);
    assert!(adapter.sessions[0].connected);
    assert!(!adapter.sessions[0].udp);
}

#[test]
fn test_tcp_connect_uses_next_free_slot() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    adapter.serial.add_response(b"1,CONNECT\r\nOK\r\n");

    assert_eq!(0, adapter.tcp_connect("h", 80, ignore_data).unwrap());
    assert_eq!(1, adapter.tcp_connect("h", 80, ignore_data).unwrap());

    let lines = adapter.serial.sent_lines();
    assert_eq!("AT+CIPSTART=1,\"TCP\",\"h\",80\r\n".to_string(), lines[1]);
}

#[test]
fn test_udp_socket_with_local_port() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");

    let link_id = adapter.udp_socket("ntp.org", 123, ignore_data, Some(2390)).unwrap();
    assert_eq!(0, link_id);

    assert_eq!(
        "AT+CIPSTART=0,\"UDP\",\"ntp.org\",123,2390,2\r\n".to_string(),
        adapter.serial.written_string()
    );
    assert!(adapter.sessions[0].udp);
}

#[test]
fn test_socket_slots_exhausted() {
    let mut adapter = adapter();
    for index in 0..5 {
        adapter.serial.add_response(b"OK\r\n");
        assert_eq!(index, adapter.tcp_connect("h", 80, ignore_data).unwrap());
    }

    adapter.serial.clear_written();
    let error = adapter.tcp_connect("h", 80, ignore_data).unwrap_err();

    assert_eq!(Error::Resource, error);
    assert_eq!(Some(Error::Resource), adapter.last_error());
    assert!(adapter.serial.written().is_empty());
}

#[test]
fn test_connect_dns_failure_releases_slot() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"DNS Fail\r\nERROR\r\n");

    let error = adapter.tcp_connect("bad.host", 80, ignore_data).unwrap_err();
    assert_eq!(Error::DnsFail, error);
    assert_eq!(Some(Error::DnsFail), adapter.last_error());
    assert!(!adapter.sessions[0].open);

    // The slot is free for the next attempt
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    assert_eq!(0, adapter.tcp_connect("good.host", 80, ignore_data).unwrap());
}

#[test]
fn test_connect_error_without_dns_line() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"ERROR\r\n");

    let error = adapter.tcp_connect("h", 80, ignore_data).unwrap_err();
    assert_eq!(Error::Fail, error);
    assert!(!adapter.sessions[0].open);
}

#[test]
fn test_write_get_request() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.clear_written();
    adapter.serial.add_response(b"OK\r\n> ");
    adapter.serial.add_response(b"\r\nSEND OK\r\n");

    let sent = adapter.write(link_id, b"GET /\r\n", None).unwrap();
    assert_eq!(7, sent);

    assert_eq!(
        "AT+CIPSEND=0,7\r\nGET /\r\n".to_string(),
        adapter.serial.written_string()
    );
}

#[test]
fn test_write_empty_is_a_no_op() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.clear_written();
    let sent = adapter.write(link_id, b"", None).unwrap();

    assert_eq!(0, sent);
    assert!(adapter.serial.written().is_empty());
}

#[test]
fn test_write_chunks_large_payload() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    // Two 1500 byte rounds, each chunk ending in a newline so the mock
    // releases the SEND OK
    let mut data = Vec::new();
    data.extend_from_slice(&[b'x'; 1499]);
    data.push(b'\n');
    data.extend_from_slice(&[b'x'; 1499]);
    data.push(b'\n');

    for _ in 0..2 {
        adapter.serial.add_response(b"OK\r\n> ");
        adapter.serial.add_response(b"\r\nSEND OK\r\n");
    }

    let sent = adapter.write(link_id, &data, None).unwrap();
    assert_eq!(3000, sent);

    let written = adapter.serial.written_string();
    assert_eq!(2, written.matches("AT+CIPSEND=0,1500\r\n").count());
}

#[test]
fn test_write_send_fail() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.add_response(b"OK\r\n> ");
    adapter.serial.add_response(b"\r\nSEND FAIL\r\n");

    let error = adapter.write(link_id, b"payload\n", None).unwrap_err();
    assert_eq!(Error::Fail, error);
    assert_eq!(Some(Error::Fail), adapter.last_error());
}

#[test]
fn test_write_cipsend_rejected() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.add_response(b"ERROR\r\n");
    let error = adapter.write(link_id, b"payload\n", None).unwrap_err();
    assert_eq!(Error::Fail, error);
}

#[test]
fn test_write_to_remotely_closed_socket() {
    static EVENTS: Mutex<Vec<(usize, SocketEvent)>> = Mutex::new(Vec::new());
    fn on_data(link_id: usize, event: SocketEvent) {
        EVENTS.lock().unwrap().push((link_id, event));
    }

    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, on_data).unwrap();

    adapter.serial.queue(b"0,CLOSED\r\n");
    adapter.receive();
    assert_eq!(vec![(0, SocketEvent::End)], *EVENTS.lock().unwrap());

    adapter.serial.clear_written();
    let error = adapter.write(link_id, b"data", None).unwrap_err();

    assert_eq!(Error::Disconnected, error);
    assert_eq!(Some(Error::Disconnected), adapter.last_error());
    assert!(adapter.serial.written().is_empty());
}

#[test]
fn test_write_invalid_socket() {
    let mut adapter = adapter();

    assert_eq!(Error::Invalid, adapter.write(7, b"data", None).unwrap_err());
    assert_eq!(Error::Invalid, adapter.write(0, b"data", None).unwrap_err());
    assert!(adapter.serial.written().is_empty());
}

#[test]
fn test_write_udp_address_on_tcp_socket() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    let error = adapter.write(link_id, b"data", Some("10.0.0.9")).unwrap_err();
    assert_eq!(Error::Invalid, error);
}

#[test]
fn test_write_udp_datagram_address() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.udp_socket("10.0.0.1", 123, ignore_data, None).unwrap();

    adapter.serial.clear_written();
    adapter.serial.add_response(b"OK\r\n> ");
    adapter.serial.add_response(b"\r\nSEND OK\r\n");

    adapter.write(link_id, b"ping\n", Some("10.0.0.9")).unwrap();

    assert_eq!(
        "AT+CIPSEND=0,\"10.0.0.9\",5\r\nping\n".to_string(),
        adapter.serial.written_string()
    );
}

#[test]
fn test_close_connected_socket() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.clear_written();
    adapter.serial.add_response(b"0,CLOSED\r\nOK\r\n");
    adapter.close(link_id).unwrap();

    assert_eq!("AT+CIPCLOSE=0\r\n".to_string(), adapter.serial.written_string());
    assert!(!adapter.sessions[0].open);
}

#[test]
fn test_close_twice_is_invalid() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.add_response(b"OK\r\n");
    adapter.close(link_id).unwrap();

    let error = adapter.close(link_id).unwrap_err();
    assert_eq!(Error::Invalid, error);
    assert_eq!(Some(Error::Invalid), adapter.last_error());
}

#[test]
fn test_close_remotely_closed_skips_command() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.queue(b"0,CLOSED\r\n");
    adapter.receive();

    adapter.serial.clear_written();
    adapter.close(link_id).unwrap();

    assert!(adapter.serial.written().is_empty());
    assert!(!adapter.sessions[0].open);
}

#[test]
fn test_close_failure_still_releases_slot() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    let link_id = adapter.tcp_connect("h", 80, ignore_data).unwrap();

    adapter.serial.add_response(b"ERROR\r\n");
    let error = adapter.close(link_id).unwrap_err();
    assert_eq!(Error::Fail, error);

    // The slot is not leaked
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    assert_eq!(0, adapter.tcp_connect("h", 80, ignore_data).unwrap());
}

#[test]
fn test_listen_accept_and_receive() {
    static EVENTS: Mutex<Vec<(usize, SocketEvent)>> = Mutex::new(Vec::new());
    fn on_data(link_id: usize, event: SocketEvent) {
        EVENTS.lock().unwrap().push((link_id, event));
    }
    static ACCEPTED: Mutex<Vec<AcceptEvent>> = Mutex::new(Vec::new());
    fn on_accept(event: AcceptEvent) {
        ACCEPTED.lock().unwrap().push(event);
    }

    let mut adapter = adapter();
    adapter.serial.add_response(b"OK\r\n");
    adapter.listen(8080, on_accept).unwrap();
    assert_eq!("AT+CIPSERVER=1,8080\r\n".to_string(), adapter.serial.written_string());

    adapter.serial.queue(b"1,CONNECT\r\n");
    adapter.receive();
    assert_eq!(vec![AcceptEvent::Connection(1)], *ACCEPTED.lock().unwrap());
    assert!(adapter.sessions[1].open);
    assert!(adapter.sessions[1].connected);

    adapter.accept(1, on_data).unwrap();
    adapter.serial.queue(b"+IPD,1,2:hi");
    adapter.receive();
    assert_eq!(
        vec![(1, SocketEvent::Data(b'h')), (1, SocketEvent::Data(b'i'))],
        *EVENTS.lock().unwrap()
    );
}

#[test]
fn test_unlisten_uninstalls_accept_handler() {
    static ACCEPTED: Mutex<Vec<AcceptEvent>> = Mutex::new(Vec::new());
    fn on_accept(event: AcceptEvent) {
        ACCEPTED.lock().unwrap().push(event);
    }

    let mut adapter = adapter();
    adapter.serial.add_response(b"OK\r\n");
    adapter.listen(8080, on_accept).unwrap();

    adapter.serial.add_response(b"OK\r\n");
    adapter.unlisten().unwrap();

    // Connections are still tracked, but nobody is notified
    adapter.serial.queue(b"2,CONNECT\r\n");
    adapter.receive();
    assert!(ACCEPTED.lock().unwrap().is_empty());
    assert!(adapter.sessions[2].open);
}

#[test]
fn test_accept_invalid_slot() {
    let mut adapter = adapter();
    assert_eq!(Error::Invalid, adapter.accept(9, ignore_data).unwrap_err());
}

#[test]
fn test_close_all_force_releases_slots() {
    let mut adapter = adapter();
    adapter.serial.add_response(b"0,CONNECT\r\nOK\r\n");
    adapter.serial.add_response(b"1,CONNECT\r\nOK\r\n");
    adapter.tcp_connect("h", 80, ignore_data).unwrap();
    adapter.tcp_connect("h", 81, ignore_data).unwrap();

    adapter.serial.add_response(b"OK\r\n");
    adapter.serial.add_response(b"OK\r\n");
    adapter.close_all();

    for session in &adapter.sessions {
        assert!(!session.open);
    }
}
