//! DNS 劫持：所有查询都解析到设备自己的 AP 地址

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

/// Largest datagram handled; anything bigger is dropped.
pub const DNS_PACKET_CAPACITY: usize = 512;

const HEADER_LEN: usize = 12;
/// Distance from the question name terminator to the start of the answer record.
const ANSWER_OFFSET: usize = 12;
/// Distance from the answer record start to its address field.
const ADDRESS_OFFSET: usize = 10;

/// Rewrites the query in `buf[..len]` in place into an answer pointing at
/// `ap_ip` and returns the number of bytes to send back.
///
/// Returns `None` for packets that must be dropped: empty, larger than
/// [`DNS_PACKET_CAPACITY`], shorter than a header, or without a terminated
/// question name.
pub fn hijack_query(buf: &mut [u8], len: usize, ap_ip: Ipv4Addr) -> Option<usize> {
    if len < HEADER_LEN || len > DNS_PACKET_CAPACITY || len > buf.len() {
        return None;
    }

    let name_end = HEADER_LEN + buf[HEADER_LEN..len].iter().position(|&b| b == 0)?;

    // QR=1, RD/RA set, RCODE=0
    buf[2] = 0x81;
    buf[3] = 0x80;
    // ANCOUNT=1
    buf[6] = 0x00;
    buf[7] = 0x01;

    if let Some(offset) = answer_address_offset(name_end).filter(|at| at + 4 <= buf.len()) {
        buf[offset..offset + 4].copy_from_slice(&ap_ip.octets());
    }

    Some(len)
}

/// Where the answer address goes for a question name ending at `name_end`, if
/// it still fits the buffer.
pub fn answer_address_offset(name_end: usize) -> Option<usize> {
    let answer = name_end + ANSWER_OFFSET;
    (answer + ADDRESS_OFFSET + 4 <= DNS_PACKET_CAPACITY).then_some(answer + ADDRESS_OFFSET)
}

pub struct DnsResponder {
    socket: UdpSocket,
    ap_ip: Ipv4Addr,
    /// One byte of headroom so oversized datagrams show up as such instead of
    /// being silently truncated to the capacity.
    buf: [u8; DNS_PACKET_CAPACITY + 1],
}

impl DnsResponder {
    pub async fn bind(addr: SocketAddr, ap_ip: Ipv4Addr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        log::info!("DNS server listening on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            ap_ip,
            buf: [0; DNS_PACKET_CAPACITY + 1],
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answers at most one pending query without waiting. Returns whether a
    /// datagram was consumed.
    pub fn serve_pending(&mut self) -> bool {
        let (len, peer) = match self.socket.try_recv_from(&mut self.buf) {
            Ok(received) => received,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return false,
            Err(e) => {
                log::warn!("DNS recv error: {:?}", e);
                return false;
            }
        };

        if len > DNS_PACKET_CAPACITY {
            log::debug!("Dropping oversized DNS query from {}", peer);
            return true;
        }

        let Some(reply_len) = hijack_query(&mut self.buf, len, self.ap_ip) else {
            log::debug!("Dropping malformed DNS query from {} ({} bytes)", peer, len);
            return true;
        };

        match self.socket.try_send_to(&self.buf[..reply_len], peer) {
            Ok(_) => log::debug!("DNS {} -> {}", peer, self.ap_ip),
            Err(e) => log::warn!("DNS send error: {:?}", e),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

    /// A standard A query for `name` with transaction id 0xbeef.
    fn query_for(name: &str) -> Vec<u8> {
        let mut packet = vec![0xbe, 0xef, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        for label in name.split('.') {
            packet.push(label.len() as u8);
            packet.extend_from_slice(label.as_bytes());
        }
        packet.push(0);
        packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        packet
    }

    fn load(packet: &[u8]) -> [u8; DNS_PACKET_CAPACITY] {
        let mut buf = [0u8; DNS_PACKET_CAPACITY];
        buf[..packet.len()].copy_from_slice(packet);
        buf
    }

    #[test]
    fn test_hijack_header_and_address() {
        let query = query_for("connectivitycheck.gstatic.com");
        let mut buf = load(&query);

        let len = hijack_query(&mut buf, query.len(), AP).unwrap();
        assert_eq!(len, query.len());

        // transaction id and question count untouched
        assert_eq!(&buf[0..2], &[0xbe, 0xef]);
        assert_eq!(&buf[4..6], &[0x00, 0x01]);
        assert_eq!(&buf[2..4], &[0x81, 0x80]);
        assert_eq!(buf[7], 1);

        let name_end = 12 + query[12..].iter().position(|&b| b == 0).unwrap();
        let offset = answer_address_offset(name_end).unwrap();
        assert_eq!(offset, name_end + 22);
        assert_eq!(&buf[offset..offset + 4], &AP.octets());

        // the question itself is preserved
        assert_eq!(&buf[12..query.len()], &query[12..]);
    }

    #[test]
    fn test_drops_malformed_packets() {
        let mut buf = [0u8; DNS_PACKET_CAPACITY];
        assert_eq!(hijack_query(&mut buf, 0, AP), None);
        assert_eq!(hijack_query(&mut buf, 11, AP), None);
        assert_eq!(hijack_query(&mut buf, DNS_PACKET_CAPACITY + 1, AP), None);

        // question name never terminates
        let mut truncated = query_for("example.com");
        truncated.truncate(16);
        let mut buf = load(&truncated);
        assert_eq!(hijack_query(&mut buf, truncated.len(), AP), None);
        // dropped packets are left untouched
        assert_eq!(&buf[..truncated.len()], &truncated[..]);
    }

    #[test]
    fn test_address_skipped_near_buffer_end() {
        assert_eq!(answer_address_offset(100), Some(122));
        assert_eq!(answer_address_offset(486), Some(508));
        assert_eq!(answer_address_offset(487), None);

        // a question name ending late in a full packet still gets a header rewrite
        let mut buf = [b'a'; DNS_PACKET_CAPACITY];
        buf[495] = 0;
        let before = buf;
        assert_eq!(hijack_query(&mut buf, DNS_PACKET_CAPACITY, AP), Some(DNS_PACKET_CAPACITY));
        assert_eq!(buf[7], 1);
        assert_eq!(&buf[12..], &before[12..]);
    }

    #[tokio::test]
    async fn test_responder_answers_over_udp() {
        let mut responder = DnsResponder::bind("127.0.0.1:0".parse().unwrap(), AP)
            .await
            .unwrap();
        let server = responder.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let query = query_for("example.com");
        client.send_to(&query, server).await.unwrap();

        // wait until the datagram is readable, then serve it without blocking
        let mut served = false;
        for _ in 0..100 {
            if responder.serve_pending() {
                served = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(served);

        let mut reply = [0u8; DNS_PACKET_CAPACITY];
        let (len, from) = client.recv_from(&mut reply).await.unwrap();
        assert_eq!(from, server);
        assert_eq!(len, query.len());
        assert_eq!(reply[7], 1);
        assert_eq!(&reply[0..2], &[0xbe, 0xef]);
    }

    async fn serve_one(responder: &mut DnsResponder) {
        for _ in 0..100 {
            if responder.serve_pending() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("no datagram arrived");
    }

    #[tokio::test]
    async fn test_responder_drops_oversized_query() {
        let mut responder = DnsResponder::bind("127.0.0.1:0".parse().unwrap(), AP)
            .await
            .unwrap();
        let server = responder.local_addr().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // valid question followed by padding up to 700 bytes
        let mut oversized = query_for("example.com");
        oversized.resize(700, 0);
        client.send_to(&oversized, server).await.unwrap();
        serve_one(&mut responder).await;

        // a normal query sent afterwards is the first thing answered
        let query = query_for("example.org");
        client.send_to(&query, server).await.unwrap();
        serve_one(&mut responder).await;

        let mut reply = [0u8; 1024];
        let (len, _) = client.recv_from(&mut reply).await.unwrap();
        assert_eq!(len, query.len());
        assert_eq!(&reply[12..len], &query[12..]);
    }

    #[test]
    fn test_full_capacity_query_is_answered() {
        let mut buf = [b'a'; DNS_PACKET_CAPACITY + 1];
        buf[20] = 0;
        assert_eq!(
            hijack_query(&mut buf, DNS_PACKET_CAPACITY, AP),
            Some(DNS_PACKET_CAPACITY)
        );
        assert_eq!(hijack_query(&mut buf, DNS_PACKET_CAPACITY + 1, AP), None);
    }

    #[tokio::test]
    async fn test_nothing_pending() {
        let mut responder = DnsResponder::bind("127.0.0.1:0".parse().unwrap(), AP)
            .await
            .unwrap();
        assert!(!responder.serve_pending());
    }
}
