use std::ffi::CString;
use std::io::{self, ErrorKind};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::mac::{MacAddr, MAC_ADDR_LEN};
use crate::traits::{units_to_duration, FrameTransport, RecvOutcome, DEFAULT_TICK};

/// EtherType carried by every ethlink frame.
pub const ETH_TYPE: u16 = 0x6000;

/// Destination MAC + source MAC + EtherType.
pub const HEADER_LEN: usize = 2 * MAC_ADDR_LEN + 2;

/// Largest Ethernet payload.
pub const MAX_ETH_PAYLOAD: usize = 1500;

/// Frame link over a Linux `AF_PACKET` raw socket.
///
/// The kernel strips the preamble and discards frames with a bad FCS, so
/// receives on this link never report [`RecvOutcome::ChecksumInvalid`].
/// Opening the socket requires `CAP_NET_RAW`.
pub struct RawEthernetLink {
    fd: OwnedFd,
    interface: String,
    src: MacAddr,
    dst: MacAddr,
    tick: Duration,
    tx_buf: BytesMut,
    rx_buf: Vec<u8>,
}

impl RawEthernetLink {
    /// Open a raw socket on `interface`, sending as `src` to `dst`.
    pub fn open(interface: &str, src: MacAddr, dst: MacAddr) -> Result<Self> {
        let iface_err = |source: io::Error| TransportError::Interface {
            name: interface.to_string(),
            source,
        };

        let name = CString::new(interface).map_err(|_| {
            iface_err(io::Error::new(
                ErrorKind::InvalidInput,
                "interface name contains NUL",
            ))
        })?;

        // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
        let ifindex = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if ifindex == 0 {
            return Err(iface_err(io::Error::last_os_error()));
        }

        // SAFETY: plain socket(2) call; the returned descriptor is checked below.
        let raw = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                i32::from(ETH_TYPE.to_be()),
            )
        };
        if raw < 0 {
            return Err(iface_err(io::Error::last_os_error()));
        }
        // SAFETY: `raw` is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: sockaddr_ll is plain old data; all-zero is a valid initial value.
        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.sll_protocol = ETH_TYPE.to_be();
        addr.sll_ifindex = ifindex as libc::c_int;

        // SAFETY: `addr` is a valid sockaddr_ll and the length matches its size.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                (&addr as *const libc::sockaddr_ll).cast::<libc::sockaddr>(),
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(iface_err(io::Error::last_os_error()));
        }

        info!(interface, %src, %dst, "raw ethernet link opened");

        Ok(Self {
            fd,
            interface: interface.to_string(),
            src,
            dst,
            tick: DEFAULT_TICK,
            tx_buf: BytesMut::with_capacity(HEADER_LEN + MAX_ETH_PAYLOAD),
            rx_buf: vec![0u8; HEADER_LEN + MAX_ETH_PAYLOAD],
        })
    }

    /// Override the wall-clock length of one timeout unit.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        let tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        // SAFETY: `tv` is a valid timeval and the length matches its size.
        let rc = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                (&tv as *const libc::timeval).cast::<libc::c_void>(),
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Write the Ethernet header for a frame from `src` to `dst`.
pub fn write_header(dst: MacAddr, src: MacAddr, out: &mut BytesMut) {
    out.put_slice(&dst.octets());
    out.put_slice(&src.octets());
    out.put_u16(ETH_TYPE);
}

/// Split a received frame into its source MAC, EtherType and payload.
pub fn parse_header(frame: &[u8]) -> Option<(MacAddr, u16, &[u8])> {
    if frame.len() < HEADER_LEN {
        return None;
    }
    let mut src = [0u8; MAC_ADDR_LEN];
    src.copy_from_slice(&frame[MAC_ADDR_LEN..2 * MAC_ADDR_LEN]);
    let eth_type = u16::from_be_bytes([frame[2 * MAC_ADDR_LEN], frame[2 * MAC_ADDR_LEN + 1]]);
    Some((MacAddr(src), eth_type, &frame[HEADER_LEN..]))
}

impl FrameTransport for RawEthernetLink {
    fn max_payload(&self) -> usize {
        MAX_ETH_PAYLOAD
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > MAX_ETH_PAYLOAD {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: MAX_ETH_PAYLOAD,
            });
        }

        self.tx_buf.clear();
        write_header(self.dst, self.src, &mut self.tx_buf);
        self.tx_buf.put_slice(frame);

        loop {
            // SAFETY: `tx_buf` is valid for `tx_buf.len()` bytes for the duration of the call.
            let rc = unsafe {
                libc::send(
                    self.fd.as_raw_fd(),
                    self.tx_buf.as_ptr().cast::<libc::c_void>(),
                    self.tx_buf.len(),
                    0,
                )
            };
            if rc >= 0 {
                trace!(len = frame.len(), "raw frame sent");
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(TransportError::Io(err));
            }
        }
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        let deadline = Instant::now() + units_to_duration(self.tick, timeout_units);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // A zero timeval would block forever.
            if remaining < Duration::from_micros(1) {
                return Ok(RecvOutcome::TimedOut);
            }
            self.set_read_timeout(remaining)?;

            // SAFETY: `rx_buf` is valid for writes of `rx_buf.len()` bytes.
            let rc = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    self.rx_buf.as_mut_ptr().cast::<libc::c_void>(),
                    self.rx_buf.len(),
                    0,
                )
            };
            if rc < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    ErrorKind::Interrupted => continue,
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                        return Ok(RecvOutcome::TimedOut)
                    }
                    _ => return Err(TransportError::Io(err)),
                }
            }

            let n = rc as usize;
            let Some((src, eth_type, payload)) = parse_header(&self.rx_buf[..n]) else {
                continue;
            };
            if eth_type != ETH_TYPE || src != self.dst {
                debug!(%src, eth_type, "ignoring foreign frame");
                continue;
            }

            let copied = payload.len().min(buf.len());
            buf[..copied].copy_from_slice(&payload[..copied]);
            return Ok(RecvOutcome::Received { len: payload.len() });
        }
    }
}

impl std::fmt::Debug for RawEthernetLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEthernetLink")
            .field("interface", &self.interface)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}
