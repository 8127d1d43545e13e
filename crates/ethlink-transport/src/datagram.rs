use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::fcs::{self, FCS_LEN};
use crate::traits::{units_to_duration, FrameTransport, RecvOutcome, DEFAULT_TICK};

/// Maximum payload of a datagram link, matching an Ethernet payload.
pub const DEFAULT_DATAGRAM_MAX_PAYLOAD: usize = 1500;

/// Frame link over Unix datagram sockets.
///
/// Each frame is one datagram holding the payload and a trailing CRC-32
/// frame check sequence, so corruption on the way is reported as
/// [`RecvOutcome::ChecksumInvalid`]. Used to run both peers on one host.
pub struct DatagramLink {
    socket: UnixDatagram,
    target: Target,
    bound: Option<BoundPath>,
    tick: Duration,
    max_payload: usize,
    tx_buf: BytesMut,
    rx_buf: Vec<u8>,
}

enum Target {
    Connected,
    Path(PathBuf),
}

struct BoundPath {
    path: PathBuf,
    inode: (u64, u64),
}

impl DatagramLink {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind to `local` and address frames to the socket at `peer`.
    ///
    /// The peer does not need to exist yet; frames sent before it binds are
    /// dropped, like frames on a link with nobody listening.
    pub fn bind(local: impl AsRef<Path>, peer: impl AsRef<Path>) -> Result<Self> {
        let path = local.as_ref().to_path_buf();
        let peer = peer.as_ref().to_path_buf();

        for candidate in [&path, &peer] {
            let len = candidate.as_os_str().len();
            if len >= Self::MAX_PATH_LEN {
                return Err(TransportError::PathTooLong {
                    path: candidate.clone(),
                    len,
                    max: Self::MAX_PATH_LEN,
                });
            }
        }

        // Remove stale socket if it exists, but never remove non-socket files.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if !metadata.file_type().is_socket() {
                return Err(TransportError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
        }

        let socket = UnixDatagram::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;

        info!(local = ?path, peer = ?peer, "datagram link bound");

        Ok(Self::from_parts(
            socket,
            Target::Path(peer),
            Some(BoundPath {
                path,
                inode: (metadata.dev(), metadata.ino()),
            }),
        ))
    }

    /// Create a connected pair of unnamed link ends.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixDatagram::pair()?;
        Ok((
            Self::from_parts(left, Target::Connected, None),
            Self::from_parts(right, Target::Connected, None),
        ))
    }

    fn from_parts(socket: UnixDatagram, target: Target, bound: Option<BoundPath>) -> Self {
        Self {
            socket,
            target,
            bound,
            tick: DEFAULT_TICK,
            max_payload: DEFAULT_DATAGRAM_MAX_PAYLOAD,
            tx_buf: BytesMut::with_capacity(DEFAULT_DATAGRAM_MAX_PAYLOAD + FCS_LEN),
            rx_buf: vec![0u8; DEFAULT_DATAGRAM_MAX_PAYLOAD + FCS_LEN],
        }
    }

    /// Override the wall-clock length of one timeout unit.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// The path this link is bound to, if any.
    pub fn local_path(&self) -> Option<&Path> {
        self.bound.as_ref().map(|b| b.path.as_path())
    }
}

impl FrameTransport for DatagramLink {
    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > self.max_payload {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: self.max_payload,
            });
        }

        self.tx_buf.clear();
        fcs::seal(frame, &mut self.tx_buf);

        let sent = match &self.target {
            Target::Connected => self.socket.send(&self.tx_buf),
            Target::Path(peer) => self.socket.send_to(&self.tx_buf, peer),
        };
        match sent {
            Ok(_) => Ok(()),
            // Nobody is listening yet: the frame is lost, as it would be on the wire.
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::ConnectionRefused
                ) =>
            {
                debug!(error = %err, "peer not reachable; frame dropped");
                Ok(())
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        self.socket
            .set_read_timeout(Some(units_to_duration(self.tick, timeout_units)))?;

        let n = loop {
            match self.socket.recv(&mut self.rx_buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(RecvOutcome::TimedOut);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        };

        match fcs::open(&self.rx_buf[..n]) {
            Some(payload) => {
                let copied = payload.len().min(buf.len());
                buf[..copied].copy_from_slice(&payload[..copied]);
                Ok(RecvOutcome::Received { len: payload.len() })
            }
            None => {
                warn!(len = n, "bad frame checksum");
                Ok(RecvOutcome::ChecksumInvalid)
            }
        }
    }
}

impl Drop for DatagramLink {
    fn drop(&mut self) {
        if let Some(bound) = &self.bound {
            if let Ok(metadata) = std::fs::symlink_metadata(&bound.path) {
                if metadata.file_type().is_socket()
                    && (metadata.dev(), metadata.ino()) == bound.inode
                {
                    debug!(path = ?bound.path, "cleaning up socket file");
                    let _ = std::fs::remove_file(&bound.path);
                } else {
                    debug!(
                        path = ?bound.path,
                        "socket path identity changed; skipping cleanup"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for DatagramLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramLink")
            .field("local", &self.local_path())
            .field("tick", &self.tick)
            .field("max_payload", &self.max_payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ethlink-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn pair_roundtrip() {
        let (mut left, mut right) = DatagramLink::pair().unwrap();
        left.transmit(b"frame").unwrap();

        let mut buf = [0u8; 5];
        let outcome = right.attempt_receive(&mut buf, 100).unwrap();
        assert_eq!(outcome, RecvOutcome::Received { len: 5 });
        assert_eq!(&buf, b"frame");
    }

    #[test]
    fn pair_times_out() {
        let (_left, mut right) = DatagramLink::pair().unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(
            right.attempt_receive(&mut buf, 5).unwrap(),
            RecvOutcome::TimedOut
        );
    }

    #[test]
    fn corrupted_datagram_reports_bad_checksum() {
        let (raw_left, raw_right) = UnixDatagram::pair().unwrap();
        let mut right = DatagramLink::from_parts(raw_right, Target::Connected, None);

        let mut sealed = BytesMut::new();
        fcs::seal(b"payload", &mut sealed);
        sealed[0] ^= 0xFF;
        raw_left.send(&sealed).unwrap();

        let mut buf = [0u8; 7];
        assert_eq!(
            right.attempt_receive(&mut buf, 100).unwrap(),
            RecvOutcome::ChecksumInvalid
        );
    }

    #[test]
    fn bound_links_exchange_frames() {
        let dir = temp_dir("bound");
        let a_path = dir.join("a.sock");
        let b_path = dir.join("b.sock");

        let mut a = DatagramLink::bind(&a_path, &b_path).unwrap();
        let mut b = DatagramLink::bind(&b_path, &a_path).unwrap();

        a.transmit(b"ping").unwrap();
        let mut buf = [0u8; 4];
        assert!(b.attempt_receive(&mut buf, 200).unwrap().is_received());
        assert_eq!(&buf, b"ping");

        b.transmit(b"pong").unwrap();
        assert!(a.attempt_receive(&mut buf, 200).unwrap().is_received());
        assert_eq!(&buf, b"pong");

        drop(a);
        drop(b);
        assert!(!a_path.exists(), "socket file should be cleaned up on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn transmit_without_peer_is_dropped() {
        let dir = temp_dir("nopeer");
        let mut a = DatagramLink::bind(dir.join("a.sock"), dir.join("missing.sock")).unwrap();
        assert!(a.transmit(b"lost").is_ok());
        drop(a);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn oversized_frame_rejected() {
        let (mut left, _right) = DatagramLink::pair().unwrap();
        let left_max = left.max_payload();
        assert!(matches!(
            left.transmit(&vec![0u8; left_max + 1]),
            Err(TransportError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = DatagramLink::bind(&long_path, "/tmp/peer.sock");
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("bind-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = DatagramLink::bind(&sock_path, dir.join("peer.sock"));
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
