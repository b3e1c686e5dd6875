//! Socket-level liveness checks and keepalive tuning
//!
//! `std::net::TcpStream` exposes neither keepalive tunables nor
//! non-destructive reads, so this module talks to the socket through
//! `libc` directly.
//!
//! Two layers of failure detection:
//!
//! - **Kernel keepalive**: probes an idle connection on a fixed schedule
//!   so the transport itself declares a vanished peer dead (pulled cable,
//!   rebooted transponder). The failure surfaces as a pending socket
//!   error picked up by [`probe`].
//! - **Active probe** ([`probe`]): run periodically by the supervisor to
//!   notice broken pipes, queued errors and orderly closes without
//!   consuming stream data or blocking.

use std::io;
use std::net::TcpStream;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

/// TCP keepalive schedule applied to every upstream connection
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveParams {
    /// Idle seconds before the first probe
    pub idle_secs: u32,
    /// Seconds between probes
    pub interval_secs: u32,
    /// Unanswered probes before the kernel declares the peer dead
    pub probes: u32,
}

impl Default for KeepaliveParams {
    fn default() -> Self {
        Self {
            idle_secs: 10,
            interval_secs: 5,
            probes: 3,
        }
    }
}

/// Outcome of a liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Alive,
    /// Connection is unusable; the reason is for logging only
    Dead(&'static str),
}

/// Outcome of a bounded wait for readability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

#[cfg(target_os = "linux")]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: libc::c_int = 0;

fn setsockopt_int(fd: i32, level: i32, name: i32, value: i32) -> io::Result<()> {
    let rc = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const i32 as *const libc::c_void,
            std::mem::size_of::<i32>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Enable TCP keepalive with the given schedule.
///
/// The idle/interval/count tuning uses Linux socket options; other Unix
/// platforms get `SO_KEEPALIVE` with kernel-default timing.
pub fn configure_keepalive(stream: &TcpStream, params: &KeepaliveParams) -> io::Result<()> {
    let fd = stream.as_raw_fd();
    setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1)?;
    #[cfg(target_os = "linux")]
    {
        setsockopt_int(fd, libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, params.idle_secs as i32)?;
        setsockopt_int(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_KEEPINTVL,
            params.interval_secs as i32,
        )?;
        setsockopt_int(fd, libc::IPPROTO_TCP, libc::TCP_KEEPCNT, params.probes as i32)?;
    }
    #[cfg(not(target_os = "linux"))]
    let _ = params;
    Ok(())
}

/// Errno values that mean the connection is gone
fn errno_is_dead(errno: i32) -> bool {
    matches!(
        errno,
        libc::EPIPE | libc::ECONNRESET | libc::ENOTCONN | libc::ECONNABORTED | libc::ETIMEDOUT
    )
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Active liveness probe, in three steps:
///
/// 1. zero-length send — surfaces a broken pipe without transmitting data
/// 2. pending socket error — any error the kernel has queued (failed
///    keepalive probes land here)
/// 3. one-byte `MSG_PEEK` look-ahead — a zero-byte result is an orderly
///    close; would-block means alive with nothing buffered
///
/// Never consumes stream bytes and never blocks.
pub fn probe(stream: &TcpStream) -> Verdict {
    let fd = stream.as_raw_fd();

    let rc = unsafe { libc::send(fd, std::ptr::null(), 0, SEND_FLAGS) };
    if rc < 0 && errno_is_dead(last_errno()) {
        return Verdict::Dead("probe write failed");
    }

    let mut err: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut err as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == 0 && err != 0 {
        return Verdict::Dead("pending socket error");
    }

    let mut byte = 0u8;
    let rc = unsafe {
        libc::recv(
            fd,
            &mut byte as *mut u8 as *mut libc::c_void,
            1,
            libc::MSG_PEEK | libc::MSG_DONTWAIT,
        )
    };
    match rc {
        0 => Verdict::Dead("closed by peer"),
        n if n > 0 => Verdict::Alive,
        _ => match last_errno() {
            e if e == libc::EAGAIN || e == libc::EWOULDBLOCK || e == libc::EINTR => Verdict::Alive,
            _ => Verdict::Dead("peek failed"),
        },
    }
}

/// Wait up to `timeout` for the stream to become readable.
///
/// `EINTR` is reported as a timeout so the caller re-checks its shutdown
/// flag. Error/hangup poll flags without readable data are I/O errors;
/// an orderly close shows up as readable and is left for the read to
/// classify.
pub fn wait_readable(stream: &TcpStream, timeout: Duration) -> io::Result<Readiness> {
    let mut pfd = libc::pollfd {
        fd: stream.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        let e = io::Error::last_os_error();
        if e.raw_os_error() == Some(libc::EINTR) {
            return Ok(Readiness::TimedOut);
        }
        return Err(e);
    }
    if rc == 0 {
        return Ok(Readiness::TimedOut);
    }
    if pfd.revents & libc::POLLIN != 0 {
        return Ok(Readiness::Ready);
    }
    Err(io::Error::new(
        io::ErrorKind::Other,
        "socket error while waiting for data",
    ))
}
