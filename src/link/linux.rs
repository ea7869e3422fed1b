//! Linux `AF_PACKET` raw socket backend.
//!
//! Grounded on the teacher's `std/unix/raw_socket.rs`: a `SOCK_RAW` socket over `AF_PACKET`,
//! bound to an interface index via `SIOCGIFINDEX` + `bind(2)` on a `sockaddr_ll`. MAC/Ethertype
//! filtering happens in user space in [`super::Link::recv_frame`] rather than in the kernel, so
//! this backend receives every frame on the wire (`ETH_P_ALL`) and lets the caller discard the
//! rest.

use super::LinkBackend;
use crate::fmt;
use std::{io, mem, os::unix::io::RawFd};

#[repr(C)]
struct Ifreq {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    ifr_ifindex: libc::c_int,
}

fn ifreq_for(name: &str) -> Ifreq {
    let mut ifreq = Ifreq {
        ifr_name: [0; libc::IF_NAMESIZE],
        ifr_ifindex: 0,
    };
    for (dst, byte) in ifreq.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *byte as libc::c_char;
    }
    ifreq
}

/// Target size, in bytes, the driver asks the kernel to grow the socket's send/receive buffers
/// to. The device can burst faster than the application drains its socket buffer between calls.
const SOCKBUF_BYTES: libc::c_int = 64 * 1024 * 1024;

pub struct RawSocket {
    fd: libc::c_int,
}

impl RawSocket {
    fn set_bufsize(fd: libc::c_int, force_opt: libc::c_int, get_opt: libc::c_int, label: &str) {
        let mut size = SOCKBUF_BYTES;

        // SO_*BUFFORCE bypasses the usual root-only doubling rule so the driver can request the
        // full size it wants even when it only holds CAP_NET_ADMIN, not CAP_SYS_ADMIN.
        let set_res = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                force_opt,
                &size as *const _ as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };

        if set_res < 0 {
            fmt::warn!(
                "failed to force {} socket buffer size, falling back to default",
                label
            );
            return;
        }

        let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
        unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                get_opt,
                &mut size as *mut _ as *mut libc::c_void,
                &mut len,
            );
        }

        fmt::debug!("{} socket buffer set to {} bytes", label, size);
    }
}

impl LinkBackend for RawSocket {
    fn open(iface: &str) -> io::Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut ifreq = ifreq_for(iface);
        if unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifreq) } == -1 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifreq.ifr_ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };

        let bind_res = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if bind_res == -1 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Self::set_bufsize(fd, libc::SO_RCVBUFFORCE, libc::SO_RCVBUF, "rx");
        Self::set_bufsize(fd, libc::SO_SNDBUFFORCE, libc::SO_SNDBUF, "tx");

        fmt::debug!("opened raw socket on {}", iface);

        Ok(Self { fd })
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::send(
                self.fd,
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if n == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::recv(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }
}

impl std::os::unix::io::AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
