use std::net::Ipv4Addr;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to list interface addresses: {0}")]
    Interfaces(#[source] std::io::Error),
    #[error("no non-loopback ipv4 address found")]
    NotFound,
}

/// Source of the `instance` grouping key.
pub trait Resolver: Send + Sync {
    fn resolve(&self) -> Result<Ipv4Addr, ResolveError>;
}

/// A fixed, configured address.
pub struct Static(pub Ipv4Addr);

impl Resolver for Static {
    fn resolve(&self) -> Result<Ipv4Addr, ResolveError> {
        Ok(self.0)
    }
}

/// The first non-loopback IPv4 address of the host, looked up on every
/// call so address changes are picked up.
pub struct LocalIpv4;

impl Resolver for LocalIpv4 {
    fn resolve(&self) -> Result<Ipv4Addr, ResolveError> {
        let addresses = Interfaces::new().map_err(ResolveError::Interfaces)?.ipv4();
        first_non_loopback(addresses)
    }
}

fn first_non_loopback(
    addresses: impl IntoIterator<Item = Ipv4Addr>,
) -> Result<Ipv4Addr, ResolveError> {
    addresses
        .into_iter()
        .find(|address| !address.is_loopback())
        .ok_or(ResolveError::NotFound)
}

// owns the list returned by getifaddrs
struct Interfaces {
    head: *mut libc::ifaddrs,
}

impl Interfaces {
    fn new() -> std::io::Result<Self> {
        let mut head = std::ptr::null_mut();

        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(std::io::Error::last_os_error());
        }

        Ok(Self { head })
    }

    /// IPv4 addresses in the order the kernel lists their interfaces.
    fn ipv4(&self) -> Vec<Ipv4Addr> {
        let mut addresses = Vec::new();
        let mut cursor = self.head;

        while !cursor.is_null() {
            // the list and every node in it stay valid until freeifaddrs
            let ifaddr = unsafe { &*cursor };

            if !ifaddr.ifa_addr.is_null()
                && unsafe { (*ifaddr.ifa_addr).sa_family } as libc::c_int == libc::AF_INET
            {
                // AF_INET entries always carry a sockaddr_in
                let sin = unsafe { &*(ifaddr.ifa_addr as *const libc::sockaddr_in) };
                addresses.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
            }

            cursor = ifaddr.ifa_next;
        }

        addresses
    }
}

impl Drop for Interfaces {
    fn drop(&mut self) {
        unsafe {
            libc::freeifaddrs(self.head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_loopback() {
        let addresses = [
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(127, 0, 1, 1),
            Ipv4Addr::new(10, 0, 0, 7),
            Ipv4Addr::new(192, 168, 1, 2),
        ];

        assert_eq!(
            first_non_loopback(addresses).unwrap(),
            Ipv4Addr::new(10, 0, 0, 7)
        );
    }

    #[test]
    fn only_loopback() {
        assert!(matches!(
            first_non_loopback([Ipv4Addr::LOCALHOST]),
            Err(ResolveError::NotFound)
        ));
        assert!(matches!(
            first_non_loopback(Vec::new()),
            Err(ResolveError::NotFound)
        ));
    }

    #[test]
    fn static_address() {
        let address = Ipv4Addr::new(172, 16, 0, 1);
        assert_eq!(Static(address).resolve().unwrap(), address);
    }

    #[test]
    fn resolves_from_local_interfaces() {
        let addresses = Interfaces::new().unwrap().ipv4();

        match LocalIpv4.resolve() {
            Ok(address) => {
                assert!(!address.is_loopback());
                assert!(addresses.contains(&address));
            }
            Err(e) => {
                assert!(matches!(e, ResolveError::NotFound));
                assert!(addresses.iter().all(|a| a.is_loopback()));
            }
        }
    }
}
