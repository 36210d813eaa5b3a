use std::net::Ipv4Addr;

/// Inclusive range of IPv4 addresses, walked in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Every address of the subnet `addr/mask`: `[addr & mask, (addr & mask) | !mask]`.
    pub fn from_subnet(addr: Ipv4Addr, mask: Ipv4Addr) -> Self {
        let mask: u32 = mask.into();
        let base: u32 = u32::from(addr) & mask;
        Self::new(Ipv4Addr::from(base), Ipv4Addr::from(base | !mask))
    }

    /// Number of addresses in the range; zero when `end < start`.
    pub fn len(&self) -> u64 {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            0
        } else {
            u64::from(end - start) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_subnet_covers_network_through_broadcast() {
        let range = Ipv4Range::from_subnet(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(range.start_addr, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(range.end_addr, Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(range.len(), 256);
    }

    #[test]
    fn to_iter_is_ascending() {
        let range = Ipv4Range::from_subnet(Ipv4Addr::new(192, 168, 7, 9), Ipv4Addr::new(255, 255, 255, 252));
        let ips: Vec<Ipv4Addr> = range.to_iter().collect();
        assert_eq!(
            ips,
            vec![
                Ipv4Addr::new(192, 168, 7, 8),
                Ipv4Addr::new(192, 168, 7, 9),
                Ipv4Addr::new(192, 168, 7, 10),
                Ipv4Addr::new(192, 168, 7, 11),
            ]
        );
    }

    #[test]
    fn host_mask_yields_single_address() {
        let ip = Ipv4Addr::new(172, 16, 4, 1);
        let range = Ipv4Range::from_subnet(ip, Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(range.len(), 1);
        assert_eq!(range.to_iter().next(), Some(ip));
    }

    #[test]
    fn inverted_range_is_empty() {
        let range = Ipv4Range::new(Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 1));
        assert!(range.is_empty());
    }
}
