//! Address admission checks applied to every captured observation.
//!
//! All predicates operate on the 32-bit value of an address. They are pure
//! and may be called from any thread.

use std::net::Ipv4Addr;

use crate::network::interface::InterfaceBinding;

/// What to do with non-self traffic captured on an interface that has no
/// bound IPv4 address (and therefore no subnet to compare against).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnaddressedPolicy {
    /// Treat everything as out-of-subnet and drop it.
    #[default]
    Discard,
    /// Accept every source address.
    Admit,
    /// Accept private and link-local sources only, drop WAN addresses.
    AdmitPrivate,
}

/// Outcome of running an observation through the filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The packet was sent by the capturing interface itself.
    SelfTraffic,
    /// The source lies outside the capturing interface's subnet.
    ForeignSubnet,
    Accepted,
}

/// True iff `candidate` is the interface's own bound address.
///
/// An interface without an IPv4 address never filters anything as self.
pub fn is_self(iface_addr: Option<Ipv4Addr>, candidate: Ipv4Addr) -> bool {
    match iface_addr {
        Some(addr) => u32::from(addr) == u32::from(candidate),
        None => false,
    }
}

/// True iff `(candidate & mask) == (iface_addr & mask)`.
///
/// Returns `false` when the interface lacks an address or a mask; callers
/// that want a different answer for unaddressed interfaces go through
/// [`admit`] with a non-default [`UnaddressedPolicy`].
pub fn in_subnet(iface_addr: Option<Ipv4Addr>, iface_mask: Option<Ipv4Addr>, candidate: Ipv4Addr) -> bool {
    match (iface_addr, iface_mask) {
        (Some(addr), Some(mask)) => {
            let mask: u32 = mask.into();
            (u32::from(candidate) & mask) == (u32::from(addr) & mask)
        }
        _ => false,
    }
}

/// Number of contiguous 1 bits at the top of `mask`, i.e. its CIDR prefix.
pub fn leading_one_bits(mask: Ipv4Addr) -> u8 {
    let value: u32 = mask.into();
    let mut count: u8 = 0;
    for bit in (0..32).rev() {
        if value & (1u32 << bit) == 0 {
            break;
        }
        count += 1;
    }
    count
}

/// Runs the self filter, then the subnet filter, for one observation.
pub fn admit(binding: &InterfaceBinding, candidate: Ipv4Addr, policy: UnaddressedPolicy) -> Admission {
    if is_self(binding.ipv4, candidate) {
        return Admission::SelfTraffic;
    }

    let in_range = match (binding.ipv4, binding.netmask, policy) {
        (Some(_), Some(_), _) => in_subnet(binding.ipv4, binding.netmask, candidate),
        (_, _, UnaddressedPolicy::Discard) => false,
        (_, _, UnaddressedPolicy::Admit) => true,
        (_, _, UnaddressedPolicy::AdmitPrivate) => {
            candidate.is_private() || candidate.is_link_local()
        }
    };

    if in_range {
        Admission::Accepted
    } else {
        Admission::ForeignSubnet
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(addr: [u8; 4], mask: [u8; 4]) -> InterfaceBinding {
        InterfaceBinding {
            name: "eth0".to_string(),
            description: "test".to_string(),
            mac: None,
            ipv4: Some(Ipv4Addr::from(addr)),
            netmask: Some(Ipv4Addr::from(mask)),
        }
    }

    fn unbound() -> InterfaceBinding {
        InterfaceBinding {
            name: "wan0".to_string(),
            description: "test".to_string(),
            mac: None,
            ipv4: None,
            netmask: None,
        }
    }

    #[test]
    fn leading_one_bits_counts_prefix() {
        assert_eq!(leading_one_bits(Ipv4Addr::new(255, 255, 255, 0)), 24);
        assert_eq!(leading_one_bits(Ipv4Addr::new(255, 255, 0, 0)), 16);
        assert_eq!(leading_one_bits(Ipv4Addr::new(0, 0, 0, 0)), 0);
        assert_eq!(leading_one_bits(Ipv4Addr::new(255, 255, 255, 255)), 32);
        assert_eq!(leading_one_bits(Ipv4Addr::new(255, 255, 255, 128)), 25);
    }

    #[test]
    fn leading_one_bits_stops_at_first_zero() {
        assert_eq!(leading_one_bits(Ipv4Addr::new(255, 0, 255, 0)), 8);
    }

    #[test]
    fn in_subnet_matches_same_network() {
        let addr = Some(Ipv4Addr::new(192, 168, 1, 10));
        let mask = Some(Ipv4Addr::new(255, 255, 255, 0));
        assert!(in_subnet(addr, mask, Ipv4Addr::new(192, 168, 1, 55)));
        assert!(!in_subnet(addr, mask, Ipv4Addr::new(192, 168, 2, 55)));
    }

    #[test]
    fn in_subnet_is_false_without_address_or_mask() {
        let candidate = Ipv4Addr::new(192, 168, 1, 55);
        assert!(!in_subnet(None, Some(Ipv4Addr::new(255, 255, 255, 0)), candidate));
        assert!(!in_subnet(Some(Ipv4Addr::new(192, 168, 1, 10)), None, candidate));
    }

    #[test]
    fn is_self_requires_bound_address() {
        let candidate = Ipv4Addr::new(10, 0, 0, 5);
        assert!(is_self(Some(candidate), candidate));
        assert!(!is_self(Some(Ipv4Addr::new(10, 0, 0, 6)), candidate));
        assert!(!is_self(None, candidate));
    }

    #[test]
    fn admit_discards_self_before_subnet_check() {
        let binding = bound([10, 0, 0, 5], [255, 255, 255, 0]);
        let policy = UnaddressedPolicy::Discard;
        assert_eq!(admit(&binding, Ipv4Addr::new(10, 0, 0, 5), policy), Admission::SelfTraffic);
        assert_eq!(admit(&binding, Ipv4Addr::new(10, 0, 0, 42), policy), Admission::Accepted);
        assert_eq!(admit(&binding, Ipv4Addr::new(172, 16, 0, 9), policy), Admission::ForeignSubnet);
    }

    #[test]
    fn admit_applies_unaddressed_policy() {
        let binding = unbound();
        let lan = Ipv4Addr::new(192, 168, 0, 20);
        let wan = Ipv4Addr::new(8, 8, 8, 8);

        assert_eq!(admit(&binding, lan, UnaddressedPolicy::Discard), Admission::ForeignSubnet);
        assert_eq!(admit(&binding, wan, UnaddressedPolicy::Admit), Admission::Accepted);
        assert_eq!(admit(&binding, lan, UnaddressedPolicy::AdmitPrivate), Admission::Accepted);
        assert_eq!(admit(&binding, wan, UnaddressedPolicy::AdmitPrivate), Admission::ForeignSubnet);
    }

    #[test]
    fn admit_ignores_policy_when_interface_is_addressed() {
        let binding = bound([192, 168, 1, 10], [255, 255, 255, 0]);
        let outside = Ipv4Addr::new(192, 168, 9, 1);
        assert_eq!(admit(&binding, outside, UnaddressedPolicy::Admit), Admission::ForeignSubnet);
    }
}
