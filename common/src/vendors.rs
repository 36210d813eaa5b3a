use pnet::util::MacAddr;

/// Resolves device manufacturers from MAC addresses.
pub trait VendorRepository: Send + Sync {
    /// Registered manufacturer name, or `None` if the OUI is unknown.
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}

/// Repository that knows no vendors.
pub struct NoVendors;

impl VendorRepository for NoVendors {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        None
    }
}
