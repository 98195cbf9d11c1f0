/// CPU vendor, as far as virtualization extensions are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuVendor {
    /// VT-x, served by `kvm_intel`.
    Intel,
    /// AMD-V, served by `kvm_amd`.
    Amd,
    #[default]
    Unknown,
}

impl CpuVendor {
    /// Classifies a raw `vendor_id` string. Only exact matches count.
    pub fn from_vendor_id(vendor_id: &str) -> Self {
        match vendor_id {
            "GenuineIntel" => CpuVendor::Intel,
            "AuthenticAMD" => CpuVendor::Amd,
            _ => CpuVendor::Unknown,
        }
    }

    /// Extracts the first `vendor_id` field from `/proc/cpuinfo` text.
    pub fn from_cpuinfo(cpuinfo: &str) -> Self {
        cpuinfo
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim() == "vendor_id")
            .map(|(_, value)| Self::from_vendor_id(value.trim()))
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            CpuVendor::Intel => "Intel",
            CpuVendor::Amd => "AMD",
            CpuVendor::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_exact_vendor_ids() {
        assert_eq!(CpuVendor::from_vendor_id("GenuineIntel"), CpuVendor::Intel);
        assert_eq!(CpuVendor::from_vendor_id("AuthenticAMD"), CpuVendor::Amd);
        assert_eq!(CpuVendor::from_vendor_id("HygonGenuine"), CpuVendor::Unknown);
        assert_eq!(CpuVendor::from_vendor_id("genuineintel"), CpuVendor::Unknown);
    }

    #[test]
    fn parse_cpuinfo_vendor_line() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: AuthenticAMD\ncpu family\t: 25\n\
                       processor\t: 1\nvendor_id\t: AuthenticAMD\n";
        assert_eq!(CpuVendor::from_cpuinfo(cpuinfo), CpuVendor::Amd);
    }

    #[test]
    fn cpuinfo_without_vendor_is_unknown() {
        let cpuinfo = "processor\t: 0\nBogoMIPS\t: 48.00\nCPU implementer\t: 0x41\n";
        assert_eq!(CpuVendor::from_cpuinfo(cpuinfo), CpuVendor::Unknown);
        assert_eq!(CpuVendor::from_cpuinfo(""), CpuVendor::Unknown);
    }
}
