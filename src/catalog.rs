// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Known Thunderbolt controllers.

use core::fmt::{self, Display, Formatter};

/// The silicon family of a Thunderbolt controller.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Family {
    /// The controller is not in the catalog.
    #[default]
    Unknown,
    /// Falcon Ridge.
    FalconRidge,
    /// Win Ridge.
    WinRidge,
    /// Alpine Ridge.
    AlpineRidge,
    /// Alpine Ridge C.
    AlpineRidgeC,
    /// Titan Ridge.
    TitanRidge,
    /// BB.
    Bb,
}

impl Family {
    fn as_str(self) -> &'static str {
        match self {
            Family::Unknown => "Unknown",
            Family::FalconRidge => "Falcon Ridge",
            Family::WinRidge => "Win Ridge",
            Family::AlpineRidge => "Alpine Ridge",
            Family::AlpineRidgeC => "Alpine Ridge C",
            Family::TitanRidge => "Titan Ridge",
            Family::Bb => "BB",
        }
    }

    /// Returns whether host controllers of this family record a flash size
    /// class in their digital section.
    #[must_use]
    pub fn has_flash_size(self) -> bool {
        match self {
            Family::AlpineRidge | Family::AlpineRidgeC | Family::TitanRidge => true,
            Family::Unknown | Family::FalconRidge | Family::WinRidge | Family::Bb => false,
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for a Thunderbolt controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HardwareInfo {
    /// The PCI device ID of the controller.
    pub device_id: u16,
    /// The Thunderbolt generation.
    pub generation: u32,
    /// The silicon family.
    pub family: Family,
    /// The number of ports.
    pub ports: u32,
}

impl HardwareInfo {
    const fn new(device_id: u16, generation: u32, family: Family, ports: u32) -> Self {
        Self {
            device_id,
            generation,
            family,
            ports,
        }
    }
}

static HW_INFO: [HardwareInfo; 12] = [
    HardwareInfo::new(0x156d, 2, Family::FalconRidge, 2), // FR 4C
    HardwareInfo::new(0x156b, 2, Family::FalconRidge, 1), // FR 2C
    HardwareInfo::new(0x157e, 2, Family::WinRidge, 1),
    HardwareInfo::new(0x1578, 3, Family::AlpineRidge, 2), // AR 4C
    HardwareInfo::new(0x1576, 3, Family::AlpineRidge, 1), // AR 2C
    HardwareInfo::new(0x15c0, 3, Family::AlpineRidge, 1), // AR LP
    HardwareInfo::new(0x15d3, 3, Family::AlpineRidgeC, 2), // AR-C 4C
    HardwareInfo::new(0x15da, 3, Family::AlpineRidgeC, 1), // AR-C 2C
    HardwareInfo::new(0x15e7, 3, Family::TitanRidge, 1), // TR 2C
    HardwareInfo::new(0x15ea, 3, Family::TitanRidge, 2), // TR 4C
    HardwareInfo::new(0x15ef, 3, Family::TitanRidge, 2), // TR 4C device
    HardwareInfo::new(0x15ee, 3, Family::Bb, 0),         // device only
];

/// Returns all known controllers.
///
/// # Examples
///
/// ```
/// use tbtkit::catalog;
///
/// let hosts = catalog::controllers()
///     .iter()
///     .filter(|info| info.ports > 0)
///     .count();
/// assert_eq!(hosts, catalog::controllers().len() - 1);
/// ```
#[must_use]
pub fn controllers() -> &'static [HardwareInfo] {
    &HW_INFO
}

/// Looks up a controller by its device ID.
///
/// # Examples
///
/// ```
/// use tbtkit::catalog::{self, Family};
///
/// let info = catalog::lookup(0x15ea).unwrap();
/// assert_eq!(info.family, Family::TitanRidge);
/// assert_eq!(info.ports, 2);
/// assert!(catalog::lookup(0xffff).is_none());
/// ```
#[must_use]
pub fn lookup(device_id: u16) -> Option<&'static HardwareInfo> {
    HW_INFO.iter().find(|info| info.device_id == device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falcon_ridge() {
        assert_eq!(
            lookup(0x156d),
            Some(&HardwareInfo {
                device_id: 0x156d,
                generation: 2,
                family: Family::FalconRidge,
                ports: 2,
            })
        );
    }

    #[test]
    fn unknown_device() {
        assert_eq!(lookup(0x0000), None);
        assert_eq!(lookup(0xffff), None);
    }

    #[test]
    fn device_ids_are_unique() {
        let all = controllers();
        assert_eq!(all.len(), HW_INFO.len());
        for (i, info) in all.iter().enumerate() {
            assert!(
                all[i + 1..]
                    .iter()
                    .all(|other| other.device_id != info.device_id),
                "duplicate device id 0x{:04x}",
                info.device_id
            );
        }
    }

    #[test]
    fn every_controller_is_found() {
        for info in controllers() {
            assert_eq!(lookup(info.device_id), Some(info));
            assert!(info.ports > 0 || info.family == Family::Bb);
        }
    }

    #[test]
    fn flash_size_families() {
        assert!(Family::AlpineRidge.has_flash_size());
        assert!(Family::AlpineRidgeC.has_flash_size());
        assert!(Family::TitanRidge.has_flash_size());
        assert!(!Family::FalconRidge.has_flash_size());
        assert!(!Family::Bb.has_flash_size());
        assert!(!Family::Unknown.has_flash_size());
    }
}
