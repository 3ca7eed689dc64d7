// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Selection of an image decoder by format tag.

use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

use crate::ImageFormat;
use crate::error::NvmError;
use crate::nvm::FirmwareDescriptor;

/// The Thunderbolt NVM image format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ThunderboltFormat;

impl ImageFormat for ThunderboltFormat {
    type Descriptor = FirmwareDescriptor;

    fn parse(&self, data: &[u8]) -> Result<FirmwareDescriptor, NvmError> {
        FirmwareDescriptor::parse(data)
    }

    fn describe<'d>(&self, descriptor: &'d FirmwareDescriptor) -> impl Display + 'd {
        descriptor
    }
}

/// A known image format.
///
/// # Examples
///
/// ```
/// use tbtkit::ImageFormat;
/// use tbtkit::format::Format;
///
/// let format: Format = "thunderbolt".parse().unwrap();
/// let mut probe = [0u8; 0x80];
/// probe[0] = 0x40;
/// let fw = format.parse(&probe).unwrap();
/// assert!(format.describe(&fw).to_string().contains("IsNative: false"));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Format {
    /// A Thunderbolt controller NVM image.
    Thunderbolt,
}

impl Format {
    fn as_str(self) -> &'static str {
        match self {
            Format::Thunderbolt => "thunderbolt",
        }
    }
}

impl ImageFormat for Format {
    type Descriptor = FirmwareDescriptor;

    fn parse(&self, data: &[u8]) -> Result<FirmwareDescriptor, NvmError> {
        match self {
            Format::Thunderbolt => ThunderboltFormat.parse(data),
        }
    }

    fn describe<'d>(&self, descriptor: &'d FirmwareDescriptor) -> impl Display + 'd {
        match self {
            Format::Thunderbolt => descriptor,
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = NvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thunderbolt" => Ok(Self::Thunderbolt),
            _ => Err(NvmError::UnknownFormat),
        }
    }
}
