// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for decoding Thunderbolt controller NVM images.
//!
//! An NVM image, as read out of a controller's flash, has no directory of its
//! contents. This library locates the sections of an image by following the
//! chain of pointers stored inside it, and extracts the attributes needed to
//! decide whether a firmware update is compatible with a device:
//!
//! - The controller family, generation and port count.
//! - Whether the controller is a host or a peripheral device.
//! - The vendor and model IDs, power delivery presence and flash size class.
//!
//! Every read is bounds-checked against the image, and decoding either
//! produces a complete [`FirmwareDescriptor`] or an error.
//!
//! The library is written purely in Rust and is `#![no_std]` compatible.
//!
//! # Examples
//!
//! ```
//! let mut probe = [0u8; 0x80];
//! probe[..3].copy_from_slice(&[0x00, 0x10, 0x00]);
//! let fw = tbtkit::parse(&probe).unwrap();
//! assert!(!fw.is_native());
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(test)]
extern crate std;

use core::fmt::Display;

pub mod catalog;
pub mod error;
pub mod format;
pub mod nvm;

use crate::error::NvmError;
pub use crate::nvm::FirmwareDescriptor;

/// A firmware image format that can be decoded into a descriptor.
pub trait ImageFormat {
    /// The decoded description of an image.
    type Descriptor;

    /// Decodes `data` into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not a valid image of this format.
    fn parse(&self, data: &[u8]) -> Result<Self::Descriptor, NvmError>;

    /// Returns a human-readable rendering of `descriptor`, one `key: value`
    /// pair per line.
    fn describe<'d>(&self, descriptor: &'d Self::Descriptor) -> impl Display + 'd;
}

/// Decodes a Thunderbolt NVM image.
///
/// This is the same as [`FirmwareDescriptor::parse`].
///
/// # Errors
///
/// Returns an error if `data` is truncated, isn't a Thunderbolt NVM image,
/// or is for an unsupported controller.
pub fn parse(data: &[u8]) -> Result<FirmwareDescriptor, NvmError> {
    FirmwareDescriptor::parse(data)
}
