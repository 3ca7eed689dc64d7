// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `tbtkit` crate.

use core::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::nvm::Section;

/// An error that can occur when decoding an NVM image.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum NvmError {
    /// There was an error decoding the image.
    #[error("{0}")]
    Parse(#[from] NvmParseError),
    /// The requested image format tag is not known.
    #[error("unknown image format")]
    UnknownFormat,
}

impl NvmError {
    /// Returns the kind of the underlying parse error, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&NvmErrorKind> {
        match self {
            NvmError::Parse(e) => Some(&e.kind),
            NvmError::UnknownFormat => None,
        }
    }
}

/// An error that can occur when decoding an NVM image.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct NvmParseError {
    offset: usize,
    field: &'static str,
    /// The type of the error that has occurred.
    pub kind: NvmErrorKind,
}

impl NvmParseError {
    pub(crate) fn new(kind: NvmErrorKind, field: &'static str, offset: usize) -> Self {
        Self {
            offset,
            field,
            kind,
        }
    }

    /// Returns the absolute image offset that was being examined.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the name of the field that was being read or checked.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// The kind of an error that can occur when decoding an NVM image.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum NvmErrorKind {
    /// A read of `len` bytes would extend past the end of the image, or the
    /// location could not be computed without overflowing.
    OutOfBounds {
        /// The width of the attempted read.
        len: usize,
    },
    /// A read was attempted relative to a section that has not been located.
    ///
    /// Decoding only reads a section after locating it, so this is never
    /// returned for any input image. It marks a read issued out of order.
    SectionUnresolved(Section),
    /// Neither FARB pointer location holds a usable value.
    InvalidFormat,
    /// The DRAM ucode marker is absent from the available sections.
    MissingSections,
    /// The DROM section is required for this controller but was not found.
    IncompleteSections,
    /// The image claims to be for a host controller that is not known.
    UnsupportedController(u16),
}

impl Display for NvmParseError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} while reading {} at offset {:#x}",
            self.kind, self.field, self.offset
        )
    }
}

impl Display for NvmErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            NvmErrorKind::OutOfBounds { len } => {
                write!(f, "{len}-byte location is outside of the image")
            }
            NvmErrorKind::SectionUnresolved(section) => {
                write!(f, "{section} section has not been located")
            }
            NvmErrorKind::InvalidFormat => write!(f, "invalid FW image file format"),
            NvmErrorKind::MissingSections => {
                write!(f, "can't find needed FW sections in the FW image")
            }
            NvmErrorKind::IncompleteSections => write!(f, "can't find required FW sections"),
            NvmErrorKind::UnsupportedController(id) => {
                write!(f, "unknown controller 0x{id:04x}")
            }
        }
    }
}

impl core::error::Error for NvmParseError {}
