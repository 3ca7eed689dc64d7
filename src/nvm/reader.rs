// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bounds-checked access to the raw NVM image.
//!
//! Every byte the decoder looks at goes through [`NvmReader`]. Locations are
//! given as an offset relative to a [`Section`], which is rebased onto the
//! section's absolute offset from a [`SectionTable`] before the image is
//! touched.

use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned, little_endian};

use super::section::{Section, SectionTable};
use crate::error::{NvmErrorKind, NvmParseError};

/// A read-only view of an NVM image.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NvmReader<'a> {
    data: &'a [u8],
}

impl<'a> NvmReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns the absolute image offset of `offset` within `section`.
    ///
    /// Only the digital section may be used while unresolved: that is how the
    /// bootstrap reads address the start of the image.
    pub(crate) fn locate(
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<usize, NvmParseError> {
        let base = sections.get(section);
        if base == 0 && section != Section::Digital {
            return Err(NvmParseError::new(
                NvmErrorKind::SectionUnresolved(section),
                field,
                offset as usize,
            ));
        }
        (base as usize).checked_add(offset as usize).ok_or_else(|| {
            NvmParseError::new(NvmErrorKind::OutOfBounds { len: 0 }, field, usize::MAX)
        })
    }

    fn read<T>(
        &self,
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<&'a T, NvmParseError>
    where
        T: FromBytes + KnownLayout + Immutable + Unaligned,
    {
        let start = Self::locate(sections, section, offset, field)?;
        let out_of_bounds = || {
            NvmParseError::new(
                NvmErrorKind::OutOfBounds {
                    len: size_of::<T>(),
                },
                field,
                start,
            )
        };
        let remaining = self.data.get(start..).ok_or_else(out_of_bounds)?;
        let (value, _rest) = T::ref_from_prefix(remaining).map_err(|_| out_of_bounds())?;
        Ok(value)
    }

    pub(crate) fn read_u8(
        &self,
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<u8, NvmParseError> {
        self.read::<u8>(sections, section, offset, field).copied()
    }

    pub(crate) fn read_u16(
        &self,
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<u16, NvmParseError> {
        Ok(self
            .read::<little_endian::U16>(sections, section, offset, field)?
            .get())
    }

    /// Reads a 24-bit little-endian value, zero-extended to 32 bits.
    pub(crate) fn read_u24(
        &self,
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<u32, NvmParseError> {
        let [b0, b1, b2] = *self.read::<[u8; 3]>(sections, section, offset, field)?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    pub(crate) fn read_u32(
        &self,
        sections: &SectionTable,
        section: Section,
        offset: u32,
        field: &'static str,
    ) -> Result<u32, NvmParseError> {
        Ok(self
            .read::<little_endian::U32>(sections, section, offset, field)?
            .get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &[u8] = &[
        0x10, 0x20, 0x30, 0x40, // 0x00
        0x50, 0x60, 0x70, 0x80, // 0x04
    ];

    #[test]
    fn reads_little_endian() {
        let reader = NvmReader::new(DATA);
        let sections = SectionTable::default();

        assert_eq!(
            reader.read_u8(&sections, Section::Digital, 1, "u8"),
            Ok(0x20)
        );
        assert_eq!(
            reader.read_u16(&sections, Section::Digital, 0, "u16"),
            Ok(0x2010)
        );
        assert_eq!(
            reader.read_u24(&sections, Section::Digital, 0, "u24"),
            Ok(0x0030_2010)
        );
        assert_eq!(
            reader.read_u32(&sections, Section::Digital, 4, "u32"),
            Ok(0x8070_6050)
        );
    }

    #[test]
    fn reads_relative_to_section() {
        let reader = NvmReader::new(DATA);
        let mut sections = SectionTable::default();
        sections.set(Section::Digital, 2);
        sections.set(Section::Drom, 4);

        assert_eq!(
            reader.read_u16(&sections, Section::Digital, 0, "u16"),
            Ok(0x4030)
        );
        assert_eq!(
            reader.read_u8(&sections, Section::Drom, 3, "u8"),
            Ok(0x80)
        );
    }

    #[test]
    fn read_past_end() {
        let reader = NvmReader::new(DATA);
        let sections = SectionTable::default();

        let err = reader
            .read_u32(&sections, Section::Digital, 5, "u32")
            .unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 4 });
        assert_eq!(err.offset(), 5);
        assert_eq!(err.field(), "u32");

        let err = reader
            .read_u8(&sections, Section::Digital, 8, "u8")
            .unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 1 });
    }

    #[test]
    fn read_far_past_end() {
        let reader = NvmReader::new(DATA);
        let mut sections = SectionTable::default();
        sections.set(Section::Digital, u32::MAX);

        let err = reader
            .read_u32(&sections, Section::Digital, u32::MAX, "u32")
            .unwrap_err();
        assert!(matches!(err.kind, NvmErrorKind::OutOfBounds { .. }));
    }

    #[test]
    fn unresolved_section() {
        let reader = NvmReader::new(DATA);
        let sections = SectionTable::default();

        let err = reader
            .read_u16(&sections, Section::ArcParams, 0, "u16")
            .unwrap_err();
        assert_eq!(
            err.kind,
            NvmErrorKind::SectionUnresolved(Section::ArcParams)
        );
    }
}
