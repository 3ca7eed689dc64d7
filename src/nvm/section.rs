// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sections of an NVM image and the chained-pointer algorithm that locates
//! them.
//!
//! The image has no table of contents. The digital section is found through a
//! FARB pointer at one of two fixed locations, and every other section is
//! found through values stored inside the digital section, relative to the
//! digital section's own start.

use core::fmt::{self, Display, Formatter};

use tracing::trace;

use super::reader::NvmReader;
use crate::error::{NvmErrorKind, NvmParseError};

/// Locations of the FARB pointer, in the order they are tried.
const FARB_POINTER_OFFSETS: [u32; 2] = [0x0, 0x1000];
const DROM_POINTER_OFFSET: u32 = 0x10e;
const ARC_PARAMS_POINTER_OFFSET: u32 = 0x75;
const AVAILABLE_SECTIONS_OFFSET: u32 = 0x2;
const UCODE_START_OFFSET: u32 = 0x3;

/// Set in the available sections mask when the DRAM ucode section is present.
/// The lower bits each flag a length-prefixed block that precedes it.
const DRAM_FLAG: u8 = 1 << 6;

/// A section of an NVM image.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    /// The base section that every other section is located from.
    Digital,
    /// The device ROM, holding vendor and model identification.
    Drom,
    /// The ARC parameters, holding the power delivery pointer.
    ArcParams,
    /// The DRAM microcode.
    DramUcode,
}

impl Section {
    /// All section kinds, in table order.
    pub const ALL: [Section; 4] = [
        Section::Digital,
        Section::Drom,
        Section::ArcParams,
        Section::DramUcode,
    ];

    const fn index(self) -> usize {
        match self {
            Section::Digital => 0,
            Section::Drom => 1,
            Section::ArcParams => 2,
            Section::DramUcode => 3,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Section::Digital => "digital",
            Section::Drom => "DROM",
            Section::ArcParams => "ARC params",
            Section::DramUcode => "DRAM ucode",
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute offsets of the sections of an image. An offset of 0 means the
/// section has not been located.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct SectionTable {
    offsets: [u32; Section::ALL.len()],
}

impl SectionTable {
    pub(crate) fn get(&self, section: Section) -> u32 {
        self.offsets[section.index()]
    }

    pub(crate) fn resolved(&self, section: Section) -> Option<u32> {
        Some(self.get(section)).filter(|&offset| offset != 0)
    }

    pub(crate) fn set(&mut self, section: Section, offset: u32) {
        self.offsets[section.index()] = offset;
    }
}

fn valid_farb_pointer(pointer: u32) -> bool {
    pointer != 0 && pointer != 0x00ff_ffff
}

/// Reads the FARB pointer, falling back to its secondary location if the
/// primary one is blank, and returns the absolute offset of the digital
/// section.
pub(crate) fn digital_offset(reader: &NvmReader) -> Result<u32, NvmParseError> {
    let bootstrap = SectionTable::default();
    for offset in FARB_POINTER_OFFSETS {
        let pointer = reader.read_u24(&bootstrap, Section::Digital, offset, "farb pointer")?;
        if valid_farb_pointer(pointer) {
            return Ok(pointer);
        }
        trace!(offset, pointer, "unusable farb pointer");
    }
    Err(NvmParseError::new(
        NvmErrorKind::InvalidFormat,
        "farb pointer",
        FARB_POINTER_OFFSETS[FARB_POINTER_OFFSETS.len() - 1] as usize,
    ))
}

/// Locates the sections that depend on the digital section.
///
/// The DROM and ARC params are located for generation 3 and later, and for
/// controllers of unknown generation. The DRAM ucode is only located for
/// hosts of generation 3 and later.
pub(crate) fn resolve_dependent(
    reader: &NvmReader,
    mut sections: SectionTable,
    is_host: bool,
    generation: u32,
) -> Result<SectionTable, NvmParseError> {
    let Some(digital) = sections.resolved(Section::Digital) else {
        return Err(NvmParseError::new(
            NvmErrorKind::SectionUnresolved(Section::Digital),
            "digital section",
            0,
        ));
    };

    if generation >= 3 || generation == 0 {
        let drom = reader.read_u32(
            &sections,
            Section::Digital,
            DROM_POINTER_OFFSET,
            "drom pointer",
        )?;
        let at = NvmReader::locate(
            &sections,
            Section::Digital,
            DROM_POINTER_OFFSET,
            "drom pointer",
        )?;
        sections.set(Section::Drom, rebase(digital, drom, "drom pointer", at)?);

        let arc_params = reader.read_u32(
            &sections,
            Section::Digital,
            ARC_PARAMS_POINTER_OFFSET,
            "arc params pointer",
        )?;
        let at = NvmReader::locate(
            &sections,
            Section::Digital,
            ARC_PARAMS_POINTER_OFFSET,
            "arc params pointer",
        )?;
        sections.set(
            Section::ArcParams,
            rebase(digital, arc_params, "arc params pointer", at)?,
        );
    }

    if is_host && generation > 2 {
        let ucode = dram_ucode_offset(reader, &sections)?;
        let at = NvmReader::locate(
            &sections,
            Section::Digital,
            UCODE_START_OFFSET,
            "ucode start offset",
        )?;
        sections.set(
            Section::DramUcode,
            rebase(digital, ucode, "ucode start offset", at)?,
        );
    }

    Ok(sections)
}

/// Adds a digital-relative offset to the digital section's offset. On
/// overflow the error points at `at`, the location the offset was read from.
fn rebase(
    digital: u32,
    relative: u32,
    field: &'static str,
    at: usize,
) -> Result<u32, NvmParseError> {
    digital
        .checked_add(relative)
        .ok_or_else(|| NvmParseError::new(NvmErrorKind::OutOfBounds { len: 0 }, field, at))
}

/// Walks the chain of ucode sections and returns the offset of the DRAM ucode
/// relative to the digital section.
///
/// Each block flagged in the available sections mask starts with a `u16`
/// giving its length in 4-byte words, not counting the length itself. Blocks
/// are laid out back to back in flag order, the DRAM ucode last.
fn dram_ucode_offset(reader: &NvmReader, sections: &SectionTable) -> Result<u32, NvmParseError> {
    let available = reader.read_u8(
        sections,
        Section::Digital,
        AVAILABLE_SECTIONS_OFFSET,
        "available sections",
    )?;
    let start = reader.read_u16(
        sections,
        Section::Digital,
        UCODE_START_OFFSET,
        "ucode start offset",
    )?;
    if available & DRAM_FLAG == 0 {
        return Err(NvmParseError::new(
            NvmErrorKind::MissingSections,
            "available sections",
            NvmReader::locate(
                sections,
                Section::Digital,
                AVAILABLE_SECTIONS_OFFSET,
                "available sections",
            )?,
        ));
    }

    (0..DRAM_FLAG.trailing_zeros())
        .map(|bit| 1u8 << bit)
        .filter(|flag| available & flag != 0)
        .try_fold(u32::from(start), |offset, flag| {
            let len = ucode_section_len(reader, sections, offset)?;
            trace!(flag, offset, len, "skipping ucode section");
            let at =
                NvmReader::locate(sections, Section::Digital, offset, "ucode section length")?;
            offset.checked_add(len).ok_or_else(|| {
                NvmParseError::new(
                    NvmErrorKind::OutOfBounds { len: 0 },
                    "ucode section length",
                    at,
                )
            })
        })
}

/// Returns the size in bytes of the ucode section at `offset`, including its
/// length field.
fn ucode_section_len(
    reader: &NvmReader,
    sections: &SectionTable,
    offset: u32,
) -> Result<u32, NvmParseError> {
    let words = reader.read_u16(sections, Section::Digital, offset, "ucode section length")?;
    Ok(u32::from(words) * 4 + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(patches: &[(usize, &[u8])]) -> [u8; 0x2000] {
        let mut data = [0; 0x2000];
        for (offset, bytes) in patches {
            data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        data
    }

    fn digital_at(offset: u32) -> SectionTable {
        let mut sections = SectionTable::default();
        sections.set(Section::Digital, offset);
        sections
    }

    #[test]
    fn primary_farb_pointer() {
        let data = image_with(&[(0, &[0x40, 0x00, 0x00])]);
        let reader = NvmReader::new(&data[..0x100]);
        assert_eq!(digital_offset(&reader), Ok(0x40));
    }

    #[test]
    fn fallback_farb_pointer() {
        for primary in [[0xff, 0xff, 0xff], [0x00, 0x00, 0x00]] {
            let data = image_with(&[(0, &primary), (0x1000, &[0x10, 0x00, 0x00])]);
            let reader = NvmReader::new(&data[..0x1003]);
            assert_eq!(digital_offset(&reader), Ok(0x10));
        }
    }

    #[test]
    fn no_valid_farb_pointer() {
        let data = image_with(&[(0, &[0xff, 0xff, 0xff]), (0x1000, &[0xff, 0xff, 0xff])]);
        let reader = NvmReader::new(&data[..0x1003]);
        let err = digital_offset(&reader).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::InvalidFormat);
        assert_eq!(err.offset(), 0x1000);
    }

    #[test]
    fn fallback_farb_pointer_truncated() {
        let data = image_with(&[(0, &[0xff, 0xff, 0xff])]);
        let reader = NvmReader::new(&data[..0x1002]);
        let err = digital_offset(&reader).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 3 });
    }

    #[test]
    fn drom_and_arc_params_rebased_on_digital() {
        let data = image_with(&[
            (0x100 + 0x10e, &[0x00, 0x02, 0x00, 0x00]),
            (0x100 + 0x75, &[0x80, 0x01, 0x00, 0x00]),
        ]);
        let reader = NvmReader::new(&data[..0x400]);

        for generation in [0, 3] {
            let sections = resolve_dependent(&reader, digital_at(0x100), false, generation)
                .unwrap();
            assert_eq!(sections.get(Section::Drom), 0x300);
            assert_eq!(sections.get(Section::ArcParams), 0x280);
            assert_eq!(sections.resolved(Section::DramUcode), None);
        }
    }

    #[test]
    fn early_generation_skips_dependent_sections() {
        let data = image_with(&[]);
        let reader = NvmReader::new(&data[..0x40]);
        let sections = resolve_dependent(&reader, digital_at(0x10), true, 2).unwrap();
        assert_eq!(sections, digital_at(0x10));
    }

    #[test]
    fn dram_ucode_chain() {
        // Flags 0x01 and 0x04 are set, so two blocks are skipped.
        let data = image_with(&[
            (0x100 + 0x2, &[DRAM_FLAG | 0x05, 0x20, 0x00]),
            (0x100 + 0x20, &[0x03, 0x00]),
            (0x100 + 0x2e, &[0x10, 0x00]),
        ]);
        let reader = NvmReader::new(&data[..0x400]);
        let sections = resolve_dependent(&reader, digital_at(0x100), true, 3).unwrap();
        // 0x20 + (3 * 4 + 2) = 0x2e, 0x2e + (0x10 * 4 + 2) = 0x70
        assert_eq!(sections.get(Section::DramUcode), 0x170);
    }

    #[test]
    fn dram_ucode_without_skipped_blocks() {
        let data = image_with(&[(0x100 + 0x2, &[DRAM_FLAG, 0x34, 0x01])]);
        let reader = NvmReader::new(&data[..0x400]);
        let sections = resolve_dependent(&reader, digital_at(0x100), true, 3).unwrap();
        assert_eq!(sections.get(Section::DramUcode), 0x234);
    }

    #[test]
    fn dram_flag_missing() {
        let data = image_with(&[(0x100 + 0x2, &[0x3f, 0x20, 0x00])]);
        let reader = NvmReader::new(&data[..0x400]);
        let err = resolve_dependent(&reader, digital_at(0x100), true, 3).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::MissingSections);
        assert_eq!(err.offset(), 0x102);
    }

    #[test]
    fn ucode_chain_runs_off_the_end() {
        let data = image_with(&[
            (0x100 + 0x2, &[DRAM_FLAG | 0x03, 0x20, 0x00]),
            (0x100 + 0x20, &[0xff, 0xff]),
        ]);
        let reader = NvmReader::new(&data[..0x400]);
        let err = resolve_dependent(&reader, digital_at(0x100), true, 3).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 2 });
        assert_eq!(err.field(), "ucode section length");
    }

    #[test]
    fn rebased_pointer_overflows() {
        let data = image_with(&[(0x200 + 0x10e, &[0x00, 0xff, 0xff, 0xff])]);
        let reader = NvmReader::new(&data[..0x400]);
        let err = resolve_dependent(&reader, digital_at(0x200), false, 3).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 0 });
        assert_eq!(err.field(), "drom pointer");
        assert_eq!(err.offset(), 0x30e);

        let data = image_with(&[(0x200 + 0x75, &[0x00, 0xff, 0xff, 0xff])]);
        let reader = NvmReader::new(&data[..0x400]);
        let err = resolve_dependent(&reader, digital_at(0x200), false, 3).unwrap_err();
        assert_eq!(err.field(), "arc params pointer");
        assert_eq!(err.offset(), 0x275);
    }

    #[test]
    fn rebase_overflow_reports_field_location() {
        let err = rebase(u32::MAX, u32::MAX, "drom pointer", 0x10).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::OutOfBounds { len: 0 });
        assert_eq!(err.offset(), 0x10);
        assert_eq!(rebase(0x200, 0x100, "drom pointer", 0x10), Ok(0x300));
    }

    #[test]
    fn digital_must_be_resolved() {
        let data = image_with(&[]);
        let reader = NvmReader::new(&data[..0x400]);
        let err = resolve_dependent(&reader, SectionTable::default(), false, 3).unwrap_err();
        assert_eq!(err.kind, NvmErrorKind::SectionUnresolved(Section::Digital));
    }
}
