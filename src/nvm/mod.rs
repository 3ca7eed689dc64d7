// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A read-only decoder for Thunderbolt controller NVM images.
//!
//! This module provides the [`FirmwareDescriptor`] struct, which is decoded
//! from a raw image read out of a controller's flash. It describes the
//! controller the image was built for and where the image's sections live,
//! which is what is needed to decide whether a new image is compatible with
//! the one already on the device.

mod reader;
mod section;
mod validate;

use core::fmt::{self, Display, Formatter};

use tracing::debug;

use self::reader::NvmReader;
pub use self::section::Section;
use self::section::SectionTable;
use crate::catalog::{self, Family};
use crate::error::{NvmError, NvmErrorKind, NvmParseError};

/// Size of the first chunk of flash, which is enough to identify an image.
pub const PROBE_LEN: usize = 0x80;

/// Offset of the native flag byte, read before the digital section is known.
const NATIVE_OFFSET: u32 = 0x7b;
const NATIVE_FLAG: u8 = 1 << 5;

const HOST_OFFSET: u32 = 0x10;
const HOST_FLAG: u8 = 1 << 1;
const DEVICE_ID_OFFSET: u32 = 0x5;
const FLASH_SIZE_OFFSET: u32 = 0x45;
const FLASH_SIZE_MASK: u8 = 0x07;

const VENDOR_ID_OFFSET: u32 = 0x10;
const MODEL_ID_OFFSET: u32 = 0x12;

const PD_POINTER_OFFSET: u32 = 0x10c;

/// A decoded Thunderbolt NVM image.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FirmwareDescriptor {
    sections: SectionTable,
    family: Family,
    generation: u32,
    ports: u32,
    is_host: bool,
    is_native: bool,
    has_pd: bool,
    device_id: u16,
    vendor_id: u16,
    model_id: u16,
    flash_size: u8,
}

fn valid_pd_pointer(pointer: u32) -> bool {
    pointer != 0 && pointer != 0xffff_ffff
}

impl FirmwareDescriptor {
    /// Decodes an NVM image.
    ///
    /// If `data` is exactly [`PROBE_LEN`] bytes long, only the native flag and
    /// the digital section are decoded.
    ///
    /// # Errors
    ///
    /// Returns an [`NvmErrorKind::OutOfBounds`] if any location computed
    /// while decoding lies outside of `data`.
    ///
    /// Returns an [`NvmErrorKind::InvalidFormat`] if neither FARB pointer is
    /// usable.
    ///
    /// Returns an [`NvmErrorKind::UnsupportedController`] if the image is for
    /// a host controller that is not in the [catalog](crate::catalog).
    ///
    /// Returns an [`NvmErrorKind::MissingSections`] if the image is for a
    /// generation 3 host but doesn't contain DRAM ucode.
    ///
    /// Returns an [`NvmErrorKind::IncompleteSections`] if the image needs a
    /// DROM but none was found.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tbtkit::nvm::{FirmwareDescriptor, PROBE_LEN, Section};
    /// let mut probe = [0u8; PROBE_LEN];
    /// probe[0] = 0x40;
    /// probe[0x7b] = 0x20;
    /// let fw = FirmwareDescriptor::parse(&probe).unwrap();
    /// assert!(fw.is_native());
    /// assert_eq!(fw.section(Section::Digital), Some(0x40));
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, NvmError> {
        let reader = NvmReader::new(data);
        let mut fw = FirmwareDescriptor::default();

        let native = reader.read_u8(&fw.sections, Section::Digital, NATIVE_OFFSET, "native")?;
        fw.is_native = native & NATIVE_FLAG != 0;

        let digital = section::digital_offset(&reader)?;
        fw.sections.set(Section::Digital, digital);
        debug!(digital, is_native = fw.is_native, "located digital section");

        if data.len() == PROBE_LEN {
            debug!("probe only, skipping the remaining sections");
            return Ok(fw);
        }

        fw.read_identity(&reader)?;

        fw.sections = section::resolve_dependent(&reader, fw.sections, fw.is_host, fw.generation)?;
        if validate::missing_required_drom(&fw) {
            return Err(NvmParseError::new(
                NvmErrorKind::IncompleteSections,
                "drom pointer",
                fw.sections.get(Section::Digital) as usize,
            )
            .into());
        }
        debug!(sections = ?fw.sections, "located sections");

        fw.read_derived(&reader)?;
        Ok(fw)
    }

    fn read_identity(&mut self, reader: &NvmReader) -> Result<(), NvmParseError> {
        let host = reader.read_u8(&self.sections, Section::Digital, HOST_OFFSET, "is-host")?;
        self.is_host = host & HOST_FLAG != 0;
        self.device_id = reader.read_u16(
            &self.sections,
            Section::Digital,
            DEVICE_ID_OFFSET,
            "device id",
        )?;

        if let Some(info) = catalog::lookup(self.device_id) {
            self.family = info.family;
            self.generation = info.generation;
            self.ports = info.ports;
        }
        debug!(
            device_id = self.device_id,
            is_host = self.is_host,
            generation = self.generation,
            "identified controller"
        );

        if validate::unsupported_controller(self) {
            return Err(NvmParseError::new(
                NvmErrorKind::UnsupportedController(self.device_id),
                "device id",
                NvmReader::locate(
                    &self.sections,
                    Section::Digital,
                    DEVICE_ID_OFFSET,
                    "device id",
                )?,
            ));
        }
        Ok(())
    }

    fn read_derived(&mut self, reader: &NvmReader) -> Result<(), NvmParseError> {
        if self.sections.resolved(Section::Drom).is_some() {
            self.vendor_id =
                reader.read_u16(&self.sections, Section::Drom, VENDOR_ID_OFFSET, "vendor id")?;
            self.model_id =
                reader.read_u16(&self.sections, Section::Drom, MODEL_ID_OFFSET, "model id")?;
        }

        if self.sections.resolved(Section::ArcParams).is_some() {
            let pd_pointer = reader.read_u32(
                &self.sections,
                Section::ArcParams,
                PD_POINTER_OFFSET,
                "pd pointer",
            )?;
            self.has_pd = valid_pd_pointer(pd_pointer);
        }

        // An ordinal for comparing images, not a size in bytes.
        if self.is_host && self.family.has_flash_size() {
            let flash_size = reader.read_u8(
                &self.sections,
                Section::Digital,
                FLASH_SIZE_OFFSET,
                "flash size",
            )?;
            self.flash_size = flash_size & FLASH_SIZE_MASK;
        }
        Ok(())
    }

    /// Returns the absolute offset of the given section, or `None` if it
    /// wasn't located.
    #[must_use]
    pub fn section(&self, section: Section) -> Option<u32> {
        self.sections.resolved(section)
    }

    /// Returns the silicon family of the controller.
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Returns the Thunderbolt generation of the controller, or 0 if unknown.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the number of ports of the controller, or 0 if unknown.
    #[must_use]
    pub fn ports(&self) -> u32 {
        self.ports
    }

    /// Returns whether the image is for a host controller rather than a
    /// peripheral device.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Returns whether the image is native firmware.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.is_native
    }

    /// Returns whether the controller has a power delivery controller.
    #[must_use]
    pub fn has_pd(&self) -> bool {
        self.has_pd
    }

    /// Returns the PCI device ID of the controller.
    #[must_use]
    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    /// Returns the vendor ID from the DROM.
    #[must_use]
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    /// Returns the model ID from the DROM.
    #[must_use]
    pub fn model_id(&self) -> u16 {
        self.model_id
    }

    /// Returns the flash size class, from 0 to 7.
    #[must_use]
    pub fn flash_size(&self) -> u8 {
        self.flash_size
    }
}

impl Display for FirmwareDescriptor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "Family: {}", self.family)?;
        writeln!(f, "IsHost: {}", self.is_host)?;
        writeln!(f, "IsNative: {}", self.is_native)?;
        writeln!(f, "DeviceId: 0x{:x}", self.device_id)?;
        writeln!(f, "VendorId: 0x{:x}", self.vendor_id)?;
        writeln!(f, "ModelId: 0x{:x}", self.model_id)?;
        writeln!(f, "FlashSize: 0x{:x}", self.flash_size)?;
        writeln!(f, "Generation: 0x{:x}", self.generation)?;
        writeln!(f, "Ports: 0x{:x}", self.ports)?;
        writeln!(f, "HasPd: {}", self.has_pd)?;
        for (i, section) in Section::ALL.into_iter().enumerate() {
            writeln!(f, "Section{i}: 0x{:x}", self.sections.get(section))?;
        }
        Ok(())
    }
}
