// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{FirmwareDescriptor, Section};

/// Returns whether the DROM is required but was not located.
///
/// Hosts before generation 3 never carry a DROM.
pub(crate) fn missing_required_drom(fw: &FirmwareDescriptor) -> bool {
    if fw.sections.resolved(Section::Drom).is_some() {
        return false;
    }
    !(fw.is_host && fw.generation < 3)
}

/// Returns whether the image is for a host controller missing from the
/// catalog.
pub(crate) fn unsupported_controller(fw: &FirmwareDescriptor) -> bool {
    fw.is_host && fw.ports == 0
}
