// src/platform/power.rs

use std::ptr;

use anyhow::{anyhow, Result};
use widestring::U16String;
use windows::{
    core::GUID,
    Win32::{
        Foundation::{LocalFree, ERROR_NO_MORE_ITEMS, HLOCAL, WIN32_ERROR},
        System::Power::{
            PowerEnumerate, PowerGetActiveScheme, PowerReadACValueIndex, PowerReadDCValueIndex,
            PowerReadFriendlyName, PowerSetActiveScheme, ACCESS_SCHEME,
        },
    },
};

use crate::power::{normalize_plan_guid, PowerPlanInfo};

/// Parses a power scheme GUID in any accepted textual form.
pub fn parse_guid(guid: &str) -> Result<GUID> {
    let normalized = normalize_plan_guid(guid);
    if normalized.len() != 32 {
        return Err(anyhow!("Invalid power scheme GUID '{}'", guid));
    }
    let value = u128::from_str_radix(&normalized, 16)
        .map_err(|e| anyhow!("Invalid power scheme GUID '{}': {}", guid, e))?;
    Ok(GUID::from_u128(value))
}

/// Hyphenated lowercase textual form of a GUID.
pub fn format_guid(guid: &GUID) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        guid.data1,
        guid.data2,
        guid.data3,
        guid.data4[0],
        guid.data4[1],
        guid.data4[2],
        guid.data4[3],
        guid.data4[4],
        guid.data4[5],
        guid.data4[6],
        guid.data4[7],
    )
}

/// The currently active power scheme with its friendly name.
pub fn active_power_plan() -> Result<PowerPlanInfo> {
    let guid = read_active_scheme_guid()?;
    let name = read_friendly_name(&guid).unwrap_or_else(|_| "Unknown".to_string());
    Ok(PowerPlanInfo {
        guid: format_guid(&guid),
        name,
    })
}

/// All power schemes registered on the system.
pub fn list_power_plans() -> Result<Vec<PowerPlanInfo>> {
    let mut plans = Vec::new();
    let mut index = 0;

    while let Some(guid) = power_enumerate(index)? {
        let name =
            read_friendly_name(&guid).unwrap_or_else(|_| format!("Unknown Scheme {}", index));
        plans.push(PowerPlanInfo {
            guid: format_guid(&guid),
            name,
        });
        index += 1;
    }

    Ok(plans)
}

/// Activates the scheme identified by `guid`.
pub fn set_active_plan(guid: &str) -> Result<()> {
    let guid = parse_guid(guid)?;
    let result = unsafe { PowerSetActiveScheme(None, Some(&guid)) };
    if result != WIN32_ERROR(0) {
        return Err(anyhow!(
            "Failed to set active power scheme: WIN32_ERROR({})",
            result.0
        ));
    }
    Ok(())
}

/// Reads the AC value index of one power setting in the given scheme.
pub fn read_ac_value_index(scheme: &str, subgroup: &str, setting: &str) -> Result<u32> {
    let scheme = parse_guid(scheme)?;
    let subgroup = parse_guid(subgroup)?;
    let setting = parse_guid(setting)?;
    let mut value: u32 = 0;
    let result = unsafe {
        PowerReadACValueIndex(
            None,
            Some(&scheme as *const GUID),
            Some(&subgroup as *const GUID),
            Some(&setting as *const GUID),
            &mut value,
        )
    };
    if result != WIN32_ERROR(0) {
        return Err(anyhow!(
            "Failed to read AC value index: WIN32_ERROR({})",
            result.0
        ));
    }
    Ok(value)
}

/// Reads the DC value index of one power setting in the given scheme.
pub fn read_dc_value_index(scheme: &str, subgroup: &str, setting: &str) -> Result<u32> {
    let scheme = parse_guid(scheme)?;
    let subgroup = parse_guid(subgroup)?;
    let setting = parse_guid(setting)?;
    let mut value: u32 = 0;
    let result = unsafe {
        PowerReadDCValueIndex(
            None,
            Some(&scheme as *const GUID),
            Some(&subgroup as *const GUID),
            Some(&setting as *const GUID),
            &mut value,
        )
    };
    if result != WIN32_ERROR(0) {
        return Err(anyhow!(
            "Failed to read DC value index: WIN32_ERROR({})",
            result.0
        ));
    }
    Ok(value)
}

fn read_active_scheme_guid() -> Result<GUID> {
    let mut guid_pointer: *mut GUID = ptr::null_mut();
    let result = unsafe { PowerGetActiveScheme(None, &mut guid_pointer) };
    if result != WIN32_ERROR(0) || guid_pointer.is_null() {
        return Err(anyhow!(
            "Failed to read active power scheme: WIN32_ERROR({})",
            result.0
        ));
    }

    // The API allocates the GUID; wrap it so LocalFree always runs.
    let guard = LocalGuid { ptr: guid_pointer };
    let guid = unsafe { *guard.ptr };
    Ok(guid)
}

/// Enumerates the scheme at `index`, using the double-call buffer protocol.
/// `Ok(None)` once every scheme has been seen.
fn power_enumerate(index: u32) -> Result<Option<GUID>> {
    let mut buffer_size: u32 = 0;
    let result = unsafe {
        PowerEnumerate(
            None,
            None,
            None,
            ACCESS_SCHEME,
            index,
            None,
            &mut buffer_size,
        )
    };
    if result.0 == ERROR_NO_MORE_ITEMS.0 {
        return Ok(None);
    }
    // 234 is ERROR_MORE_DATA, expected on the sizing call.
    if result != WIN32_ERROR(0) && result != WIN32_ERROR(234) {
        return Err(anyhow!(
            "Failed to size power scheme buffer: WIN32_ERROR({})",
            result.0
        ));
    }

    if buffer_size < 16 {
        buffer_size = 16;
    }
    let mut buffer: Vec<u8> = vec![0; buffer_size as usize];
    let result = unsafe {
        PowerEnumerate(
            None,
            None,
            None,
            ACCESS_SCHEME,
            index,
            Some(buffer.as_mut_ptr()),
            &mut buffer_size,
        )
    };
    if result.0 == ERROR_NO_MORE_ITEMS.0 {
        return Ok(None);
    }
    if result != WIN32_ERROR(0) {
        return Err(anyhow!(
            "Failed to enumerate power schemes: WIN32_ERROR({})",
            result.0
        ));
    }

    Ok(Some(GUID {
        data1: u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]),
        data2: u16::from_le_bytes([buffer[4], buffer[5]]),
        data3: u16::from_le_bytes([buffer[6], buffer[7]]),
        data4: [
            buffer[8], buffer[9], buffer[10], buffer[11], buffer[12], buffer[13], buffer[14],
            buffer[15],
        ],
    }))
}

/// Friendly name of a scheme, again via the double-call protocol.
fn read_friendly_name(scheme: &GUID) -> Result<String> {
    let mut buffer_size: u32 = 0;
    let result = unsafe {
        PowerReadFriendlyName(None, Some(scheme), None, None, None, &mut buffer_size)
    };
    if result != WIN32_ERROR(0) && result != WIN32_ERROR(234) {
        return Err(anyhow!(
            "Failed to size friendly name buffer: WIN32_ERROR({})",
            result.0
        ));
    }

    if buffer_size < 2 {
        buffer_size = 2;
    }
    let mut buffer: Vec<u16> = vec![0; (buffer_size / 2) as usize];
    let result = unsafe {
        PowerReadFriendlyName(
            None,
            Some(scheme),
            None,
            None,
            Some(buffer.as_mut_ptr() as *mut u8),
            &mut buffer_size,
        )
    };
    if result != WIN32_ERROR(0) {
        return Err(anyhow!(
            "Failed to read friendly name: WIN32_ERROR({})",
            result.0
        ));
    }

    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    buffer.truncate(len);
    let name = U16String::from_vec(buffer).to_string_lossy();
    if name.is_empty() {
        Ok("Unknown".to_string())
    } else {
        Ok(name)
    }
}

struct LocalGuid {
    ptr: *mut GUID,
}

impl Drop for LocalGuid {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                let _ = LocalFree(HLOCAL(self.ptr as *mut _));
            }
        }
    }
}
