//! Interface identifier decomposition

use crate::error::{Error, Result};
use crate::ir::{DeclFile, GuidParts};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GUID_PATTERN: Regex = Regex::new(
        r"^([0-9a-fA-F]{8})-([0-9a-fA-F]{4})-([0-9a-fA-F]{4})-([0-9a-fA-F]{4})-([0-9a-fA-F]{12})$"
    )
    .expect("GUID pattern is valid");
}

/// Splits a canonical `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX` identifier into
/// its 32-bit, 16-bit, 16-bit and 8-byte components
pub fn parse_guid(text: &str) -> Result<GuidParts> {
    let invalid = || Error::invariant("GUID", format!("`{}` is not a canonical GUID", text));
    let caps = GUID_PATTERN.captures(text).ok_or_else(invalid)?;

    let data1 = u32::from_str_radix(&caps[1], 16).map_err(|_| invalid())?;
    let data2 = u16::from_str_radix(&caps[2], 16).map_err(|_| invalid())?;
    let data3 = u16::from_str_radix(&caps[3], 16).map_err(|_| invalid())?;

    let mut data4 = [0u8; 8];
    let tail = format!("{}{}", &caps[4], &caps[5]);
    hex::decode_to_slice(tail, &mut data4).map_err(|_| invalid())?;

    Ok(GuidParts {
        data1,
        data2,
        data3,
        data4,
    })
}

/// Decomposes the GUID of every struct that carries one
pub(super) fn decompose_guids(file: &mut DeclFile) -> Result<()> {
    for s in &mut file.structs {
        if let Some(guid) = &s.guid {
            s.guid_parts = Some(parse_guid(guid)?);
        }
    }
    Ok(())
}
