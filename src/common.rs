use crate::{MzpError, MzpErrorCode, Result};

pub(crate) fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16> {
    let value_bytes = bytes.get(offset..offset + 2).ok_or_else(|| {
        MzpError::new(
            MzpErrorCode::InvalidHeader,
            "Could not read u16 field.",
        )
    })?;
    let arr: [u8; 2] = value_bytes.try_into().map_err(|_| {
        MzpError::new(
            MzpErrorCode::InvalidHeader,
            "Could not parse u16 field bytes.",
        )
    })?;
    Ok(u16::from_le_bytes(arr))
}

pub(crate) fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32> {
    let value_bytes = bytes.get(offset..offset + 4).ok_or_else(|| {
        MzpError::new(
            MzpErrorCode::InvalidHeader,
            "Could not read u32 field.",
        )
    })?;
    let arr: [u8; 4] = value_bytes.try_into().map_err(|_| {
        MzpError::new(
            MzpErrorCode::InvalidHeader,
            "Could not parse u32 field bytes.",
        )
    })?;
    Ok(u32::from_le_bytes(arr))
}
