pub const BITMAP_HEADER_LENGTH: usize = 16;
pub const TILE_RECORD_HEADER_LENGTH: usize = 8;
pub const PALETTE_SLOTS: usize = 256;

pub(crate) const BMP_TYPE_INDEXED: u16 = 0x01;
pub(crate) const BMP_TYPE_PEH: u16 = 0x03;
pub(crate) const BMP_TYPE_RGB: u16 = 0x08;
pub(crate) const BMP_TYPE_RGBA: u16 = 0x0B;
pub(crate) const BMP_TYPE_HEP: u16 = 0x0C;

pub(crate) const OFFSET_WIDTH: usize = 0;
pub(crate) const OFFSET_HEIGHT: usize = 2;
pub(crate) const OFFSET_TILE_WIDTH: usize = 4;
pub(crate) const OFFSET_TILE_HEIGHT: usize = 6;
pub(crate) const OFFSET_TILE_X_COUNT: usize = 8;
pub(crate) const OFFSET_TILE_Y_COUNT: usize = 10;
pub(crate) const OFFSET_BMP_TYPE: usize = 12;
pub(crate) const OFFSET_BMP_DEPTH: usize = 14;
pub(crate) const OFFSET_TILE_CROP: usize = 15;

// Block-swizzled palette geometry: 0x80-byte blocks of four 0x20-byte
// sub-blocks, 8 four-byte entries per sub-block.
pub(crate) const PALETTE_ENTRY_LENGTH: usize = 4;
pub(crate) const PALETTE_BLOCK_LENGTH: usize = 0x80;
pub(crate) const PALETTE_SUB_BLOCK_LENGTH: usize = 0x20;
pub(crate) const PALETTE_SUB_BLOCK_ENTRIES: usize = 8;

pub(crate) const HEP_HEADER_LENGTH: usize = 32;
pub(crate) const HEP_PALETTE_LENGTH: usize = PALETTE_SLOTS * PALETTE_ENTRY_LENGTH;
