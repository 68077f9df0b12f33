//! Image search endpoints.

mod sticker;

pub use sticker::{parse_packs, search_url, StickerPack, StickerSearch, STICKER_BASE_URL};
