use rust_embed::RustEmbed;
use std::borrow::Cow;

/// Campaign levels compiled into the binary.
#[derive(RustEmbed)]
#[folder = "levels/"]
pub struct LevelAssets;

pub fn level_file_name(number: usize) -> String {
    format!("level{}.txt", number)
}

pub fn get_level_bytes(number: usize) -> Option<Cow<'static, [u8]>> {
    LevelAssets::get(&level_file_name(number)).map(|f| f.data)
}

/// Number of consecutive embedded levels starting at level 1.
pub fn embedded_level_count() -> usize {
    (1..).take_while(|n| LevelAssets::get(&level_file_name(*n)).is_some()).count()
}
