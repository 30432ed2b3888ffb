//! World hotspots and the flag rules that pick their scenes.

use neocity_story::FlagStore;

/// Flag raised once the jukebox track is stitched back together
pub const JUKEBOX_FIXED: &str = "jukeboxFixed";
/// Flag raised once the neon sign circuit is repaired
pub const SIGN_FIXED: &str = "signFixed";

/// Something the player can look at in the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotspot {
    Jukebox,
    Sign,
    Kael,
    Archive,
}

impl Hotspot {
    pub const ALL: [Hotspot; 4] = [Hotspot::Jukebox, Hotspot::Sign, Hotspot::Kael, Hotspot::Archive];

    pub fn name(&self) -> &'static str {
        match self {
            Hotspot::Jukebox => "jukebox",
            Hotspot::Sign => "sign",
            Hotspot::Kael => "kael",
            Hotspot::Archive => "archive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|h| h.name() == s)
    }

    /// Scene this hotspot opens, given the current flags.
    /// `start` is the story's entry scene, used by the archive terminal.
    pub fn scene_for(&self, flags: &FlagStore, start: &str) -> String {
        let scene = match self {
            Hotspot::Jukebox if flags.is_set(JUKEBOX_FIXED) => "jukebox_revisit",
            Hotspot::Jukebox => "puzzle_jukebox",
            Hotspot::Sign if flags.is_set(SIGN_FIXED) => "sign_revisit",
            Hotspot::Sign => "puzzle_sign",
            Hotspot::Kael if flags.all_set(&[JUKEBOX_FIXED, SIGN_FIXED]) => "puzzle_kael_final",
            Hotspot::Kael => "puzzle_kael_talk",
            Hotspot::Archive => start,
        };
        scene.to_string()
    }
}
