//! Display effects used to draw path points for an agent.
//!
//! The set of effects is closed. Some of them need extra parameters (a block
//! type, a colour, an item) that the single-point renderer cannot supply, so
//! they are known but not renderable. [`resolve_display_effect`] maps any
//! requested name onto something the renderer can draw.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every display effect the tracker knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayEffect {
    HappyVillager,
    Heart,
    Crit,
    Flame,
    SoulFireFlame,
    EndRod,
    Note,
    Cloud,
    Portal,
    Enchant,
    WaxOn,
    Glow,
    // Parameterised effects below: known, never renderable.
    Block,
    BlockMarker,
    Dust,
    DustPillar,
    ElderGuardian,
    Item,
    ItemCobweb,
    ItemSlime,
    ItemSnowball,
}

impl DisplayEffect {
    /// The effect substituted whenever a requested one cannot be drawn.
    pub const DEFAULT: DisplayEffect = DisplayEffect::HappyVillager;

    pub const ALL: [DisplayEffect; 21] = [
        DisplayEffect::HappyVillager,
        DisplayEffect::Heart,
        DisplayEffect::Crit,
        DisplayEffect::Flame,
        DisplayEffect::SoulFireFlame,
        DisplayEffect::EndRod,
        DisplayEffect::Note,
        DisplayEffect::Cloud,
        DisplayEffect::Portal,
        DisplayEffect::Enchant,
        DisplayEffect::WaxOn,
        DisplayEffect::Glow,
        DisplayEffect::Block,
        DisplayEffect::BlockMarker,
        DisplayEffect::Dust,
        DisplayEffect::DustPillar,
        DisplayEffect::ElderGuardian,
        DisplayEffect::Item,
        DisplayEffect::ItemCobweb,
        DisplayEffect::ItemSlime,
        DisplayEffect::ItemSnowball,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayEffect::HappyVillager => "happy_villager",
            DisplayEffect::Heart => "heart",
            DisplayEffect::Crit => "crit",
            DisplayEffect::Flame => "flame",
            DisplayEffect::SoulFireFlame => "soul_fire_flame",
            DisplayEffect::EndRod => "end_rod",
            DisplayEffect::Note => "note",
            DisplayEffect::Cloud => "cloud",
            DisplayEffect::Portal => "portal",
            DisplayEffect::Enchant => "enchant",
            DisplayEffect::WaxOn => "wax_on",
            DisplayEffect::Glow => "glow",
            DisplayEffect::Block => "block",
            DisplayEffect::BlockMarker => "block_marker",
            DisplayEffect::Dust => "dust",
            DisplayEffect::DustPillar => "dust_pillar",
            DisplayEffect::ElderGuardian => "elder_guardian",
            DisplayEffect::Item => "item",
            DisplayEffect::ItemCobweb => "item_cobweb",
            DisplayEffect::ItemSlime => "item_slime",
            DisplayEffect::ItemSnowball => "item_snowball",
        }
    }

    /// Whether the effect can be drawn without extra parameters.
    pub fn is_renderable(&self) -> bool {
        !matches!(
            self,
            DisplayEffect::Block
                | DisplayEffect::BlockMarker
                | DisplayEffect::Dust
                | DisplayEffect::DustPillar
                | DisplayEffect::ElderGuardian
                | DisplayEffect::Item
                | DisplayEffect::ItemCobweb
                | DisplayEffect::ItemSlime
                | DisplayEffect::ItemSnowball
        )
    }

    /// All effects that may be assigned to a path.
    pub fn renderable() -> impl Iterator<Item = DisplayEffect> {
        Self::ALL.into_iter().filter(|effect| effect.is_renderable())
    }
}

impl Default for DisplayEffect {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for DisplayEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name matches no known effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown display effect '{0}'")]
pub struct UnknownEffect(pub String);

impl FromStr for DisplayEffect {
    type Err = UnknownEffect;

    /// Accepts `snake_case` and `SCREAMING_SNAKE_CASE` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|effect| effect.as_str() == wanted)
            .ok_or_else(|| UnknownEffect(s.to_string()))
    }
}

/// Maps a requested effect name onto a renderable effect.
///
/// Returns the effect to use and whether the safe default had to be
/// substituted (unknown name or parameterised effect).
pub fn resolve_display_effect(requested: &str) -> (DisplayEffect, bool) {
    match requested.parse::<DisplayEffect>() {
        Ok(effect) if effect.is_renderable() => (effect, false),
        _ => (DisplayEffect::DEFAULT, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_effect() {
        assert_eq!(resolve_display_effect("flame"), (DisplayEffect::Flame, false));
        assert_eq!(resolve_display_effect("END_ROD"), (DisplayEffect::EndRod, false));
    }

    #[test]
    fn test_resolve_unknown_effect_falls_back() {
        assert_eq!(
            resolve_display_effect("rainbow_sparkles"),
            (DisplayEffect::DEFAULT, true)
        );
        assert_eq!(resolve_display_effect(""), (DisplayEffect::DEFAULT, true));
    }

    #[test]
    fn test_resolve_parameterised_effect_falls_back() {
        for name in ["block", "DUST", "item_slime", "elder_guardian"] {
            assert_eq!(resolve_display_effect(name), (DisplayEffect::DEFAULT, true), "{name}");
        }
    }

    #[test]
    fn test_default_is_renderable() {
        assert!(DisplayEffect::DEFAULT.is_renderable());
    }

    #[test]
    fn test_every_name_parses_back() {
        for effect in DisplayEffect::ALL {
            assert_eq!(effect.as_str().parse::<DisplayEffect>(), Ok(effect));
        }
        assert_eq!(DisplayEffect::renderable().count(), 12);
    }

    #[test]
    fn test_unknown_name_reports_error() {
        let err = " rainbow ".parse::<DisplayEffect>().unwrap_err();
        assert_eq!(err, UnknownEffect(" rainbow ".to_string()));
        assert_eq!(err.to_string(), "unknown display effect ' rainbow '");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
