//! Light identities and bitmask helpers shared by firmware and host targets.
//!
//! Each light maps to one output of the 74HC595 shift register that drives the
//! start tower. The bit values encode that wiring, so the set is closed and
//! fixed at build time.

use core::fmt;

/// Number of physical lights wired to the shift register.
pub const LIGHT_COUNT: usize = 7;

/// Physical light on the start tower, valued by its shift-register bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Light {
    White = 0x80,
    Red = 0x40,
    Yellow1 = 0x20,
    Blue = 0x10,
    Yellow2 = 0x08,
    Green = 0x04,
    Yellow3 = 0x02,
}

impl Light {
    /// Returns the bit this light occupies in a [`LightMask`].
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Deterministic index for lookups into [`ALL_LIGHTS`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Light::White => 0,
            Light::Red => 1,
            Light::Yellow1 => 2,
            Light::Blue => 3,
            Light::Yellow2 => 4,
            Light::Green => 5,
            Light::Yellow3 => 6,
        }
    }

    /// Attempts to construct a [`Light`] from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Light::White),
            1 => Some(Light::Red),
            2 => Some(Light::Yellow1),
            3 => Some(Light::Blue),
            4 => Some(Light::Yellow2),
            5 => Some(Light::Green),
            6 => Some(Light::Yellow3),
            _ => None,
        }
    }

    /// Looks a light up by its catalog name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_LIGHTS
            .iter()
            .find(|line| line.name.eq_ignore_ascii_case(name))
            .map(|line| line.light)
    }

    /// Returns the wiring metadata for this light.
    #[must_use]
    pub const fn line(self) -> LightLine {
        ALL_LIGHTS[self.as_index()]
    }

    /// Short lowercase label used by the console and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.line().name
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested state for a light. `Toggle` is a command, never a stored state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightState {
    Off,
    On,
    Toggle,
}

impl LightState {
    /// Builds an `On`/`Off` state from a boolean.
    #[must_use]
    pub const fn from_on(on: bool) -> Self {
        if on { LightState::On } else { LightState::Off }
    }

    /// Resolves `Toggle` against the current state. `On`/`Off` pass through.
    #[must_use]
    pub const fn resolve(self, currently_on: bool) -> bool {
        match self {
            LightState::On => true,
            LightState::Off => false,
            LightState::Toggle => !currently_on,
        }
    }

    /// Parses `on`, `off` or `toggle`, ignoring ASCII case.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("on") {
            Some(LightState::On)
        } else if keyword.eq_ignore_ascii_case("off") {
            Some(LightState::Off)
        } else if keyword.eq_ignore_ascii_case("toggle") {
            Some(LightState::Toggle)
        } else {
            None
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LightState::Off => "off",
            LightState::On => "on",
            LightState::Toggle => "toggle",
        })
    }
}

/// Metadata describing how a light is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LightLine {
    pub light: Light,
    pub name: &'static str,
    /// 74HC595 parallel output driving the lamp.
    pub output: &'static str,
}

impl LightLine {
    #[must_use]
    pub const fn new(light: Light, name: &'static str, output: &'static str) -> Self {
        Self {
            light,
            name,
            output,
        }
    }
}

/// Compile-time catalog of every light, ordered by [`Light::as_index`].
pub const ALL_LIGHTS: [LightLine; LIGHT_COUNT] = [
    LightLine::new(Light::White, "white", "Q7"),
    LightLine::new(Light::Red, "red", "Q6"),
    LightLine::new(Light::Yellow1, "yellow1", "Q5"),
    LightLine::new(Light::Blue, "blue", "Q4"),
    LightLine::new(Light::Yellow2, "yellow2", "Q3"),
    LightLine::new(Light::Green, "green", "Q2"),
    LightLine::new(Light::Yellow3, "yellow3", "Q1"),
];

/// Fault light lit for each dog, indexed by zero-based running order.
pub const DOG_FAULT_LIGHTS: [Light; 4] = [Light::Red, Light::Blue, Light::Yellow2, Light::Green];

/// Returns the fault light assigned to `dog`, if the index is wired.
#[must_use]
pub fn fault_light_for(dog: usize) -> Option<Light> {
    DOG_FAULT_LIGHTS.get(dog).copied()
}

/// Combined on/off state of every light, one bit per [`Light`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct LightMask(u8);

impl LightMask {
    /// Mask with every light off.
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` when `light` is lit in this mask.
    #[must_use]
    pub const fn contains(self, light: Light) -> bool {
        self.0 & light.bit() == light.bit()
    }

    /// Returns a copy with `light` switched on.
    #[must_use]
    pub const fn with(self, light: Light) -> Self {
        Self(self.0 | light.bit())
    }

    /// Returns a copy with `light` switched off.
    #[must_use]
    pub const fn without(self, light: Light) -> Self {
        Self(self.0 & !light.bit())
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the lights lit in this mask, in catalog order.
    pub fn lit(self) -> impl Iterator<Item = Light> {
        ALL_LIGHTS
            .iter()
            .map(|line| line.light)
            .filter(move |light| self.contains(*light))
    }
}

impl fmt::Display for LightMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_bits_never_overlap() {
        let mut seen = 0u8;
        for line in &ALL_LIGHTS {
            let bit = line.light.bit();
            assert_eq!(bit.count_ones(), 1, "{} is not a single bit", line.name);
            assert_eq!(seen & bit, 0, "{} overlaps another light", line.name);
            seen |= bit;
        }
    }

    #[test]
    fn catalog_order_matches_indices() {
        for (index, line) in ALL_LIGHTS.iter().enumerate() {
            assert_eq!(line.light.as_index(), index);
            assert_eq!(Light::from_index(index), Some(line.light));
        }
        assert_eq!(Light::from_index(LIGHT_COUNT), None);
    }

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(Light::from_name("GREEN"), Some(Light::Green));
        assert_eq!(Light::from_name("yellow3"), Some(Light::Yellow3));
        assert_eq!(Light::from_name("amber"), None);
        assert_eq!(Light::Blue.line().output, "Q4");
    }

    #[test]
    fn mask_set_and_clear_use_bit_operations() {
        let mask = LightMask::EMPTY.with(Light::Red).with(Light::Green);
        assert_eq!(mask.bits(), 0x44);
        assert!(mask.contains(Light::Red));

        // Clearing an unlit light must not borrow from a neighbouring bit.
        let cleared = mask.without(Light::Blue).without(Light::Red);
        assert_eq!(cleared.bits(), 0x04);

        let lit: heapless::Vec<Light, LIGHT_COUNT> = mask.lit().collect();
        assert_eq!(lit.as_slice(), &[Light::Red, Light::Green]);
    }

    #[test]
    fn toggle_resolves_against_current_state() {
        assert!(LightState::Toggle.resolve(false));
        assert!(!LightState::Toggle.resolve(true));
        assert!(LightState::On.resolve(true));
        assert!(!LightState::Off.resolve(true));
    }

    #[test]
    fn dog_fault_table_is_bounded() {
        assert_eq!(fault_light_for(0), Some(Light::Red));
        assert_eq!(fault_light_for(3), Some(Light::Green));
        assert_eq!(fault_light_for(4), None);
    }
}
