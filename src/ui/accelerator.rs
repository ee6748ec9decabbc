//! Accelerator encoding for the config file.
//!
//! An accelerator is a modifier mask plus a key symbol. They are persisted as two
//! separate entries: the mask as an integer and the key as its symbolic name.
//! Older config files stored the key as a plain integer keycode, so decoding falls
//! back to that form before giving up and leaving the key unbound.

use bitflags::bitflags;
use tracing::warn;

use super::keysym::Keysym;
use crate::config::store::ConfigStore;

bitflags! {
    /// Modifier state, with the bit layout the windowing layer reports
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModifierMask: u32 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD3    = 1 << 5;
        const MOD4    = 1 << 6;
        const MOD5    = 1 << 7;
        const SUPER   = 1 << 26;
        const HYPER   = 1 << 27;
        const META    = 1 << 28;
    }
}

impl ModifierMask {
    /// Mask as stored in the config file
    pub fn to_config(self) -> i64 {
        i64::from(self.bits())
    }

    /// Mask from a stored integer, keeping unknown bits. Out-of-range values are rejected.
    pub fn from_config(value: i64) -> Option<Self> {
        u32::try_from(value).ok().map(Self::from_bits_retain)
    }

    /// Every bit in `self` is also held in `state`. Extra modifiers in `state`
    /// (Num Lock and friends) do not prevent a match.
    pub fn is_held_in(self, state: ModifierMask) -> bool {
        state & self == self
    }
}

/// A modifier mask plus key symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub mask: ModifierMask,
    pub key: Keysym,
}

impl Accelerator {
    pub const fn new(mask: ModifierMask, key: Keysym) -> Self {
        Self { mask, key }
    }

    /// Whether a key event with `state` and `key` triggers this accelerator
    pub fn matches(&self, state: ModifierMask, key: Keysym) -> bool {
        !self.key.is_void() && self.mask.is_held_in(state) && self.key == key
    }
}

/// A key entry as it appears in the file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredKey {
    /// Symbolic key name, the current format
    Symbolic(String),
    /// Integer keycode from older config files
    Legacy(i64),
}

impl StoredKey {
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(StoredKey::Symbolic(s.clone())),
            toml::Value::Integer(i) => Some(StoredKey::Legacy(*i)),
            _ => None,
        }
    }
}

/// An accelerator in its persisted form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedAccelerator {
    pub key: String,
    pub mask: i64,
}

/// Encode an accelerator. The key is always written symbolically.
pub fn encode(accel: &Accelerator) -> EncodedAccelerator {
    EncodedAccelerator {
        key: accel.key.name(),
        mask: accel.mask.to_config(),
    }
}

/// Resolve a stored key: name first, then integer keycode, else unbound
pub fn decode_key(raw: &StoredKey) -> Keysym {
    let resolved = match raw {
        StoredKey::Symbolic(name) => Keysym::from_name(name.trim())
            .or_else(|| name.trim().parse::<i64>().ok().and_then(keysym_from_code)),
        StoredKey::Legacy(code) => keysym_from_code(*code),
    };

    match resolved {
        Some(key) if key.0 != 0 => key,
        _ => Keysym::VOID,
    }
}

/// Decode a stored key and mask. An out-of-range mask decodes as no modifiers.
pub fn decode(raw: &StoredKey, mask: i64) -> Accelerator {
    Accelerator {
        mask: ModifierMask::from_config(mask).unwrap_or_default(),
        key: decode_key(raw),
    }
}

fn keysym_from_code(code: i64) -> Option<Keysym> {
    u32::try_from(code).ok().map(Keysym)
}

/// Write a key entry in symbolic form
pub fn store_key(store: &mut ConfigStore, key: &str, keysym: Keysym) {
    let encoded = encode(&Accelerator::new(ModifierMask::empty(), keysym));
    store.set(key, encoded.key);
}

/// Stored form of a key entry, writing `default` first if absent
fn read_key(store: &mut ConfigStore, key: &str, default: Keysym) -> StoredKey {
    if !store.contains(key) {
        store_key(store, key, default);
    }

    store.raw(key).and_then(StoredKey::from_toml).unwrap_or_else(|| {
        warn!("Key '{}' has an unsupported value type, leaving it unbound", key);
        StoredKey::Legacy(0)
    })
}

/// Stored mask value, writing `default` first if absent. An unusable value is
/// replaced by `default` in the store.
fn read_mask(store: &mut ConfigStore, key: &str, default: ModifierMask) -> i64 {
    store.set_default_if_absent(key, default.to_config());

    match store.get_integer(key) {
        Ok(value) if ModifierMask::from_config(value).is_some() => return value,
        Ok(value) => warn!("Modifier mask '{}' out of range ({}), using default", key, value),
        Err(e) => warn!("{}, using default", e),
    }
    store.set(key, default.to_config());
    default.to_config()
}

/// Read an accelerator kept as a mask entry plus a key entry
pub fn load_accelerator(
    store: &mut ConfigStore,
    mask_key: &str,
    key_key: &str,
    default: Accelerator,
) -> Accelerator {
    let mask = read_mask(store, mask_key, default.mask);
    let raw = read_key(store, key_key, default.key);
    let accel = decode(&raw, mask);
    if accel.key.is_void() {
        warn!("Key '{}' does not name a key, leaving it unbound", key_key);
    }
    accel
}

/// Read a key entry, writing `default` first if absent
pub fn load_key(store: &mut ConfigStore, key: &str, default: Keysym) -> Keysym {
    let keysym = decode_key(&read_key(store, key, default));
    if keysym.is_void() {
        warn!("Key '{}' does not name a key, leaving it unbound", key);
    }
    keysym
}

/// Read a modifier mask entry, writing `default` first if absent
pub fn load_mask(store: &mut ConfigStore, key: &str, default: ModifierMask) -> ModifierMask {
    ModifierMask::from_config(read_mask(store, key, default)).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL_SHIFT: ModifierMask = ModifierMask::CONTROL.union(ModifierMask::SHIFT);

    #[test]
    fn test_round_trip() {
        let accels = [
            Accelerator::new(CTRL_SHIFT, Keysym::from_ascii(b'C')),
            Accelerator::new(ModifierMask::CONTROL, Keysym::PLUS),
            Accelerator::new(ModifierMask::MOD1 | ModifierMask::SUPER, Keysym(0xffbe)),
            Accelerator::new(ModifierMask::empty(), Keysym(0x0100_20ac)),
            Accelerator::new(ModifierMask::from_bits_retain(1 << 13), Keysym(0x1234)),
            Accelerator::new(CTRL_SHIFT, Keysym::VOID),
            Accelerator::new(ModifierMask::CONTROL, Keysym(0x0100_0041)),
            Accelerator::new(ModifierMask::empty(), Keysym(0x0100_00e9)),
        ];

        for accel in accels {
            let encoded = encode(&accel);
            let decoded = decode(&StoredKey::Symbolic(encoded.key), encoded.mask);
            assert_eq!(decoded, accel);
        }
    }

    #[test]
    fn test_legacy_integer_matches_symbolic() {
        let from_string = decode_key(&StoredKey::Symbolic("16777215".into()));
        let from_name = decode_key(&StoredKey::Symbolic("VoidSymbol".into()));
        assert_eq!(from_string, from_name);

        let legacy = decode_key(&StoredKey::Legacy(0x43));
        assert_eq!(legacy, decode_key(&StoredKey::Symbolic("C".into())));
        assert_eq!(decode_key(&StoredKey::Symbolic("67".into())), legacy);
    }

    #[test]
    fn test_unresolvable_is_unbound() {
        assert_eq!(decode_key(&StoredKey::Symbolic("NoSuchKey".into())), Keysym::VOID);
        assert_eq!(decode_key(&StoredKey::Legacy(0)), Keysym::VOID);
        assert_eq!(decode_key(&StoredKey::Legacy(-5)), Keysym::VOID);
    }

    #[test]
    fn test_masking_allows_extra_modifiers() {
        let accel = Accelerator::new(CTRL_SHIFT, Keysym::from_ascii(b'C'));
        let with_numlock = CTRL_SHIFT | ModifierMask::MOD2;

        assert!(accel.matches(with_numlock, Keysym::from_ascii(b'C')));
        assert!(!accel.matches(ModifierMask::CONTROL, Keysym::from_ascii(b'C')));
        assert!(!accel.matches(CTRL_SHIFT, Keysym::from_ascii(b'V')));
    }

    #[test]
    fn test_unbound_never_matches() {
        let accel = Accelerator::new(ModifierMask::empty(), Keysym::VOID);
        assert!(!accel.matches(ModifierMask::empty(), Keysym::VOID));
    }

    #[test]
    fn test_load_writes_symbolic_defaults() {
        let mut store = ConfigStore::new();
        let key = load_key(&mut store, "copy_key", Keysym::from_ascii(b'C'));
        let mask = load_mask(&mut store, "copy_accelerator", CTRL_SHIFT);

        assert_eq!(key, Keysym::from_ascii(b'C'));
        assert_eq!(mask, CTRL_SHIFT);
        assert_eq!(store.get_string("copy_key").unwrap(), "C");
        assert_eq!(store.get_integer("copy_accelerator").unwrap(), 5);
    }

    #[test]
    fn test_load_accelerator_pairs_mask_and_key() {
        let mut store = ConfigStore::new();
        store.set("copy_accelerator", 12_i64);
        store.set("copy_key", "F1");

        let default = Accelerator::new(CTRL_SHIFT, Keysym::from_ascii(b'C'));
        let accel = load_accelerator(&mut store, "copy_accelerator", "copy_key", default);
        let ctrl_alt = ModifierMask::CONTROL | ModifierMask::MOD1;
        assert_eq!(accel, Accelerator::new(ctrl_alt, Keysym(0xffbe)));

        let mut empty = ConfigStore::new();
        let accel = load_accelerator(&mut empty, "copy_accelerator", "copy_key", default);
        assert_eq!(accel, default);
        assert_eq!(empty.get_string("copy_key").unwrap(), "C");
        assert_eq!(empty.get_integer("copy_accelerator").unwrap(), 5);
    }

    #[test]
    fn test_bad_mask_is_replaced_by_default() {
        let mut store = ConfigStore::new();
        store.set("scrollbar_accelerator", -1_i64);
        store.set("font_size_accelerator", "Control");

        let mask = load_mask(&mut store, "scrollbar_accelerator", CTRL_SHIFT);
        assert_eq!(mask, CTRL_SHIFT);
        assert_eq!(store.get_integer("scrollbar_accelerator").unwrap(), 5);

        let mask = load_mask(&mut store, "font_size_accelerator", ModifierMask::CONTROL);
        assert_eq!(mask, ModifierMask::CONTROL);
        assert_eq!(store.get_integer("font_size_accelerator").unwrap(), 4);
    }

    #[test]
    fn test_load_reads_legacy_integer_entry() {
        let mut store = ConfigStore::new();
        store.set("paste_key", 0x56_i64);
        assert_eq!(
            load_key(&mut store, "paste_key", Keysym::from_ascii(b'X')),
            Keysym::from_ascii(b'V')
        );
    }
}
