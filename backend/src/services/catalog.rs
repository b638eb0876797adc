use std::fmt;
use std::path::{Path, PathBuf};
use sha1::{Digest, Sha1};
use upgrade_shared::shared_upgrade_game::{Item, Price, Rarity};

pub const WEAPONS: [&str; 20] = [
    "AK-47", "M4A1-S", "Glock-18", "USP-S", "Desert Eagle", "AWP", "MAC-10", "MP7", "MP9",
    "Nova", "PP-Bizon", "SG 553", "Tec-9", "UMP-45", "XM1014", "Galil AR", "P250", "Sawed-Off",
    "FAMAS", "MAG-7",
];

// Prices land in 0.10..=4.00
const MIN_PRICE_CENTS: u64 = 10;
const PRICE_SPREAD_CENTS: u32 = 391;

const DEFAULT_CATALOG: &[&str] = &[
    "ak-47_redline.png",
    "awp_asiimov.png",
    "m4a1-s_hyper_beast.png",
    "glock-18_water_elemental.png",
    "usp-s_kill_confirmed.png",
    "desert_eagle_blaze.png",
    "mac-10_neon_rider.png",
    "mp9_starlight_protector.png",
    "p250_see_ya_later.png",
    "famas_commemoration.png",
    "nova_hyper_beast.png",
    "recoil_case.png",
];

#[derive(Debug)]
pub enum CatalogError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "Failed to read catalog {:?}: {}", path, source),
            Self::Parse { path, source } => write!(f, "Catalog {:?} is not a JSON array of names: {}", path, source),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Loads the item catalog from a JSON array of entry names, or the built-in
/// list when no path is configured.
pub fn load(path: Option<&Path>) -> Result<Vec<Item>, CatalogError> {
    let names = match path {
        Some(path) => read_names(path)?,
        None => DEFAULT_CATALOG.iter().map(|name| name.to_string()).collect(),
    };
    Ok(build_items(&names))
}

fn read_names(path: &Path) -> Result<Vec<String>, CatalogError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| CatalogError::Parse { path: path.to_path_buf(), source })
}

pub fn build_items(names: &[String]) -> Vec<Item> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| item_from_name(index, name))
        .collect()
}

/// Derives a stable item from its entry name: the same name always yields the
/// same weapon, rarity and price.
pub fn item_from_name(index: usize, base: &str) -> Item {
    let hash = stable_hash(base);

    Item {
        id: format!("it-{}-{}", index, base),
        name: title_case(base),
        weapon: WEAPONS[(hash % WEAPONS.len() as u32) as usize].to_string(),
        rarity: Rarity::from_index(hash),
        price: Price::from_cents(MIN_PRICE_CENTS + (hash % PRICE_SPREAD_CENTS) as u64),
        img: format!("/articulos/{}", base),
    }
}

/// Splits the catalog into the starting user and site inventories. The user
/// gets the first half (at least one item). An empty catalog falls back to
/// one default item per side.
pub fn initial_inventories(mut items: Vec<Item>) -> (Vec<Item>, Vec<Item>) {
    if items.is_empty() {
        return (vec![fallback_user_item()], vec![fallback_site_item()]);
    }
    let split = (items.len() / 2).max(1);
    let site = items.split_off(split);
    (items, site)
}

fn fallback_user_item() -> Item {
    Item {
        id: "fallback-1".to_string(),
        name: "Default".to_string(),
        weapon: "Glock-18".to_string(),
        rarity: Rarity::FieldTested,
        price: Price::from_cents(20),
        img: "/articulos/default.png".to_string(),
    }
}

fn fallback_site_item() -> Item {
    Item {
        id: "fallback-2".to_string(),
        name: "Recoil Case".to_string(),
        weapon: "Case".to_string(),
        rarity: Rarity::MinimalWear,
        price: Price::from_cents(41),
        img: "/articulos/recoil_case.png".to_string(),
    }
}

/// Magnitude of the first four SHA-1 bytes read as a signed big-endian int.
fn stable_hash(value: &str) -> u32 {
    let digest = Sha1::digest(value.as_bytes());
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]).unsigned_abs()
}

/// `"ak-47_redline.png"` -> `"Ak 47 Redline"`
pub fn title_case(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(dot)
            if dot + 1 < file_name.len()
                && file_name[dot + 1..].chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            &file_name[..dot]
        }
        _ => file_name,
    };

    let spaced = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut titled = String::with_capacity(spaced.len());
    let mut previous_is_word = false;
    for c in spaced.chars() {
        if !previous_is_word && c.is_ascii_lowercase() {
            titled.push(c.to_ascii_uppercase());
        } else {
            titled.push(c);
        }
        previous_is_word = c.is_ascii_alphanumeric();
    }
    titled
}
