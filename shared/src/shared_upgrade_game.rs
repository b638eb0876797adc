use std::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumCount, EnumString, FromRepr};
use crate::constants::*;

/// Wear tier of a skin, serialized with its short market code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumCount, FromRepr)]
#[repr(u8)]
pub enum Rarity {
    #[serde(rename = "FN")]
    #[strum(serialize = "FN")]
    FactoryNew,
    #[serde(rename = "MW")]
    #[strum(serialize = "MW")]
    MinimalWear,
    #[serde(rename = "FT")]
    #[strum(serialize = "FT")]
    FieldTested,
    #[serde(rename = "WW")]
    #[strum(serialize = "WW")]
    WellWorn,
    #[serde(rename = "BS")]
    #[strum(serialize = "BS")]
    BattleScarred,
}

impl Rarity {
    /// Maps any index onto a tier, wrapping around.
    pub fn from_index(index: u32) -> Self {
        Self::from_repr((index % Self::COUNT as u32) as u8).unwrap_or(Self::FieldTested)
    }
}

/// Non-negative currency amount stored as whole cents.
///
/// On the wire it is a plain JSON number with two decimals (`0.41`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Rounds to the nearest cent. Negative or non-finite amounts are rejected.
    pub fn from_amount(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        Some(Self((amount * 100.0).round() as u64))
    }

    pub fn as_amount(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_amount())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_amount(amount)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid price {}", amount)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub weapon: String,
    pub rarity: Rarity,
    pub price: Price,
    pub img: String,
}

/// The two owners an item can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    User,
    Site,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::User => Side::Site,
            Side::Site => Side::User,
        }
    }
}

/// Win chance in percent for staking `user_items` against `site_items`.
///
/// Returns 0 when either side totals nothing. Otherwise the ratio of totals
/// times 100 is floored to hundredths and clamped to `[1, 80]`. Totals are in
/// cents, so the floor is exact.
pub fn compute_chance<'a, U, S>(user_items: U, site_items: S) -> f64
where
    U: IntoIterator<Item = &'a Item>,
    S: IntoIterator<Item = &'a Item>,
{
    let user_total: u64 = user_items.into_iter().map(|item| item.price.cents()).sum();
    let site_total: u64 = site_items.into_iter().map(|item| item.price.cents()).sum();
    if user_total == 0 || site_total == 0 {
        return 0.0;
    }

    let hundredths = (user_total as u128 * 10_000 / site_total as u128)
        .min(u64::MAX as u128) as u64;
    hundredths.clamp(MIN_CHANCE_HUNDREDTHS, MAX_CHANCE_HUNDREDTHS) as f64 / 100.0
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// === API Types ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub site_inventory: Vec<Item>,
    pub user_inventory: Vec<Item>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub user_item_ids: Vec<String>,
    #[serde(default)]
    pub site_item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    pub chance: f64,
    pub win: bool,
    pub roll: f64,
    pub angle: f64,
    pub proof: String,
    pub server_seed: String,
    pub nonce: String,
    pub user_items: Vec<Item>,
    pub site_items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinError {
    InProgress,
    InvalidRequest,
    StaleItems,
    Internal,
}

impl SpinError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InProgress => SPIN_IN_PROGRESS_ERROR,
            Self::InvalidRequest => INVALID_SELECTION_ERROR,
            Self::StaleItems => STALE_ITEMS_ERROR,
            Self::Internal => SERVER_ERROR,
        }
    }
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SpinError {}

/// Body of a `spinResult` frame: `{ ok: true, ...result }` or `{ ok: false, error }`.
#[derive(Debug, Clone, Serialize)]
pub struct SpinReply {
    pub ok: bool,
    #[serde(flatten)]
    pub result: Option<SpinResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpinReply {
    pub fn settled(result: SpinResult) -> Self {
        Self { ok: true, result: Some(result), error: None }
    }

    pub fn rejected(error: &SpinError) -> Self {
        Self { ok: false, result: None, error: Some(error.message().to_string()) }
    }
}

/// Frames pushed from the server over the live connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    State(InventorySnapshot),
    SpinResult(SpinReply),
}
