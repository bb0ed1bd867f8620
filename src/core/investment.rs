//! Investment records and the typed asset variants they carry

use crate::core::valuation;
use anyhow::Result;
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle tag for price freshness of a record.
///
/// `Static` is reserved for asset types that are never quoted externally
/// (reksadana, deposito); market assets move between the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    Pending,
    Updated,
    Failed,
    Static,
}

impl Display for PriceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            PriceStatus::Pending => "pending",
            PriceStatus::Updated => "updated",
            PriceStatus::Failed => "failed",
            PriceStatus::Static => "static",
        };
        write!(f, "{tag}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Crypto,
    Stock,
    Reksadana,
    Deposito,
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            AssetKind::Crypto => "crypto",
            AssetKind::Stock => "stock",
            AssetKind::Reksadana => "reksadana",
            AssetKind::Deposito => "deposito",
        };
        write!(f, "{tag}")
    }
}

impl FromStr for AssetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crypto" => Ok(AssetKind::Crypto),
            "stock" => Ok(AssetKind::Stock),
            "reksadana" => Ok(AssetKind::Reksadana),
            "deposito" => Ok(AssetKind::Deposito),
            _ => Err(anyhow::anyhow!("Invalid investment type: {}", s)),
        }
    }
}

/// Fixed deposit term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tenor {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "12m")]
    TwelveMonths,
}

impl Tenor {
    pub fn months(&self) -> u32 {
        match self {
            Tenor::OneMonth => 1,
            Tenor::ThreeMonths => 3,
            Tenor::SixMonths => 6,
            Tenor::TwelveMonths => 12,
        }
    }

    /// Fraction of a year covered by the tenor.
    pub fn years(&self) -> f64 {
        f64::from(self.months()) / 12.0
    }
}

impl Display for Tenor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.months())
    }
}

impl FromStr for Tenor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1" => Ok(Tenor::OneMonth),
            "3m" | "3" => Ok(Tenor::ThreeMonths),
            "6m" | "6" => Ok(Tenor::SixMonths),
            "12m" | "12" => Ok(Tenor::TwelveMonths),
            _ => Err(anyhow::anyhow!("Invalid tenor: {} (use 1m/3m/6m/12m)", s)),
        }
    }
}

/// When deposit interest is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestPayout {
    Monthly,
    Maturity,
}

impl Display for InterestPayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            InterestPayout::Monthly => "monthly",
            InterestPayout::Maturity => "maturity",
        };
        write!(f, "{tag}")
    }
}

impl FromStr for InterestPayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(InterestPayout::Monthly),
            "maturity" => Ok(InterestPayout::Maturity),
            _ => Err(anyhow::anyhow!("Invalid payout schedule: {}", s)),
        }
    }
}

/// An exchange-quoted holding (crypto or stock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketHolding {
    pub symbol: String,
    pub name: String,
    pub buy_date: NaiveDate,
    pub buy_price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub current_price: Option<f64>,
}

/// A mutual fund position, valued at cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHolding {
    pub fund_name: String,
    pub fund_category: String,
    #[serde(default)]
    pub platform: Option<String>,
    pub amount: f64,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub units: Option<f64>,
    #[serde(default)]
    pub nav_at_purchase: Option<f64>,
    #[serde(default)]
    pub current_nav: Option<f64>,
}

/// A fixed-term bank deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositHolding {
    pub bank_name: String,
    pub principal: f64,
    pub tenor: Tenor,
    /// Annual interest rate, in percent.
    pub annual_rate: f64,
    pub payout: InterestPayout,
    /// Withholding tax on interest, in percent.
    pub tax_rate: f64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub auto_rollover: bool,
}

impl DepositHolding {
    /// Start date plus the tenor.
    pub fn maturity_date(&self) -> NaiveDate {
        self.start_date + Months::new(self.tenor.months())
    }
}

/// The typed payload of an investment record.
///
/// Exactly one variant per record; operations match exhaustively so an
/// unsupported type cannot slip through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    Crypto(MarketHolding),
    Stock(MarketHolding),
    Reksadana(FundHolding),
    Deposito(DepositHolding),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Crypto(_) => AssetKind::Crypto,
            Asset::Stock(_) => AssetKind::Stock,
            Asset::Reksadana(_) => AssetKind::Reksadana,
            Asset::Deposito(_) => AssetKind::Deposito,
        }
    }

    /// Whether the asset is quoted on an external market.
    pub fn is_market(&self) -> bool {
        matches!(self, Asset::Crypto(_) | Asset::Stock(_))
    }

    /// Symbol to look up for market assets, `None` for static types.
    pub fn market_symbol(&self) -> Option<&str> {
        match self {
            Asset::Crypto(h) | Asset::Stock(h) => Some(&h.symbol),
            Asset::Reksadana(_) | Asset::Deposito(_) => None,
        }
    }

    /// Human-readable label for tables and logs.
    pub fn display_name(&self) -> &str {
        match self {
            Asset::Crypto(h) | Asset::Stock(h) => {
                if h.name.is_empty() {
                    &h.symbol
                } else {
                    &h.name
                }
            }
            Asset::Reksadana(f) => &f.fund_name,
            Asset::Deposito(d) => &d.bank_name,
        }
    }

    /// Amount originally put in.
    pub fn invested_value(&self) -> f64 {
        match self {
            Asset::Crypto(h) | Asset::Stock(h) => valuation::buy_value(h.buy_price, h.quantity),
            Asset::Reksadana(f) => f.amount,
            Asset::Deposito(d) => d.principal,
        }
    }

    /// Present valuation of the asset.
    ///
    /// Market holdings fall back to their buy value until a quote has been
    /// fetched; deposito projects the value at maturity.
    pub fn computed_value(&self) -> f64 {
        match self {
            Asset::Crypto(h) | Asset::Stock(h) => {
                let quoted = valuation::current_value(h.current_price, h.quantity);
                if quoted > 0.0 {
                    quoted
                } else {
                    valuation::buy_value(h.buy_price, h.quantity)
                }
            }
            Asset::Reksadana(f) => f.amount,
            Asset::Deposito(d) => {
                valuation::deposito_maturity_value(d.principal, d.annual_rate, d.tenor)
            }
        }
    }
}

/// A single tracked investment. The store is the only writer of the
/// derived fields (`current_value`, `price_status`, sync flags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: String,
    #[serde(flatten)]
    pub asset: Asset,
    #[serde(default)]
    pub notes: Option<String>,
    pub current_value: f64,
    pub price_status: PriceStatus,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    /// Build a fresh record with a generated id and computed valuation.
    pub fn new(asset: Asset, notes: Option<String>) -> Self {
        let now = Utc::now();
        let price_status = if asset.is_market() {
            PriceStatus::Pending
        } else {
            PriceStatus::Static
        };
        let current_value = asset.computed_value();
        Investment {
            id: Uuid::new_v4().to_string(),
            asset,
            notes,
            current_value,
            price_status,
            synced: false,
            synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.asset.kind()
    }

    /// Replace the type-specific fields, keeping identity and creation time.
    ///
    /// Market assets go back to `pending` so the next refresh re-quotes
    /// them; static types are revalued on the spot.
    pub fn replace(&mut self, asset: Asset, notes: Option<String>) {
        self.asset = asset;
        self.notes = notes;
        self.price_status = if self.asset.is_market() {
            PriceStatus::Pending
        } else {
            PriceStatus::Static
        };
        self.current_value = self.asset.computed_value();
        self.updated_at = Utc::now();
        self.synced = false;
    }

    /// Settle a fetched quote into the record.
    pub fn apply_price(&mut self, price: f64, now: DateTime<Utc>) {
        if let Asset::Crypto(h) | Asset::Stock(h) = &mut self.asset {
            h.current_price = Some(price);
        }
        self.current_value = self.asset.computed_value();
        self.price_status = PriceStatus::Updated;
        self.updated_at = now;
        self.synced = false;
    }

    /// Record a failed quote attempt without touching the last valuation.
    pub fn mark_price_failed(&mut self, now: DateTime<Utc>) {
        self.price_status = PriceStatus::Failed;
        self.updated_at = now;
    }
}
