use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    error::{SimError, SimResult},
    types::{ClassCode, Day, QuotaCode},
    unconstraining::HistoricalRecord,
};

pub const CONFIG_FILE: &str = "rm_config.json";

/// Run-wide tunables. Every field has a reference default so a config
/// file only needs to list what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Length of the booking horizon in days.
    pub booking_window_days: Day,
    /// Total Monte Carlo trials, baseline included.
    pub n_simulations: usize,
    /// Emit a progress event every this many completed trials.
    pub progress_interval: usize,
    /// Compounding daily spill rate used to unconstrain sold-out history.
    pub spill_factor: f64,
    /// Constant price elasticity for FLEXI bucket splitting.
    pub elasticity: f64,
    /// Market size assumed for a quota with no history.
    pub default_market_size: f64,
    /// Forecast sigma as a fraction of mu.
    pub sigma_ratio: f64,
    /// Interior-point iteration budget for a single LP solve.
    pub lp_max_iterations: u32,
    /// Master seed for every RNG stream of the run.
    pub seed: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            booking_window_days: 120,
            n_simulations:       100,
            progress_interval:   10,
            spill_factor:        0.08,
            elasticity:          1.5,
            default_market_size: 10.0,
            sigma_ratio:         0.15,
            lp_max_iterations:   200,
            seed:                42,
        }
    }
}

/// How a quota's demand materialises over the booking horizon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingArchetype {
    /// Square-root ramp accelerating towards departure.
    General,
    /// Early ramp, flat middle, late ramp.
    Bimodal,
    /// All demand arrives on the day the window opens.
    LastMinute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub code: QuotaCode,
    pub label: String,
    pub archetype: BookingArchetype,
    /// Day (counted back from departure) on which sales open.
    pub window_open: Day,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBucket {
    pub name: String,
    pub price: f64,
}

/// Price structure of one quota within one class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceStructure {
    /// Ascending price buckets; demand is split by elasticity.
    Flexi { buckets: Vec<PriceBucket> },
    /// A single implicit bucket.
    Flat { price: f64 },
}

impl PriceStructure {
    /// Bucket prices in ascending order.
    pub fn prices(&self) -> Vec<f64> {
        match self {
            Self::Flexi { buckets } => buckets.iter().map(|b| b.price).collect(),
            Self::Flat { price } => vec![*price],
        }
    }

    pub fn bucket_count(&self) -> usize {
        match self {
            Self::Flexi { buckets } => buckets.len(),
            Self::Flat { .. } => 1,
        }
    }

    pub fn bucket_name(&self, index: usize) -> String {
        match self {
            Self::Flexi { buckets } => buckets
                .get(index)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| format!("Bucket_{index}")),
            Self::Flat { .. } => "Flat".to_string(),
        }
    }

    pub fn lowest_price(&self) -> f64 {
        match self {
            Self::Flexi { buckets } => buckets.first().map(|b| b.price).unwrap_or(0.0),
            Self::Flat { price } => *price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassQuota {
    pub quota: QuotaCode,
    pub pricing: PriceStructure,
    /// Hard minimum seats the master allocation must give this quota.
    #[serde(default)]
    pub policy_floor: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassConfig {
    pub code: ClassCode,
    pub capacity: u32,
    pub quotas: Vec<ClassQuota>,
}

/// Causal drivers for the departure being priced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalFactors {
    pub is_holiday: bool,
    pub day_of_week: Weekday,
}

impl ExternalFactors {
    pub fn is_weekend(&self) -> bool {
        is_weekend_day(self.day_of_week)
    }
}

/// Friday and Sunday departures carry weekend demand.
pub fn is_weekend_day(day: Weekday) -> bool {
    matches!(day, Weekday::Fri | Weekday::Sun)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmConfig {
    #[serde(default)]
    pub settings: SimSettings,
    pub quotas: Vec<QuotaConfig>,
    pub classes: Vec<ClassConfig>,
    pub external: ExternalFactors,
    #[serde(default)]
    pub history: HashMap<ClassCode, Vec<HistoricalRecord>>,
}

impl RmConfig {
    /// Load from the data/ directory.
    /// In tests, use RmConfig::reference().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/{CONFIG_FILE}");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        let config: RmConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn quota(&self, code: &str) -> Option<&QuotaConfig> {
        self.quotas.iter().find(|q| q.code == code)
    }

    pub fn class(&self, code: &str) -> SimResult<&ClassConfig> {
        self.classes
            .iter()
            .find(|c| c.code == code)
            .ok_or_else(|| SimError::UnknownClass { class: code.to_string() })
    }

    pub fn history_for(&self, class: &str) -> &[HistoricalRecord] {
        self.history.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Structural checks. Run once before any trial.
    pub fn validate(&self) -> SimResult<()> {
        let s = &self.settings;
        if s.booking_window_days == 0 {
            return Err(invalid("booking_window_days must be at least 1"));
        }
        if s.n_simulations == 0 {
            return Err(invalid("n_simulations must be at least 1"));
        }
        if s.progress_interval == 0 {
            return Err(invalid("progress_interval must be at least 1"));
        }
        if s.spill_factor < 0.0 || s.elasticity < 0.0 || s.sigma_ratio < 0.0 {
            return Err(invalid("spill_factor, elasticity and sigma_ratio must be non-negative"));
        }
        if s.default_market_size < 0.0 {
            return Err(invalid("default_market_size must be non-negative"));
        }

        for quota in &self.quotas {
            if quota.window_open == 0 || quota.window_open > s.booking_window_days {
                return Err(invalid(&format!(
                    "quota {} opens on day {} outside the {}-day horizon",
                    quota.code, quota.window_open, s.booking_window_days
                )));
            }
        }

        for class in &self.classes {
            for cq in &class.quotas {
                if self.quota(&cq.quota).is_none() {
                    return Err(SimError::UnknownQuota {
                        class: class.code.clone(),
                        quota: cq.quota.clone(),
                    });
                }
                validate_pricing(&class.code, &cq.quota, &cq.pricing)?;
            }
        }

        for class in self.history.keys() {
            self.class(class)?;
        }

        Ok(())
    }

    /// The reference railway configuration: three AC coach classes with a
    /// FLEXI general quota, a FLAT last-minute (tatkal) quota and a FLAT
    /// protected ladies quota.
    pub fn reference() -> Self {
        let quotas = vec![
            QuotaConfig {
                code: "GN".into(),
                label: "General".into(),
                archetype: BookingArchetype::General,
                window_open: 120,
            },
            QuotaConfig {
                code: "TQ".into(),
                label: "Tatkal".into(),
                archetype: BookingArchetype::LastMinute,
                window_open: 1,
            },
            QuotaConfig {
                code: "LD".into(),
                label: "Ladies".into(),
                archetype: BookingArchetype::Bimodal,
                window_open: 120,
            },
        ];

        let class = |code: &str, capacity: u32, base: f64, tatkal: f64, ld_floor: Option<u32>| {
            ClassConfig {
                code: code.into(),
                capacity,
                quotas: vec![
                    ClassQuota {
                        quota: "GN".into(),
                        pricing: PriceStructure::Flexi {
                            buckets: vec![
                                PriceBucket { name: "Base Fare".into(), price: base },
                                PriceBucket { name: "Flexi +10%".into(), price: base * 1.1 },
                                PriceBucket { name: "Flexi +20%".into(), price: base * 1.2 },
                            ],
                        },
                        policy_floor: None,
                    },
                    ClassQuota {
                        quota: "TQ".into(),
                        pricing: PriceStructure::Flat { price: tatkal },
                        policy_floor: None,
                    },
                    ClassQuota {
                        quota: "LD".into(),
                        pricing: PriceStructure::Flat { price: base },
                        policy_floor: ld_floor,
                    },
                ],
            }
        };

        let classes = vec![
            class("1AC", 30, 7000.0, 8500.0, None),
            class("2AC", 60, 3000.0, 4000.0, Some(2)),
            class("3AC", 110, 1800.0, 2500.0, None),
        ];

        let rec = |train_id: u32, sold: u32, days: u32, holiday: bool, dow: Weekday, quota: &str| {
            HistoricalRecord::new(train_id, days, sold, holiday, dow, quota)
        };
        use Weekday::{Fri, Mon, Sun, Tue, Wed};

        let history: HashMap<ClassCode, Vec<HistoricalRecord>> = [
            (
                "1AC".to_string(),
                vec![
                    rec(1, 28, 5, true, Fri, "GN"),
                    rec(1, 2, 1, true, Fri, "TQ"),
                    rec(2, 25, 0, false, Wed, "GN"),
                    rec(2, 2, 0, false, Wed, "LD"),
                    rec(3, 30, 1, false, Fri, "GN"),
                ],
            ),
            (
                "2AC".to_string(),
                vec![
                    rec(1, 55, 5, true, Fri, "GN"),
                    rec(1, 5, 1, true, Fri, "TQ"),
                    rec(2, 58, 2, false, Wed, "GN"),
                    rec(2, 2, 1, false, Wed, "TQ"),
                    rec(3, 55, 0, false, Mon, "GN"),
                    rec(3, 4, 0, false, Mon, "LD"),
                    rec(4, 50, 10, true, Sun, "GN"),
                    rec(4, 10, 1, true, Sun, "TQ"),
                    rec(4, 6, 0, true, Sun, "LD"),
                ],
            ),
            (
                "3AC".to_string(),
                vec![
                    rec(1, 100, 5, true, Fri, "GN"),
                    rec(1, 10, 1, true, Fri, "TQ"),
                    rec(2, 100, 0, false, Wed, "GN"),
                    rec(2, 6, 0, false, Wed, "LD"),
                    rec(3, 95, 0, false, Mon, "GN"),
                    rec(4, 90, 10, true, Sun, "GN"),
                    rec(4, 20, 1, true, Sun, "TQ"),
                    rec(5, 105, 0, false, Tue, "GN"),
                    rec(5, 8, 0, false, Tue, "LD"),
                    rec(6, 108, 1, false, Fri, "GN"),
                    rec(6, 2, 1, false, Fri, "TQ"),
                ],
            ),
        ]
        .into();

        Self {
            settings: SimSettings::default(),
            quotas,
            classes,
            external: ExternalFactors {
                is_holiday: true,
                day_of_week: Fri,
            },
            history,
        }
    }
}

fn validate_pricing(class: &str, quota: &str, pricing: &PriceStructure) -> SimResult<()> {
    match pricing {
        PriceStructure::Flexi { buckets } => {
            if buckets.is_empty() {
                return Err(invalid(&format!("{class}/{quota}: FLEXI quota has no buckets")));
            }
            if buckets.iter().any(|b| !(b.price > 0.0)) {
                return Err(invalid(&format!("{class}/{quota}: bucket prices must be positive")));
            }
            if buckets.windows(2).any(|w| w[1].price <= w[0].price) {
                return Err(invalid(&format!(
                    "{class}/{quota}: bucket prices must be strictly ascending"
                )));
            }
        }
        PriceStructure::Flat { price } => {
            if !(*price > 0.0) {
                return Err(invalid(&format!("{class}/{quota}: flat price must be positive")));
            }
        }
    }
    Ok(())
}

fn invalid(msg: &str) -> SimError {
    SimError::InvalidConfig(msg.to_string())
}
