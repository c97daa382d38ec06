use kairos::{CelestialBody, HouseSystemKind, OrbPolicy, ReportConfig, RunnerLimits, SearchConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which ephemeris backend the caller should construct.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendChoice {
    Analytic,
    SwissEphemeris { path: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KairosSettings {
    pub backend: BackendChoice,
    pub house_system: HouseSystemKind,
    /// Use Equal houses when the configured system is undefined at the birth latitude.
    pub fallback_to_equal: bool,
    pub orbs: OrbPolicy,
    pub search: SearchConfig,
    pub bodies: Vec<CelestialBody>,
    pub horizon_days: f64,
    pub limits: RunnerLimits,
}

impl Default for KairosSettings {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Analytic,
            house_system: HouseSystemKind::default(),
            fallback_to_equal: true,
            orbs: OrbPolicy::default(),
            search: SearchConfig::default(),
            bodies: CelestialBody::OUTER.to_vec(),
            horizon_days: default_horizon_days(),
            limits: RunnerLimits::default(),
        }
    }
}

impl KairosSettings {
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            search: self.search,
            orbs: self.orbs,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EphemerisToml {
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default)]
    path: Option<PathBuf>,
}

fn default_backend() -> String {
    "analytic".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct HousesToml {
    #[serde(default = "default_house_system")]
    system: String,
    #[serde(default = "default_true")]
    fallback_to_equal: bool,
}

impl Default for HousesToml {
    fn default() -> Self {
        Self {
            system: default_house_system(),
            fallback_to_equal: true,
        }
    }
}

fn default_house_system() -> String {
    "placidus".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct OrbsToml {
    #[serde(default = "default_orb_mode")]
    mode: String,
    #[serde(default = "default_personal_orb")]
    personal: f64,
    #[serde(default = "default_outer_orb")]
    outer: f64,
    #[serde(default = "default_flat_orb")]
    flat: f64,
}

impl Default for OrbsToml {
    fn default() -> Self {
        Self {
            mode: default_orb_mode(),
            personal: default_personal_orb(),
            outer: default_outer_orb(),
            flat: default_flat_orb(),
        }
    }
}

fn default_orb_mode() -> String {
    "category".to_string()
}

fn default_personal_orb() -> f64 {
    OrbPolicy::DEFAULT_PERSONAL_ORB
}

fn default_outer_orb() -> f64 {
    OrbPolicy::DEFAULT_OUTER_ORB
}

fn default_flat_orb() -> f64 {
    OrbPolicy::DEFAULT_FLAT_ORB
}

#[derive(Debug, Clone, Deserialize)]
struct ReportToml {
    #[serde(default)]
    bodies: Option<Vec<String>>,
    #[serde(default = "default_horizon_days")]
    horizon_days: f64,
    #[serde(default = "default_per_body_timeout_secs")]
    per_body_timeout_secs: u64,
    #[serde(default)]
    deadline_secs: Option<u64>,
}

impl Default for ReportToml {
    fn default() -> Self {
        Self {
            bodies: None,
            horizon_days: default_horizon_days(),
            per_body_timeout_secs: default_per_body_timeout_secs(),
            deadline_secs: None,
        }
    }
}

fn default_horizon_days() -> f64 {
    365.0
}

fn default_per_body_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RootConfigToml {
    #[serde(default)]
    ephemeris: EphemerisToml,
    #[serde(default)]
    houses: HousesToml,
    #[serde(default)]
    orbs: OrbsToml,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    report: ReportToml,
}

/// Try the common relative paths for `configs/kairos.toml`. `Ok(None)` when
/// none exists; an explicit path must exist.
pub fn read_kairos_toml_text(explicit: Option<&Path>) -> anyhow::Result<Option<String>> {
    if let Some(path) = explicit {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read config {}: {e}", path.display()))?;
        return Ok(Some(text));
    }
    let paths = ["configs/kairos.toml", "../../configs/kairos.toml"];
    for p in &paths {
        if let Ok(c) = fs::read_to_string(p) {
            return Ok(Some(c));
        }
    }
    Ok(None)
}

pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<KairosSettings> {
    match read_kairos_toml_text(explicit)? {
        Some(text) => parse_settings(&text),
        None => Ok(KairosSettings::default()),
    }
}

pub fn parse_settings(text: &str) -> anyhow::Result<KairosSettings> {
    let root: RootConfigToml =
        toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse kairos.toml: {e}"))?;
    let RootConfigToml {
        ephemeris,
        houses,
        orbs,
        search,
        report,
    } = root;

    let backend = match ephemeris.backend.trim().to_lowercase().as_str() {
        "analytic" => BackendChoice::Analytic,
        "swisseph" | "swiss" => BackendChoice::SwissEphemeris {
            path: ephemeris.path,
        },
        other => anyhow::bail!("ephemeris.backend must be \"analytic\" or \"swisseph\", got {other:?}"),
    };

    let house_system: HouseSystemKind = houses.system.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let orbs = match orbs.mode.trim().to_lowercase().as_str() {
        "category" => {
            validate_orb("orbs.personal", orbs.personal)?;
            validate_orb("orbs.outer", orbs.outer)?;
            OrbPolicy::CategoryBased {
                personal: orbs.personal,
                outer: orbs.outer,
            }
        }
        "flat" => {
            validate_orb("orbs.flat", orbs.flat)?;
            OrbPolicy::Flat(orbs.flat)
        }
        other => anyhow::bail!("orbs.mode must be \"category\" or \"flat\", got {other:?}"),
    };

    search
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid [search] settings: {e}"))?;

    let bodies = match report.bodies {
        Some(names) => parse_bodies(&names)?,
        None => CelestialBody::OUTER.to_vec(),
    };
    if !report.horizon_days.is_finite() || report.horizon_days < 0.0 {
        anyhow::bail!("report.horizon_days must be non-negative, got {}", report.horizon_days);
    }
    if report.per_body_timeout_secs == 0 {
        anyhow::bail!("report.per_body_timeout_secs must be at least 1");
    }

    Ok(KairosSettings {
        backend,
        house_system,
        fallback_to_equal: houses.fallback_to_equal,
        orbs,
        search,
        bodies,
        horizon_days: report.horizon_days,
        limits: RunnerLimits {
            per_body_timeout: Duration::from_secs(report.per_body_timeout_secs),
            deadline: report.deadline_secs.map(Duration::from_secs),
        },
    })
}

/// Parse body ids, keeping the first occurrence of each.
pub fn parse_bodies<S: AsRef<str>>(names: &[S]) -> anyhow::Result<Vec<CelestialBody>> {
    let mut bodies = Vec::with_capacity(names.len());
    for name in names {
        let body: CelestialBody = name.as_ref().parse().map_err(|e: String| anyhow::anyhow!(e))?;
        if !bodies.contains(&body) {
            bodies.push(body);
        }
    }
    if bodies.is_empty() {
        anyhow::bail!("At least one body is required");
    }
    Ok(bodies)
}

fn validate_orb(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 15.0 {
        anyhow::bail!("{name} must be in (0, 15] degrees, got {value}");
    }
    Ok(())
}
