use std::str::FromStr;
use std::time::Duration;

/// Operator knobs for a verification run.
///
/// `max_iterations` is the pass cap; the run succeeds once the iteration
/// counter exceeds it, so 0 means a single full pass and 1 means two.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub max_iterations: u64,
    /// Two seed-phrase fixtures, alternated by pass parity.
    pub seed_fixtures: [String; 2],
    pub passphrase: String,
    /// Named static resource fetched through the bridge each pass.
    pub image_resource: String,
    /// Absolute URL probed for reachability each pass.
    pub probe_url: String,
    /// Fixed re-poll interval of the readiness gates.
    pub poll_delay: Duration,
    /// Upper bound of the random stagger applied on odd iterations.
    pub stagger_ceiling: Duration,
}

const SEED_FIXTURE_1: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const SEED_FIXTURE_2: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 0,
            seed_fixtures: [SEED_FIXTURE_1.to_owned(), SEED_FIXTURE_2.to_owned()],
            passphrase: "12345678".to_owned(),
            image_resource: "wallet_images".to_owned(),
            probe_url: "https://example.com/favicon.ico".to_owned(),
            poll_delay: Duration::from_millis(500),
            stagger_ceiling: Duration::from_secs(10),
        }
    }
}

impl ProbeConfig {
    /// Reads `PROBE_*` environment variables, falling back to the defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: env_parsed("PROBE_MAX_ITERATIONS", defaults.max_iterations),
            seed_fixtures: [
                env_or("PROBE_SEED_PHRASE_1", defaults.seed_fixtures[0].clone()),
                env_or("PROBE_SEED_PHRASE_2", defaults.seed_fixtures[1].clone()),
            ],
            passphrase: env_or("PROBE_WALLET_PASSPHRASE", defaults.passphrase),
            image_resource: env_or("PROBE_IMAGE_RESOURCE", defaults.image_resource),
            probe_url: env_or("PROBE_WEB_URL", defaults.probe_url),
            poll_delay: Duration::from_millis(env_parsed(
                "PROBE_POLL_DELAY_MS",
                defaults.poll_delay.as_millis() as u64,
            )),
            stagger_ceiling: Duration::from_millis(env_parsed(
                "PROBE_STAGGER_CEILING_MS",
                defaults.stagger_ceiling.as_millis() as u64,
            )),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().unwrap_or(default)
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
