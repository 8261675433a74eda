use clap::Parser;
use mawqii::form::LocationData;
use mawqii::geocode::{resolve_with, NominatimGateway, ADDRESS_UNAVAILABLE, GEOCODE_LANGUAGE};
use mawqii::geolocate::{
    AccuracyTier, GeolocationAcquirer, IpApiSource, LastFixCache, Location, MAX_FIX_ATTEMPTS,
};

/// Mawqii — delivery location picker engine
///
/// Resolves a delivery coordinate (auto-detected or manual), reverse
/// geocodes it into an Arabic street address, and emits the delivery
/// payload as JSON.
///
/// Examples:
///   mawqii --auto
///   mawqii --lat 24.7136 --lng 46.6753
///   mawqii --lat 24.7136 --lng 46.6753 --landmark "بجانب المسجد"
///   mawqii --auto --offline
///   mawqii --serve --port 8080
#[derive(Parser)]
#[command(name = "mawqii", version, about, long_about = None)]
struct Cli {
    /// Auto-detect the coordinate via IP geolocation.
    #[arg(long, short = 'a')]
    auto: bool,

    /// Latitude (-90 to 90).
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude (-180 to 180).
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Address override. Skips reverse geocoding.
    #[arg(long)]
    address: Option<String>,

    /// Landmark near the delivery point.
    #[arg(long)]
    landmark: Option<String>,

    /// Note for the courier.
    #[arg(long)]
    note: Option<String>,

    /// Offline mode: no network calls; --auto falls back to the last
    /// cached fix and the address degrades to the sentinel.
    #[arg(long)]
    offline: bool,

    /// Run the HTTP API server instead of a one-shot resolution.
    #[arg(long)]
    serve: bool,

    /// Server bind host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.serve {
        let map_key = std::env::var("MAWQII_MAP_KEY").ok();
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Cannot start runtime: {}", e);
            std::process::exit(1);
        });
        runtime.block_on(mawqii::server::start(&cli.host, cli.port, map_key));
        return;
    }

    // ── Resolve the coordinate ──────────────────────────────────

    let location = resolve_coordinate(&cli);

    let accuracy = location.accuracy.unwrap_or(0.0);
    let tier = AccuracyTier::classify(accuracy);
    eprintln!("  {} {} (±{:.1}م)", tier.icon(), tier.arabic_label(), accuracy);
    eprintln!("  \u{1F4D0} {}", location);

    // ── Resolve the address ─────────────────────────────────────

    let address = match &cli.address {
        Some(address) => address.clone(),
        None if cli.offline => ADDRESS_UNAVAILABLE.to_string(),
        None => resolve_with(
            &NominatimGateway::new(),
            location.lat,
            location.lng,
            GEOCODE_LANGUAGE,
        ),
    };
    eprintln!("  \u{1F4CD} {}", address);

    // ── Emit the delivery payload ───────────────────────────────

    let payload = LocationData {
        coordinates: location,
        address,
        landmark: cli.landmark.unwrap_or_default(),
        delivery_note: cli.note.unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&payload).unwrap());
}

fn resolve_coordinate(cli: &Cli) -> Location {
    // Priority: --lat/--lng > --auto > error

    if let (Some(lat), Some(lng)) = (cli.lat, cli.lng) {
        let location = Location::new(lat, lng);
        if !location.is_valid() {
            eprintln!("Error: Invalid coordinates. Lat: -90..90, Lng: -180..180");
            std::process::exit(1);
        }
        return location;
    }

    if cli.auto {
        let mut cache = LastFixCache::load();

        if !cli.offline {
            let source = IpApiSource::new();
            let acquired = GeolocationAcquirer::new(&source).acquire(|accuracy, attempt| {
                eprintln!(
                    "  المحاولة {}/{} - الدقة: ±{:.1}م",
                    attempt, MAX_FIX_ATTEMPTS, accuracy
                );
            });
            match acquired {
                Ok(fix) => {
                    cache.put(&fix);
                    return fix;
                }
                Err(e) => eprintln!("Warning: {}", e),
            }
        }

        if let Some(fix) = cache.last_fix() {
            eprintln!("  Using the last cached fix.");
            return fix;
        }

        eprintln!("Error: Could not auto-detect a location. Try --lat/--lng instead.");
        std::process::exit(1);
    }

    eprintln!("Error: No location specified.");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  mawqii --auto");
    eprintln!("  mawqii --lat 24.7136 --lng 46.6753");
    eprintln!("  mawqii --lat 24.7136 --lng 46.6753 --landmark \"بجانب المسجد\" --note \"اتصل عند الوصول\"");
    eprintln!("  mawqii --serve --port 8080");
    std::process::exit(1);
}
