pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const OPENAQ_BASE_URL: &str = "https://api.openaq.org/v2";
pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1";
pub const TEMPO_BASE_URL: &str = "https://disc.gsfc.nasa.gov/api/data/TEMPO_NO2_L3_V03";
pub const GPCP_BASE_URL: &str = "https://gpm1.gesdisc.eosdis.nasa.gov/daac-bin/OTF/HTTP_services.cgi";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_MODEL: &str = "llama-3.1-8b-instant";

pub const USER_AGENT: &str = "IGUN-Air-App";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_WEATHER_TIMEOUT_SECONDS: u64 = 15;
pub const CHAT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const CONNECT_TIMEOUT_SECONDS: u64 = 8;

pub const OPENAQ_RADIUS_METERS: u32 = 50_000;
pub const OPENAQ_RESULT_LIMIT: u32 = 5;

pub const CHAT_DEFAULT_LAT: f64 = 6.5244;
pub const CHAT_DEFAULT_LON: f64 = 3.3792;

pub const AQI_MAX: i32 = 500;

pub const SERIES_LEN: usize = 5;
pub const TEMPO_HOUR_FACTORS: [f64; SERIES_LEN] = [0.8, 1.0, 0.9, 1.2, 0.7];
pub const TEMPO_SPREAD: f64 = 0.15;
pub const TEMPO_FLOOR: f64 = 5.0;
pub const GROUND_HOUR_FACTORS: [f64; SERIES_LEN] = [0.9, 0.8, 1.1, 1.3, 1.0];
pub const GROUND_SPREAD: f64 = 0.2;
pub const GROUND_FLOOR: f64 = 3.0;

pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const FALLBACK_STATION: &str = "Fallback";
pub const TEMPO_LIVE_SOURCE: &str = "NASA TEMPO Satellite";
pub const TEMPO_ESTIMATED_SOURCE: &str = "TEMPO Estimated";

pub const POLLUTED_CITY_MARKERS: [&str; 5] = ["tokyo", "beijing", "delhi", "mexico", "mumbai"];
pub const CLEAN_CITY_MARKERS: [&str; 4] = ["stockholm", "oslo", "zurich", "copenhagen"];
pub const POLLUTED_CITY_FACTOR: f64 = 1.5;
pub const CLEAN_CITY_FACTOR: f64 = 0.7;

pub const RAINY_THRESHOLD_MM: f64 = 2.0;
pub const ICON_FAIR: &str = "🌤️";
pub const ICON_RAIN: &str = "🌧️";

pub const FORECAST_DAYS: [(&str, i32, &str); 4] = [
    ("Tue", 5, "text-success"),
    ("Wed", 10, "text-warning"),
    ("Thu", -8, "text-danger"),
    ("Fri", 3, "text-warning"),
];

pub const DASHBOARD_ALERTS: &str =
    "Real-time air quality from NASA TEMPO, validated by OpenAQ & IMERG.";
pub const DASHBOARD_SUMMARY: &str =
    "NASA Earthdata APIs + Ground validation + Weather insights power this dashboard.";
