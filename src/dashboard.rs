use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use tracing::info;

use crate::aqi::{AqiResult, Classification};
use crate::chat::ChatMessage;
use crate::constants::{
    AQI_MAX, DASHBOARD_ALERTS, DASHBOARD_SUMMARY, FORECAST_DAYS, ICON_FAIR, ICON_RAIN,
    RAINY_THRESHOLD_MM,
};
use crate::series::{GROUND_PROFILE, TEMPO_PROFILE};
use crate::sources::Sources;
use crate::types::{
    DashboardPayload, ForecastDay, GroundReading, No2Reading, Site, TempoPayload,
    WeatherPayload, WeatherReading,
};

const FORMATTING_INSTRUCTIONS: &str = "FORMATTING INSTRUCTIONS:
- Use clear paragraphs with line breaks for readability
- Use bullet points (•) for lists and recommendations
- Use **bold text** for important warnings or key points
- Structure your response with clear sections when relevant
- Keep sentences concise and easy to read
- Use emojis sparingly but appropriately for health advisories";

#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub site: Site,
    pub observed_at: DateTime<Utc>,
    pub ground: GroundReading,
    pub no2: No2Reading,
    pub weather: WeatherReading,
    pub rainfall: Option<f64>,
    pub result: AqiResult,
}

impl Reading {
    pub fn rainfall_mm(&self) -> f64 {
        self.rainfall.unwrap_or(0.0)
    }
}

/// Resolves all sources for `(lat, lon)`. Never fails; unavailable upstreams are replaced by
/// their fallbacks.
pub async fn collect_reading(sources: &Sources, lat: f64, lon: f64, rng: &mut StdRng) -> Reading {
    let mut site = Site::new(lat, lon);
    site.city = sources.geocoder.resolve(&site, rng).await;

    let (ground, no2, weather, rainfall) = futures::join!(
        sources.ground.attempt(&site),
        sources.no2.attempt(&site),
        sources.weather.attempt(&site),
        sources.rainfall.attempt(&site),
    );
    let ground = sources.ground.recover(ground, &site, rng);
    let no2 = sources.no2.recover(no2, &site, rng);
    let weather = sources.weather.recover(weather, &site, rng);
    let rainfall = sources.rainfall.recover(rainfall, &site, rng);

    let result = AqiResult::from_readings(ground.pm25, no2.no2);
    info!(
        city = %site.city,
        pm25 = ground.pm25,
        no2 = no2.no2,
        aqi = result.aqi,
        "Reading collected"
    );

    Reading {
        site,
        observed_at: Utc::now(),
        ground,
        no2,
        weather,
        rainfall,
        result,
    }
}

pub fn build_payload(reading: &Reading, rng: &mut StdRng) -> DashboardPayload {
    let tempo_chart = TEMPO_PROFILE.generate(reading.no2.no2, rng).to_vec();
    let ground_chart = GROUND_PROFILE.generate(reading.ground.pm25, rng).to_vec();
    let rainfall = reading.rainfall_mm();

    DashboardPayload {
        lat: reading.site.lat,
        lon: reading.site.lon,
        city: reading.site.city.clone(),
        aqi: reading.result.aqi,
        classification: reading.result.classification,
        advisory: reading.result.advisory().to_string(),
        tempo: TempoPayload {
            no2: reading.no2.no2,
            source: reading.no2.provenance.label().to_string(),
        },
        tempo_chart,
        ground: reading.ground.clone(),
        ground_chart,
        weather: WeatherPayload {
            temp: reading.weather.temp,
            humidity: reading.weather.humidity,
            wind: reading.weather.wind,
            rainfall,
            icon: weather_icon(rainfall).to_string(),
        },
        weather_chart: reading.weather.chart.clone(),
        forecast: forecast(reading.result.aqi, reading.result.classification),
        alerts: DASHBOARD_ALERTS.to_string(),
        summary: DASHBOARD_SUMMARY.to_string(),
    }
}

pub fn weather_icon(rainfall_mm: f64) -> &'static str {
    if rainfall_mm < RAINY_THRESHOLD_MM {
        ICON_FAIR
    } else {
        ICON_RAIN
    }
}

pub fn forecast(aqi: i32, classification: Classification) -> Vec<ForecastDay> {
    FORECAST_DAYS
        .iter()
        .map(|(day, offset, color_class)| ForecastDay {
            day: (*day).to_string(),
            aqi: (aqi + offset).clamp(0, AQI_MAX),
            status: classification,
            color_class: (*color_class).to_string(),
        })
        .collect()
}

pub fn chat_messages(reading: &Reading, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(chat_system_prompt(reading)),
        ChatMessage::user(question),
    ]
}

pub fn chat_system_prompt(reading: &Reading) -> String {
    let site = &reading.site;
    let result = &reading.result;
    format!(
        "You are an expert air quality and public health advisor with access to real-time data.

LOCATION: {city}
COORDINATES: {lat}, {lon}
OBSERVED AT: {observed_at} UTC

CURRENT AIR QUALITY DATA:
- Air Quality Index (AQI): {aqi} ({classification})
- PM2.5 (Ground Stations): {pm25} µg/m³ from {station}
- NO₂ ({no2_source}): {no2} µg/m³

CURRENT WEATHER CONDITIONS:
- Temperature: {temp}°C
- Humidity: {humidity}%
- Wind Speed: {wind} km/h
- Rainfall: {rainfall} mm
- WMO weather code: {weather_code}

HEALTH CONTEXT:
- Air Quality Classification: {classification}
- Health Advisory: {advisory}

Please provide specific, actionable health advice based on this real-time data for people in {city}.
Consider the actual current conditions and their specific health implications.

{FORMATTING_INSTRUCTIONS}",
        city = site.city,
        lat = site.lat,
        lon = site.lon,
        observed_at = reading.observed_at.format("%Y-%m-%d %H:%M"),
        aqi = result.aqi,
        classification = result.classification,
        pm25 = reading.ground.pm25,
        station = reading.ground.station,
        no2_source = reading.no2.provenance.label(),
        no2 = reading.no2.no2,
        temp = reading.weather.temp,
        humidity = reading.weather.humidity,
        wind = reading.weather.wind,
        rainfall = reading.rainfall_mm(),
        weather_code = reading.weather.weather_code,
        advisory = result.advisory(),
    )
}

pub fn fallback_answer(reading: &Reading) -> String {
    format!(
        "The current AQI in {city} is {aqi} ({classification}). {advisory} \
         Personalised advice is unavailable right now, please try again shortly.",
        city = reading.site.city,
        aqi = reading.result.aqi,
        classification = reading.result.classification,
        advisory = reading.result.advisory(),
    )
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::constants::{FALLBACK_STATION, TEMPO_ESTIMATED_SOURCE, UNKNOWN_LOCATION};
    use crate::sources::testing::{lagos, offline};
    use crate::types::No2Provenance;

    #[tokio::test]
    async fn live_sources_feed_the_reading() {
        let mut rng = StdRng::seed_from_u64(1);
        let reading = collect_reading(&lagos(), 6.5244, 3.3792, &mut rng).await;
        assert_eq!(reading.site.city, "Lagos, Nigeria");
        assert_eq!(reading.ground.station, "Ikeja");
        assert_eq!(reading.no2.provenance, No2Provenance::Satellite);
        assert_eq!(reading.rainfall, Some(3.5));
        // PM2.5 35.4 is AQI 100, NO2 60 adds 20.
        assert_eq!(reading.result.aqi, 120);
        assert_eq!(
            reading.result.classification,
            Classification::UnhealthyForSensitiveGroups
        );
    }

    #[tokio::test]
    async fn offline_sources_still_produce_a_complete_reading() {
        let mut rng = StdRng::seed_from_u64(2);
        let reading = collect_reading(&offline(), 51.5, -0.12, &mut rng).await;
        assert_eq!(reading.site.city, UNKNOWN_LOCATION);
        assert_eq!(reading.ground.station, FALLBACK_STATION);
        assert_eq!(reading.no2.provenance, No2Provenance::Estimated);
        assert!((20.0..=45.0).contains(&reading.no2.no2));
        assert!((8.0..=18.0).contains(&reading.weather.temp));
        assert_eq!(reading.rainfall, None);
        assert!((0..=500).contains(&reading.result.aqi));
    }

    #[tokio::test]
    async fn seeded_requests_are_reproducible() {
        let first = collect_reading(&offline(), 10.0, 10.0, &mut StdRng::seed_from_u64(9)).await;
        let second = collect_reading(&offline(), 10.0, 10.0, &mut StdRng::seed_from_u64(9)).await;
        assert_eq!(first.ground, second.ground);
        assert_eq!(first.no2, second.no2);
        assert_eq!(first.weather, second.weather);
    }

    #[tokio::test]
    async fn payload_carries_every_dashboard_field() {
        let mut rng = StdRng::seed_from_u64(3);
        let reading = collect_reading(&lagos(), 6.5244, 3.3792, &mut rng).await;
        let payload = build_payload(&reading, &mut rng);

        assert_eq!(payload.city, "Lagos, Nigeria");
        assert_eq!(payload.aqi, 120);
        assert_eq!(
            payload.advisory,
            "Limit outdoor exertion if you have respiratory issues."
        );
        assert_eq!(payload.tempo.source, "NASA TEMPO Satellite");
        assert_eq!(payload.tempo_chart.len(), 5);
        assert!(payload.tempo_chart.iter().all(|value| *value >= 5.0));
        assert_eq!(payload.ground_chart.len(), 5);
        assert!(payload.ground_chart.iter().all(|value| *value >= 3.0));
        assert_eq!(payload.weather.rainfall, 3.5);
        assert_eq!(payload.weather.icon, ICON_RAIN);
        assert_eq!(payload.weather_chart.temp.len(), 5);
        assert_eq!(payload.forecast.len(), 4);
        assert_eq!(payload.alerts, DASHBOARD_ALERTS);
        assert_eq!(payload.summary, DASHBOARD_SUMMARY);
    }

    #[tokio::test]
    async fn missing_rainfall_reads_as_dry() {
        let mut rng = StdRng::seed_from_u64(4);
        let reading = collect_reading(&offline(), 6.5, 3.4, &mut rng).await;
        let payload = build_payload(&reading, &mut rng);
        assert_eq!(payload.weather.rainfall, 0.0);
        assert_eq!(payload.weather.icon, ICON_FAIR);
        assert_eq!(payload.tempo.source, TEMPO_ESTIMATED_SOURCE);
    }

    #[test]
    fn icon_switches_at_two_millimetres() {
        assert_eq!(weather_icon(1.99), ICON_FAIR);
        assert_eq!(weather_icon(2.0), ICON_RAIN);
    }

    #[test]
    fn forecast_offsets_are_clamped() {
        let days = forecast(100, Classification::Moderate);
        let aqis: Vec<i32> = days.iter().map(|day| day.aqi).collect();
        assert_eq!(aqis, vec![105, 110, 92, 103]);
        assert!(days.iter().all(|day| day.status == Classification::Moderate));
        assert_eq!(days[0].day, "Tue");
        assert_eq!(days[2].color_class, "text-danger");

        let low: Vec<i32> = forecast(3, Classification::Good).iter().map(|day| day.aqi).collect();
        assert_eq!(low, vec![8, 13, 0, 6]);
        let high: Vec<i32> = forecast(495, Classification::Hazardous)
            .iter()
            .map(|day| day.aqi)
            .collect();
        assert_eq!(high, vec![500, 500, 487, 498]);
    }

    #[test]
    fn forecast_serializes_color_class_in_camel_case() {
        let json = serde_json::to_value(forecast(50, Classification::Good)).unwrap();
        assert_eq!(json[0]["colorClass"], "text-success");
        assert_eq!(json[0]["status"], "Good");
    }

    #[tokio::test]
    async fn system_prompt_lists_the_reading() {
        let mut rng = StdRng::seed_from_u64(5);
        let reading = collect_reading(&lagos(), 6.5244, 3.3792, &mut rng).await;
        let prompt = chat_system_prompt(&reading);
        assert!(prompt.contains("LOCATION: Lagos, Nigeria"));
        assert!(prompt.contains("COORDINATES: 6.5244, 3.3792"));
        assert!(prompt.contains("(AQI): 120 (Unhealthy for Sensitive Groups)"));
        assert!(prompt.contains("35.4 µg/m³ from Ikeja"));
        assert!(prompt.contains("Rainfall: 3.5 mm"));
        assert!(prompt.contains("WMO weather code: 2"));
        assert!(prompt.contains("FORMATTING INSTRUCTIONS:"));

        let messages = chat_messages(&reading, "Can I jog?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1], ChatMessage::user("Can I jog?"));
    }

    #[tokio::test]
    async fn fallback_answer_mentions_aqi_and_advisory() {
        let mut rng = StdRng::seed_from_u64(6);
        let reading = collect_reading(&lagos(), 6.5244, 3.3792, &mut rng).await;
        let answer = fallback_answer(&reading);
        assert!(answer.contains("Lagos, Nigeria is 120 (Unhealthy for Sensitive Groups)"));
        assert!(answer.contains("Limit outdoor exertion"));
    }
}
