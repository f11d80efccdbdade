use anyhow::{Context, Result};

use crate::aqi::health_advisory;
use crate::types::DashboardPayload;

const STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 1100px;
            margin: 0 auto;
            padding: 20px;
            background: #f4f7fb;
            color: #1f2a37;
        }
        nav { display: flex; gap: 16px; margin-bottom: 24px; }
        nav a { color: #1d4ed8; text-decoration: none; font-weight: 600; }
        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr)); gap: 16px; }
        .card { background: white; padding: 16px 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.08); }
        .aqi { font-size: 3em; font-weight: bold; }
        .muted { color: #6b7280; font-size: 0.9em; }
        .text-success { color: #15803d; }
        .text-warning { color: #b45309; }
        .text-danger { color: #b91c1c; }
        #chat-log { white-space: pre-wrap; min-height: 4em; }
        .spark { width: 100%; height: 40px; }
        .spark polyline { fill: none; stroke: #1d4ed8; stroke-width: 2; }
"#;

const NAV: &str = r#"<nav>
        <a href="/">Home</a>
        <a href="/alerts">Alerts</a>
        <a href="/about">About</a>
        <a href="/share-with-us">Share with us</a>
    </nav>"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title} - IGUN Air</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>{STYLE}</style>
</head>
<body>
    {NAV}
    {body}
</body>
</html>"#,
        title = escape_html(title),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn landing() -> String {
    layout(
        "Home",
        r#"<h1>IGUN Air</h1>
    <p>Real-time air quality from NASA TEMPO, ground stations and weather models.</p>
    <form class="card" action="/dashboard" method="get">
        <label>Latitude <input name="lat" id="lat" value="6.5244"></label>
        <label>Longitude <input name="lon" id="lon" value="3.3792"></label>
        <button type="submit">Show dashboard</button>
        <button type="button" id="locate">Use my location</button>
    </form>
    <script>
        document.getElementById("locate").addEventListener("click", () => {
            navigator.geolocation.getCurrentPosition((position) => {
                const { latitude, longitude } = position.coords;
                window.location = `/dashboard?lat=${latitude}&lon=${longitude}`;
            });
        });
    </script>"#,
    )
}

const ALERT_BANDS: [(&str, &str, &str); 6] = [
    ("Good", "0-50", "text-success"),
    ("Moderate", "51-100", "text-warning"),
    ("Unhealthy for Sensitive Groups", "101-150", "text-warning"),
    ("Unhealthy", "151-200", "text-danger"),
    ("Very Unhealthy", "201-300", "text-danger"),
    ("Hazardous", "301-500", "text-danger"),
];

pub fn alerts() -> String {
    let cards: String = ALERT_BANDS
        .iter()
        .map(|(label, range, color_class)| {
            format!(
                r#"<div class="card"><h3 class="{color_class}">{label} ({range})</h3><p>{}</p></div>"#,
                health_advisory(label)
            )
        })
        .collect();
    layout(
        "Alerts",
        &format!(
            r#"<h1>Air quality alerts</h1>
    <div class="grid">{cards}</div>"#
        ),
    )
}

pub fn about() -> String {
    layout(
        "About",
        r#"<h1>About IGUN Air</h1>
    <p>IGUN Air combines satellite NO₂ columns from NASA TEMPO, PM2.5 from OpenAQ ground
    stations, Open-Meteo weather and GPCP precipitation into a single air quality index with
    health advice for your location.</p>
    <p class="muted">When an upstream service is unavailable the dashboard shows an estimate and
    labels its source accordingly.</p>"#,
    )
}

pub fn share_with_us() -> String {
    layout(
        "Share with us",
        r#"<h1>Share with us</h1>
    <p>Seen smoke, dust or an unusual smell? Tell us what you observed and where.</p>
    <form class="card" onsubmit="event.preventDefault(); this.reset(); alert('Thank you for sharing!');">
        <label>Location <input name="location" required></label>
        <label>Observation <textarea name="observation" rows="4" required></textarea></label>
        <button type="submit">Send</button>
    </form>"#,
    )
}

/// Embeds `json` in a `<script>` block without letting it close the element early.
fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

const SPARK_WIDTH: f64 = 200.0;
const SPARK_HEIGHT: f64 = 40.0;

fn sparkline(values: &[f64]) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return String::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let step = if finite.len() > 1 {
        SPARK_WIDTH / (finite.len() - 1) as f64
    } else {
        0.0
    };
    let points: Vec<String> = finite
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let x = index as f64 * step;
            let y = SPARK_HEIGHT - (value - min) / span * SPARK_HEIGHT;
            format!("{x:.1},{y:.1}")
        })
        .collect();
    format!(
        r#"<svg class="spark" viewBox="0 0 {SPARK_WIDTH} {SPARK_HEIGHT}" preserveAspectRatio="none"><polyline points="{}"/></svg>"#,
        points.join(" ")
    )
}

fn chart_card(title: &str, values: &[f64]) -> String {
    format!(
        r#"<div class="card"><h3>{}</h3>{}</div>"#,
        escape_html(title),
        sparkline(values)
    )
}

pub fn dashboard(payload: &DashboardPayload) -> Result<String> {
    let json = serde_json::to_string(payload).context("Failed to serialize dashboard payload")?;

    let forecast: String = payload
        .forecast
        .iter()
        .map(|day| {
            format!(
                r#"<div class="card"><strong>{}</strong><div class="{}">{} AQI</div><div class="muted">{}</div></div>"#,
                escape_html(&day.day),
                escape_html(&day.color_class),
                day.aqi,
                day.status,
            )
        })
        .collect();

    let charts = [
        chart_card("NO₂ trend", &payload.tempo_chart),
        chart_card("PM2.5 trend", &payload.ground_chart),
        chart_card("Temperature, last hours", &payload.weather_chart.temp),
        chart_card("Humidity, last hours", &payload.weather_chart.humidity),
        chart_card("Wind, last hours", &payload.weather_chart.wind),
    ]
    .concat();

    let body = format!(
        r#"<h1>{city}</h1>
    <p class="muted">{lat:.4}, {lon:.4}</p>
    <div class="grid">
        <div class="card">
            <div class="aqi">{aqi}</div>
            <div>{classification}</div>
            <p>{advisory}</p>
        </div>
        <div class="card">
            <h3>NO₂</h3>
            <div>{no2} µg/m³</div>
            <div class="muted">{no2_source}</div>
        </div>
        <div class="card">
            <h3>PM2.5</h3>
            <div>{pm25} µg/m³</div>
            <div class="muted">{station}</div>
        </div>
        <div class="card">
            <h3>Weather {icon}</h3>
            <div>{temp}°C, {humidity}% humidity</div>
            <div>Wind {wind} km/h, rain {rainfall} mm</div>
        </div>
    </div>
    <h2>Trends</h2>
    <div class="grid">{charts}</div>
    <h2>Outlook</h2>
    <div class="grid">{forecast}</div>
    <p>{alerts}</p>
    <p class="muted">{summary}</p>
    <h2>Ask about your air</h2>
    <div class="card">
        <div id="chat-log"></div>
        <form id="chat-form">
            <input id="question" placeholder="Is it safe to go running today?" size="60">
            <button type="submit">Ask</button>
        </form>
    </div>
    <script id="dashboard-data" type="application/json">{json}</script>
    <script>
        const data = JSON.parse(document.getElementById("dashboard-data").textContent);
        document.getElementById("chat-form").addEventListener("submit", async (event) => {{
            event.preventDefault();
            const question = document.getElementById("question").value;
            const response = await fetch(`/chat?lat=${{data.lat}}&lon=${{data.lon}}`, {{
                method: "POST",
                headers: {{ "Content-Type": "application/json" }},
                body: JSON.stringify({{ question }}),
            }});
            const {{ answer }} = await response.json();
            document.getElementById("chat-log").textContent = answer;
        }});
    </script>"#,
        city = escape_html(&payload.city),
        lat = payload.lat,
        lon = payload.lon,
        aqi = payload.aqi,
        classification = payload.classification,
        advisory = escape_html(&payload.advisory),
        no2 = payload.tempo.no2,
        no2_source = escape_html(&payload.tempo.source),
        pm25 = payload.ground.pm25,
        station = escape_html(&payload.ground.station),
        icon = payload.weather.icon,
        temp = payload.weather.temp,
        humidity = payload.weather.humidity,
        wind = payload.weather.wind,
        rainfall = payload.weather.rainfall,
        alerts = escape_html(&payload.alerts),
        summary = escape_html(&payload.summary),
        json = script_safe_json(&json),
    );

    Ok(layout("Dashboard", &body))
}
