use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::AstroError;
use super::types::{
    BirthQuery, ChartOptions, ChartResult, PlanetPosition, Provenance, PLANETS,
};

pub const DEFAULT_ENDPOINTS: [&str; 4] = [
    "https://json.freeastrologyapi.com/western/planets",
    "https://api.freeastrologyapi.com/western/planets",
    "https://freeastrologyapi.com/api/western/planets",
    "https://json.freeastrologyapi.com/planets",
];

const USER_AGENT: &str = concat!("portal-astro/", env!("CARGO_PKG_VERSION"));

/// Per-attempt timeout and the fixed pause taken before moving on to the
/// next endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct PlanetsRequest<'a> {
    year: i32,
    month: u32,
    date: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
    latitude: f64,
    longitude: f64,
    timezone: f64,
    config: &'a ChartOptions,
}

impl<'a> From<&'a BirthQuery> for PlanetsRequest<'a> {
    fn from(query: &'a BirthQuery) -> Self {
        PlanetsRequest {
            year: query.year(),
            month: query.month(),
            date: query.day(),
            hours: query.hour(),
            minutes: query.minute(),
            seconds: query.second(),
            latitude: query.latitude(),
            longitude: query.longitude(),
            timezone: query.timezone_offset(),
            config: query.options(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlanetsResponse {
    #[serde(default)]
    output: Option<Vec<WirePlanet>>,
}

#[derive(Debug, Deserialize)]
struct LocalizedName {
    en: String,
}

#[derive(Debug, Deserialize)]
struct WireSign {
    name: LocalizedName,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireFlag {
    Bool(bool),
    Text(String),
}

impl WireFlag {
    fn is_set(&self) -> bool {
        match self {
            WireFlag::Bool(b) => *b,
            WireFlag::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WirePlanet {
    planet: LocalizedName,
    zodiac_sign: WireSign,
    #[serde(rename = "normDegree")]
    norm_degree: f64,
    #[serde(rename = "isRetro")]
    is_retro: WireFlag,
}

impl From<WirePlanet> for PlanetPosition {
    fn from(wire: WirePlanet) -> Self {
        PlanetPosition {
            planet: wire.planet.en,
            sign: wire.zodiac_sign.name.en,
            degree: wire.norm_degree,
            retrograde: wire.is_retro.is_set(),
        }
    }
}

fn parse_output(body: &str) -> Result<Vec<PlanetPosition>, AstroError> {
    let response: PlanetsResponse =
        serde_json::from_str(body).map_err(|e| AstroError::MalformedBody(e.to_string()))?;

    let output = match response.output {
        Some(output) if !output.is_empty() => output,
        _ => return Err(AstroError::MalformedBody("missing or empty output".to_string())),
    };

    // Keep the fixed body list in order; anything else the provider adds is dropped.
    let mut by_name: HashMap<String, PlanetPosition> = output
        .into_iter()
        .map(PlanetPosition::from)
        .map(|position| (position.planet.clone(), position))
        .collect();

    PLANETS
        .iter()
        .map(|name| {
            by_name
                .remove(*name)
                .ok_or_else(|| AstroError::MalformedBody(format!("output is missing {name}")))
        })
        .collect()
}

/// Client for the planet-position service, tried across an ordered list of
/// mirror endpoints.
pub struct AstrologyClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    policy: RetryPolicy,
}

impl AstrologyClient {
    pub fn new(endpoints: Vec<String>, policy: RetryPolicy) -> Result<Self, AstroError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            endpoints,
            policy,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Walk the endpoint list once. Returns on the first usable response, on
    /// an authentication or rate-limit rejection, or after the last endpoint.
    pub async fn fetch_planet_positions(
        &self,
        query: &BirthQuery,
        api_key: &str,
    ) -> Result<ChartResult, AstroError> {
        let body = PlanetsRequest::from(query);
        let total = self.endpoints.len();
        let mut last_error: Option<String> = None;

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            log::info!("Astrology request attempt {}/{}: {}", i + 1, total, endpoint);

            match self.attempt(endpoint, &body, api_key).await {
                Ok(planets) => {
                    log::info!("Astrology API answered from {}", endpoint);
                    return Ok(ChartResult {
                        planets,
                        source: Provenance::Api,
                        warning: None,
                    });
                }
                Err(e) if e.is_terminal() => {
                    log::warn!("Astrology API rejected request at {}: {}", endpoint, e);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!("Attempt {} against {} failed: {}", i + 1, endpoint, e);
                    last_error = Some(e.to_string());
                    if i + 1 < total {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        Err(AstroError::AllEndpointsFailed {
            attempts: total,
            last: last_error.unwrap_or_else(|| "no endpoints configured".to_string()),
        })
    }

    async fn attempt(
        &self,
        endpoint: &str,
        body: &PlanetsRequest<'_>,
        api_key: &str,
    ) -> Result<Vec<PlanetPosition>, AstroError> {
        let response = self
            .http
            .post(endpoint)
            .timeout(self.policy.timeout)
            .header("x-api-key", api_key)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(AstroError::Authentication),
            StatusCode::TOO_MANY_REQUESTS => return Err(AstroError::RateLimited),
            other => return Err(AstroError::UpstreamStatus(other.as_u16())),
        }

        let text = response.text().await?;
        parse_output(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::testing::{api_output, fast_policy, sao_paulo_query};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Instant;

    fn client_for(endpoints: Vec<String>) -> AstrologyClient {
        AstrologyClient::new(endpoints, fast_policy()).unwrap()
    }

    #[tokio::test]
    async fn first_successful_endpoint_short_circuits() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(POST).path("/primary");
                then.status(200).json_body(api_output());
            })
            .await;
        let mirror = server
            .mock_async(|when, then| {
                when.method(POST).path("/mirror");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/primary"), server.url("/mirror")]);
        let chart = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap();

        assert_eq!(chart.source, Provenance::Api);
        assert_eq!(chart.planets.len(), 11);
        assert!(chart.warning.is_none());
        primary.assert_async().await;
        mirror.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn sends_expected_payload_and_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/western/planets")
                    .header("x-api-key", "secret-key")
                    .header("accept", "application/json")
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "year": 1990,
                        "month": 1,
                        "date": 15,
                        "hours": 12,
                        "minutes": 0,
                        "seconds": 0,
                        "latitude": -23.5505,
                        "longitude": -46.6333,
                        "timezone": -3.0,
                        "config": {
                            "observation_point": "topocentric",
                            "ayanamsha": "tropical",
                            "language": "en"
                        }
                    }));
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/western/planets")]);
        let chart = client
            .fetch_planet_positions(&sao_paulo_query(), "secret-key")
            .await
            .unwrap();

        mock.assert_async().await;
        let sun = chart.planet("Sun").unwrap();
        assert_eq!(sun.sign, "Capricorn");
        assert!(!sun.retrograde);
        assert!(chart.planet("Mercury").unwrap().retrograde);
    }

    #[tokio::test]
    async fn server_errors_advance_to_next_endpoint() {
        let server = MockServer::start_async().await;
        let broken = server
            .mock_async(|when, then| {
                when.method(POST).path("/broken");
                then.status(503);
            })
            .await;
        let healthy = server
            .mock_async(|when, then| {
                when.method(POST).path("/healthy");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/broken"), server.url("/healthy")]);
        let chart = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap();

        assert_eq!(chart.source, Provenance::Api);
        broken.assert_async().await;
        healthy.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_is_terminal() {
        let server = MockServer::start_async().await;
        let rejecting = server
            .mock_async(|when, then| {
                when.method(POST).path("/first");
                then.status(401);
            })
            .await;
        let untouched = server
            .mock_async(|when, then| {
                when.method(POST).path("/second");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/first"), server.url("/second")]);
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "expired")
            .await
            .unwrap_err();

        assert!(matches!(err, AstroError::Authentication));
        assert!(err.to_string().contains("inválida ou expirada"));
        rejecting.assert_async().await;
        untouched.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn rate_limit_is_terminal() {
        let server = MockServer::start_async().await;
        let limited = server
            .mock_async(|when, then| {
                when.method(POST).path("/first");
                then.status(429);
            })
            .await;
        let untouched = server
            .mock_async(|when, then| {
                when.method(POST).path("/second");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/first"), server.url("/second")]);
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        assert!(matches!(err, AstroError::RateLimited));
        limited.assert_async().await;
        untouched.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn not_found_everywhere_becomes_aggregate_error() {
        let server = MockServer::start_async().await;
        let missing = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(404);
            })
            .await;

        let client = client_for(vec![server.url("/a"), server.url("/b")]);
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        match err {
            AstroError::AllEndpointsFailed { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(last.contains("404"), "unexpected last error: {last}");
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
        missing.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn empty_output_is_not_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/empty");
                then.status(200).json_body(json!({ "output": [] }));
            })
            .await;
        let fallback = server
            .mock_async(|when, then| {
                when.method(POST).path("/full");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/empty"), server.url("/full")]);
        let chart = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap();

        assert_eq!(chart.planets.len(), 11);
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/slow")]);
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        match err {
            AstroError::AllEndpointsFailed { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_endpoints_configured() {
        let client = client_for(Vec::new());
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AstroError::AllEndpointsFailed { attempts: 0, .. }
        ));
    }

    #[tokio::test]
    async fn partial_output_advances_to_next_endpoint() {
        let server = MockServer::start_async().await;
        let partial = server
            .mock_async(|when, then| {
                when.method(POST).path("/partial");
                then.status(200).json_body(json!({
                    "output": [
                        { "planet": { "en": "Sun" }, "zodiac_sign": { "name": { "en": "Leo" } },
                          "normDegree": 130.5, "isRetro": "False" }
                    ]
                }));
            })
            .await;
        let full = server
            .mock_async(|when, then| {
                when.method(POST).path("/full");
                then.status(200).json_body(api_output());
            })
            .await;

        let client = client_for(vec![server.url("/partial"), server.url("/full")]);
        let chart = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap();

        assert_eq!(chart.planets.len(), 11);
        assert_eq!(chart.planet("Sun").unwrap().sign, "Capricorn");
        partial.assert_async().await;
        full.assert_async().await;
    }

    #[tokio::test]
    async fn backoff_separates_attempts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;

        let policy = RetryPolicy {
            timeout: Duration::from_millis(300),
            backoff: Duration::from_millis(200),
        };
        let client = AstrologyClient::new(vec![server.url("/a"), server.url("/b")], policy).unwrap();

        let started = Instant::now();
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        assert!(matches!(err, AstroError::AllEndpointsFailed { attempts: 2, .. }));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn no_backoff_after_last_endpoint() {
        let server = MockServer::start_async().await;
        let failing = server
            .mock_async(|when, then| {
                when.method(POST).path("/only");
                then.status(500);
            })
            .await;

        let policy = RetryPolicy {
            timeout: Duration::from_millis(300),
            backoff: Duration::from_secs(1),
        };
        let client = AstrologyClient::new(vec![server.url("/only")], policy).unwrap();

        let started = Instant::now();
        let err = client
            .fetch_planet_positions(&sao_paulo_query(), "key")
            .await
            .unwrap_err();

        assert!(matches!(err, AstroError::AllEndpointsFailed { attempts: 1, .. }));
        assert!(started.elapsed() < Duration::from_millis(500));
        failing.assert_async().await;
    }

    #[test]
    fn parses_boolean_and_string_retro_flags() {
        let mut body = api_output();
        body["output"][4]["isRetro"] = json!(true);
        body["output"][0]["isRetro"] = json!(false);

        let planets = parse_output(&body.to_string()).unwrap();
        assert_eq!(planets[0].planet, "Sun");
        assert!(!planets[0].retrograde);
        assert_eq!(planets[2].planet, "Mercury");
        assert!(planets[2].retrograde);
        assert_eq!(planets[4].planet, "Mars");
        assert!(planets[4].retrograde);
    }

    #[test]
    fn extra_bodies_are_dropped_and_order_is_fixed() {
        let mut body = api_output();
        let output = body["output"].as_array_mut().unwrap();
        output.reverse();
        output.insert(
            3,
            json!({ "planet": { "en": "Chiron" }, "zodiac_sign": { "name": { "en": "Cancer" } },
                    "normDegree": 101.0, "isRetro": "True" }),
        );
        output.push(
            json!({ "planet": { "en": "True Node" }, "zodiac_sign": { "name": { "en": "Aquarius" } },
                    "normDegree": 310.2, "isRetro": "True" }),
        );

        let planets = parse_output(&body.to_string()).unwrap();
        let names: Vec<_> = planets.iter().map(|p| p.planet.as_str()).collect();
        assert_eq!(names, PLANETS);
        assert_eq!(planets[10].sign, "Aries");
    }

    #[test]
    fn missing_body_is_malformed() {
        let mut body = api_output();
        body["output"].as_array_mut().unwrap().pop();

        match parse_output(&body.to_string()) {
            Err(AstroError::MalformedBody(msg)) => assert!(msg.contains("Ascendant"), "{msg}"),
            other => panic!("expected malformed body, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(matches!(
            parse_output("<html>maintenance</html>"),
            Err(AstroError::MalformedBody(_))
        ));
        assert!(matches!(
            parse_output("{}"),
            Err(AstroError::MalformedBody(_))
        ));
    }
}
