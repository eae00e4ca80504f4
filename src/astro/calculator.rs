use super::client::AstrologyClient;
use super::fallback::FallbackGenerator;
use super::types::{BirthQuery, ChartResult};

pub const DEGRADED_WARNING: &str = "API temporariamente indisponível. Dados simulados gerados.";

/// Entry point for chart computation. Always yields a chart: real data when
/// the service answers, simulated data with a warning otherwise.
pub struct ResilientCalculator {
    client: AstrologyClient,
    fallback: FallbackGenerator,
}

impl ResilientCalculator {
    pub fn new(client: AstrologyClient, fallback: FallbackGenerator) -> Self {
        Self { client, fallback }
    }

    pub fn client(&self) -> &AstrologyClient {
        &self.client
    }

    pub async fn compute_chart(&self, query: &BirthQuery, api_key: &str) -> ChartResult {
        match self.client.fetch_planet_positions(query, api_key).await {
            Ok(chart) => chart,
            Err(e) => {
                log::warn!("Astrology API unavailable, using simulated data: {}", e);
                let mut chart = self.fallback.generate(query);
                chart.warning = Some(DEGRADED_WARNING.to_string());
                chart
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::testing::{api_output, fast_policy, sao_paulo_query};
    use crate::astro::{Provenance, ZODIAC_SIGNS};
    use httpmock::prelude::*;

    fn calculator_for(endpoints: Vec<String>) -> ResilientCalculator {
        let client = AstrologyClient::new(endpoints, fast_policy()).unwrap();
        ResilientCalculator::new(client, FallbackGenerator::new())
    }

    #[tokio::test]
    async fn returns_api_chart_when_available() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/planets");
                then.status(200).json_body(api_output());
            })
            .await;

        let calculator = calculator_for(vec![server.url("/planets")]);
        let chart = calculator.compute_chart(&sao_paulo_query(), "key").await;

        assert_eq!(chart.source, Provenance::Api);
        assert_eq!(chart.planets.len(), 11);
        assert!(chart.warning.is_none());
    }

    #[tokio::test]
    async fn unauthorized_key_degrades_to_simulated_chart() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/planets");
                then.status(401);
            })
            .await;

        let calculator = calculator_for(vec![server.url("/planets")]);
        let chart = calculator.compute_chart(&sao_paulo_query(), "bad").await;

        assert_eq!(chart.source, Provenance::Simulated);
        assert_eq!(chart.warning.as_deref(), Some(DEGRADED_WARNING));
    }

    #[tokio::test]
    async fn total_outage_yields_simulated_chart() {
        let server = MockServer::start_async().await;
        let failing = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;

        let calculator = calculator_for(vec![
            server.url("/one"),
            server.url("/two"),
            server.url("/three"),
        ]);
        let chart = calculator.compute_chart(&sao_paulo_query(), "key").await;

        // single pass over the endpoint list
        failing.assert_calls_async(3).await;

        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["source"], "simulado");
        assert!(!chart.warning.unwrap_or_default().is_empty());
        assert_eq!(chart.planets.len(), 11);
        assert!(chart
            .planets
            .iter()
            .all(|p| ZODIAC_SIGNS.contains(&p.sign.as_str())));
    }

    #[tokio::test]
    async fn unreachable_host_yields_simulated_chart() {
        let calculator = calculator_for(vec!["http://127.0.0.1:9/western/planets".to_string()]);
        let chart = calculator.compute_chart(&sao_paulo_query(), "key").await;

        assert_eq!(chart.source, Provenance::Simulated);
        assert!(chart.warning.is_some());
    }
}
