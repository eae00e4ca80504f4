use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::types::ChartResult;

const DEFAULT_MESSAGE: &str = "As estrelas brilham para você!";

/// Headline signs of a chart plus the reading shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartSummary {
    pub sun_sign: String,
    pub moon_sign: String,
    pub ascendant: String,
    pub message: String,
}

impl ChartSummary {
    /// `None` when the chart lacks the Sun, the Moon or the Ascendant.
    pub fn from_chart(chart: &ChartResult) -> Option<Self> {
        let sun = &chart.planet("Sun")?.sign;
        let moon = &chart.planet("Moon")?.sign;
        let ascendant = &chart.planet("Ascendant")?.sign;

        let message = format!(
            "{}\n\nSeu Sol em {}, Lua em {} e Ascendente em {} criam uma combinação única e especial!",
            sign_message(sun),
            sun,
            moon,
            ascendant
        );

        Some(Self {
            sun_sign: sun.clone(),
            moon_sign: moon.clone(),
            ascendant: ascendant.clone(),
            message,
        })
    }
}

fn sign_message(sign: &str) -> &'static str {
    match sign {
        "Aries" => "Sua energia ariana te impulsiona a novos começos. Mantenha o foco!",
        "Taurus" => "Sua estabilidade taurina é seu maior tesouro. Aprecie os prazeres simples.",
        "Gemini" => "Sua curiosidade geminiana abre portas. Comunique-se com clareza.",
        "Cancer" => "Sua sensibilidade canceriana é um dom. Cuide de si e dos seus.",
        "Leo" => "Seu brilho leonino ilumina o caminho. Lidere com o coração.",
        "Virgo" => "Sua precisão virginiana faz a diferença. Organize suas prioridades.",
        "Libra" => "Seu equilíbrio libriano harmoniza ambientes. Busque a paz interior.",
        "Scorpio" => "Sua intensidade escorpiana transforma vidas. Confie em sua intuição.",
        "Sagittarius" => "Sua aventura sagitariana expande horizontes. Explore novas ideias.",
        "Capricorn" => "Sua determinação capricorniana constrói impérios. Persista!",
        "Aquarius" => "Sua originalidade aquariana inova. Seja autêntico.",
        "Pisces" => "Sua empatia pisciana conecta almas. Sonhe e crie.",
        _ => DEFAULT_MESSAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::{PlanetPosition, Provenance};

    fn position(planet: &str, sign: &str) -> PlanetPosition {
        PlanetPosition {
            planet: planet.to_string(),
            sign: sign.to_string(),
            degree: 0.0,
            retrograde: false,
        }
    }

    fn chart(planets: Vec<PlanetPosition>) -> ChartResult {
        ChartResult {
            planets,
            source: Provenance::Api,
            warning: None,
        }
    }

    #[test]
    fn summarizes_sun_moon_and_ascendant() {
        let summary = ChartSummary::from_chart(&chart(vec![
            position("Sun", "Leo"),
            position("Moon", "Pisces"),
            position("Mercury", "Virgo"),
            position("Ascendant", "Libra"),
        ]))
        .unwrap();

        assert_eq!(summary.sun_sign, "Leo");
        assert_eq!(summary.moon_sign, "Pisces");
        assert_eq!(summary.ascendant, "Libra");
        assert!(summary.message.starts_with("Seu brilho leonino"));
        assert!(summary
            .message
            .contains("Seu Sol em Leo, Lua em Pisces e Ascendente em Libra"));
    }

    #[test]
    fn unknown_sun_sign_uses_default_message() {
        let summary = ChartSummary::from_chart(&chart(vec![
            position("Sun", "Ophiuchus"),
            position("Moon", "Aries"),
            position("Ascendant", "Aries"),
        ]))
        .unwrap();

        assert!(summary.message.starts_with(DEFAULT_MESSAGE));
    }

    #[test]
    fn missing_ascendant_yields_none() {
        let partial = chart(vec![position("Sun", "Leo"), position("Moon", "Leo")]);
        assert!(ChartSummary::from_chart(&partial).is_none());
    }
}
