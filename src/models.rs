use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// One historical match returned by the answer service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Match {
    #[serde(deserialize_with = "lenient_text")]
    pub match_id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tournament_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tournament_level: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tournament_country: String,
    #[serde(deserialize_with = "lenient_text")]
    pub surface: String,
    #[serde(deserialize_with = "lenient_text")]
    pub round: String,
    #[serde(deserialize_with = "lenient_text")]
    pub winner_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub winner_country: String,
    #[serde(deserialize_with = "lenient_text")]
    pub loser_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub loser_country: String,
    #[serde(deserialize_with = "lenient_text")]
    pub score: String,
    #[serde(deserialize_with = "lenient_number")]
    pub similarity: f64,
}

/// Strings pass through and numbers keep their text. `null` or any other
/// shape reads as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

impl Match {
    pub fn level_name(&self) -> String {
        TournamentLevel::from_code(&self.tournament_level)
            .map(|level| level.display_name().to_string())
            .unwrap_or_else(|| self.tournament_level.clone())
    }

    pub fn surface_kind(&self) -> Surface {
        Surface::from_wire(&self.surface)
    }

    /// Date embedded in the description as the first run of 8 digits.
    pub fn played_on(&self) -> Option<NaiveDate> {
        let re = Regex::new(r"\d{8}").ok()?;
        let digits = re.find(&self.description)?.as_str();
        NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
    }

    /// `January 27, 2008`, or empty when the description carries no date.
    pub fn formatted_date(&self) -> String {
        self.played_on()
            .map(|date| date.format("%B %-d, %Y").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentLevel {
    GrandSlam,
    Masters1000,
    TourFinals,
    Atp500,
    Atp250,
    DavisCup,
}

impl TournamentLevel {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G" => Some(TournamentLevel::GrandSlam),
            "M" => Some(TournamentLevel::Masters1000),
            "F" => Some(TournamentLevel::TourFinals),
            "A" => Some(TournamentLevel::Atp500),
            "B" => Some(TournamentLevel::Atp250),
            "D" => Some(TournamentLevel::DavisCup),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TournamentLevel::GrandSlam => "Grand Slam",
            TournamentLevel::Masters1000 => "Masters 1000",
            TournamentLevel::TourFinals => "Tour Finals",
            TournamentLevel::Atp500 => "ATP 500",
            TournamentLevel::Atp250 => "ATP 250",
            TournamentLevel::DavisCup => "Davis Cup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Carpet,
    Other,
}

impl Surface {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Hard" => Surface::Hard,
            "Clay" => Surface::Clay,
            "Grass" => Surface::Grass,
            "Carpet" => Surface::Carpet,
            _ => Surface::Other,
        }
    }

    /// CSS class used by the web page for card styling.
    pub fn css_class(self) -> &'static str {
        match self {
            Surface::Hard => "surface-hard",
            Surface::Clay => "surface-clay",
            Surface::Grass => "surface-grass",
            Surface::Carpet => "surface-carpet",
            Surface::Other => "surface-default",
        }
    }
}

pub fn country_display(code: &str) -> String {
    code.to_uppercase()
}

/// Answer produced for a single query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnswerResult {
    pub response: String,
    pub matches: Vec<Match>,
    pub analysis: String,
}

impl AnswerResult {
    /// Decodes a response body leniently: anything missing or of the wrong
    /// shape becomes empty, field by field, and a match entry that is not an
    /// object is kept as an empty record so later entries keep their citation
    /// numbers.
    pub fn from_body(body: &str) -> Self {
        let value = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("answer body is not valid JSON, using empty result: {}", err);
                return Self::default();
            }
        };

        let text_field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let matches = value
            .get("matches")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .map(|(idx, entry)| {
                        serde_json::from_value::<Match>(entry.clone()).unwrap_or_else(|err| {
                            tracing::warn!("match entry {} could not be decoded: {}", idx + 1, err);
                            Match::default()
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            response: text_field("response"),
            matches,
            analysis: text_field("analysis"),
        }
    }

    /// Citation `n` refers to the match at 1-based position `n`. This is the
    /// only place that coupling is expressed.
    pub fn match_for_citation(&self, n: usize) -> Option<&Match> {
        n.checked_sub(1).and_then(|idx| self.matches.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_codes_map_to_names_and_unknown_passes_through() {
        let mut m = Match {
            tournament_level: "G".to_string(),
            ..Match::default()
        };
        assert_eq!(m.level_name(), "Grand Slam");

        m.tournament_level = "D".to_string();
        assert_eq!(m.level_name(), "Davis Cup");

        m.tournament_level = "C".to_string();
        assert_eq!(m.level_name(), "C");
    }

    #[test]
    fn date_is_read_from_description() {
        let m = Match {
            description: "2008-540 Wimbledon 20080706 F".to_string(),
            ..Match::default()
        };
        assert_eq!(m.played_on(), NaiveDate::from_ymd_opt(2008, 7, 6));
        assert_eq!(m.formatted_date(), "July 6, 2008");
    }

    #[test]
    fn invalid_or_missing_date_formats_empty() {
        let m = Match {
            description: "no date here".to_string(),
            ..Match::default()
        };
        assert_eq!(m.formatted_date(), "");

        let m = Match {
            description: "20081345".to_string(),
            ..Match::default()
        };
        assert!(m.played_on().is_none());
    }

    #[test]
    fn surface_falls_back_to_default_styling() {
        assert_eq!(Surface::from_wire("Clay"), Surface::Clay);
        assert_eq!(Surface::from_wire("clay"), Surface::Other);
        assert_eq!(Surface::Other.css_class(), "surface-default");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let result = AnswerResult::from_body(r#"{"response": "Federer won [1]."}"#);
        assert_eq!(result.response, "Federer won [1].");
        assert!(result.matches.is_empty());
        assert_eq!(result.analysis, "");
    }

    #[test]
    fn malformed_body_yields_empty_result() {
        assert_eq!(AnswerResult::from_body("<html>oops"), AnswerResult::default());
        assert_eq!(
            AnswerResult::from_body(r#"{"response": 42, "matches": "nope"}"#),
            AnswerResult::default()
        );
    }

    #[test]
    fn bad_match_entry_keeps_its_position() {
        let body = r#"{
            "response": "see [2]",
            "matches": [
                "not an object",
                {"match_id": "m2", "winner_name": "Rafael Nadal", "similarity": 0.91}
            ]
        }"#;
        let result = AnswerResult::from_body(body);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0], Match::default());

        let cited = result.match_for_citation(2).map(|m| m.winner_name.as_str());
        assert_eq!(cited, Some("Rafael Nadal"));
    }

    #[test]
    fn null_or_mistyped_field_keeps_rest_of_match() {
        let body = r#"{
            "response": "see [1]",
            "matches": [
                {"match_id": "m1", "winner_name": "Rafael Nadal",
                 "loser_country": null, "similarity": 0.9},
                {"match_id": "m2", "round": 7, "surface": ["Clay"], "similarity": "0.75"}
            ]
        }"#;
        let result = AnswerResult::from_body(body);
        assert_eq!(result.matches.len(), 2);

        let first = &result.matches[0];
        assert_eq!(first.match_id, "m1");
        assert_eq!(first.winner_name, "Rafael Nadal");
        assert_eq!(first.loser_country, "");
        assert_eq!(first.similarity, 0.9);

        let second = &result.matches[1];
        assert_eq!(second.match_id, "m2");
        assert_eq!(second.round, "7");
        assert_eq!(second.surface, "");
        assert_eq!(second.similarity, 0.75);
    }

    #[test]
    fn citation_lookup_is_one_based() {
        let result = AnswerResult {
            matches: vec![Match {
                match_id: "first".to_string(),
                ..Match::default()
            }],
            ..AnswerResult::default()
        };
        assert!(result.match_for_citation(0).is_none());
        assert_eq!(
            result.match_for_citation(1).map(|m| m.match_id.as_str()),
            Some("first")
        );
        assert!(result.match_for_citation(2).is_none());
    }
}
