//! Raw ANM wire models and parsing
//!
//! Two formats: the predictions endpoint answers JSON (an envelope with a `d`
//! array of prediction records), the stop directory answers one XML document
//! with a `Palina` element per stop. Prediction times are `HH:mm` strings and
//! have to be resolved to absolute timestamps here.

use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike};
use domain::entities::{Prediction, StopInfo};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::warn;

use crate::error::AnmError;

/// Record status marking an empty (but valid) answer for a stop
pub(crate) const NO_INFORMATION_SENTINEL: &str = "Nessuna informazione alla palina.";

/// Record status marking a rejected API key
pub(crate) const INVALID_KEY_SENTINEL: &str = "Chiave non valida";

/// Envelope of the predictions endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct RawPredictionsResponse {
    #[serde(default)]
    pub d: Vec<RawPredictionRecord>,
}

/// One prediction record as published by the service
#[derive(Debug, Deserialize)]
pub(crate) struct RawPredictionRecord {
    #[serde(default)]
    pub stato: Option<String>,
    #[serde(default)]
    pub linea: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Decoded predictions payload
#[derive(Debug)]
pub(crate) enum PredictionsPayload {
    /// Usable prediction records
    Arrivals(Vec<Prediction>),
    /// The stop currently has no information (valid, empty answer)
    NoInformation,
    /// The service rejected the API key
    InvalidKey,
}

/// Parse the predictions JSON envelope
///
/// `now` anchors the `HH:mm` resolution; records with missing or unparseable
/// fields are skipped with a warning rather than failing the whole payload.
pub(crate) fn parse_predictions<Tz: TimeZone>(
    body: &str,
    now: &DateTime<Tz>,
) -> Result<PredictionsPayload, AnmError> {
    let raw: RawPredictionsResponse = serde_json::from_str(body)
        .map_err(|e| AnmError::ParseError(format!("malformed predictions payload: {e}")))?;

    if let Some(first) = raw.d.first() {
        match first.stato.as_deref() {
            Some(INVALID_KEY_SENTINEL) => return Ok(PredictionsPayload::InvalidKey),
            Some(NO_INFORMATION_SENTINEL) => return Ok(PredictionsPayload::NoInformation),
            _ => {},
        }
    }

    let mut predictions = Vec::with_capacity(raw.d.len());
    for record in raw.d {
        if record.stato.as_deref() == Some(NO_INFORMATION_SENTINEL) {
            continue;
        }

        let Some(line) = record.linea.as_deref().map(str::trim).filter(|l| !l.is_empty())
        else {
            warn!("Skipping prediction record without a line code");
            continue;
        };

        let Some(raw_time) = record.time.as_deref() else {
            warn!(line, "Skipping prediction record without a time");
            continue;
        };

        let arrival_time = match resolve_arrival_time(raw_time, now) {
            Ok(resolved) => resolved.with_timezone(&chrono::Utc),
            Err(err) => {
                warn!(line, time = raw_time, error = %err, "Skipping unparseable prediction time");
                continue;
            },
        };

        predictions.push(Prediction {
            line: line.to_string(),
            destination: record.nome.unwrap_or_default().trim().to_string(),
            arrival_time,
            vehicle_id: record.id.unwrap_or_default().trim().to_string(),
        });
    }

    Ok(PredictionsPayload::Arrivals(predictions))
}

/// Resolve an `HH:mm` wire time against the current local date
///
/// The feed carries no date. A time strictly earlier than the current minute
/// is the next calendar day (midnight rollover); the current minute itself
/// stays today.
pub(crate) fn resolve_arrival_time<Tz: TimeZone>(
    raw: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, AnmError> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| AnmError::ParseError(format!("invalid time '{raw}': {e}")))?;

    let now_minute = now
        .time()
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or_else(|| now.time());

    let date = if time < now_minute {
        now.date_naive() + Days::new(1)
    } else {
        now.date_naive()
    };

    now.timezone()
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| {
            AnmError::ParseError(format!("time '{raw}' does not exist in the local timezone"))
        })
}

#[derive(Debug, Default)]
struct PartialStop {
    id: String,
    name: String,
    latitude: String,
    longitude: String,
    status: String,
}

#[derive(Debug, Clone, Copy)]
enum StopField {
    Id,
    Name,
    Latitude,
    Longitude,
    Status,
}

/// Parse the stop directory XML document
///
/// Entries without an id are dropped, matching the service's own web client.
pub(crate) fn parse_stop_directory(xml: &str) -> Result<Vec<StopInfo>, AnmError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stops = Vec::new();
    let mut current: Option<PartialStop> = None;
    let mut field: Option<StopField> = None;

    loop {
        match reader.read_event() {
            Err(e) => {
                return Err(AnmError::ParseError(format!(
                    "malformed stop directory XML: {e}"
                )));
            },
            Ok(Event::Eof) => break,
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"Palina" => current = Some(PartialStop::default()),
                b"id" => field = Some(StopField::Id),
                b"nome" => field = Some(StopField::Name),
                b"lat" => field = Some(StopField::Latitude),
                b"lon" => field = Some(StopField::Longitude),
                b"stato" => field = Some(StopField::Status),
                _ => field = None,
            },
            Ok(Event::Text(text)) => {
                if let (Some(stop), Some(field)) = (current.as_mut(), field) {
                    let value = text
                        .unescape()
                        .map_err(|e| AnmError::ParseError(e.to_string()))?
                        .into_owned();
                    match field {
                        StopField::Id => stop.id = value,
                        StopField::Name => stop.name = value,
                        StopField::Latitude => stop.latitude = value,
                        StopField::Longitude => stop.longitude = value,
                        StopField::Status => stop.status = value,
                    }
                }
            },
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"Palina" => {
                    if let Some(stop) = current.take() {
                        if !stop.id.is_empty() {
                            stops.push(StopInfo {
                                id: stop.id,
                                name: stop.name,
                                latitude: stop.latitude.parse().unwrap_or_default(),
                                longitude: stop.longitude.parse().unwrap_or_default(),
                                status: stop.status,
                            });
                        }
                    }
                },
                _ => field = None,
            },
            Ok(_) => {},
        }
    }

    Ok(stops)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    fn rome_now(hour: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, hour, min, 0)
            .unwrap()
    }

    #[test]
    fn later_time_resolves_to_today() {
        let now = rome_now(8, 0);
        let resolved = resolve_arrival_time("09:46", &now).unwrap();
        assert_eq!(resolved.date_naive(), now.date_naive());
        assert_eq!(resolved.format("%H:%M").to_string(), "09:46");
    }

    #[test]
    fn earlier_time_rolls_over_to_tomorrow() {
        let now = rome_now(23, 50);
        let resolved = resolve_arrival_time("00:05", &now).unwrap();
        assert_eq!(resolved.date_naive(), now.date_naive() + Days::new(1));
        assert_eq!(resolved.format("%H:%M").to_string(), "00:05");
    }

    #[test]
    fn current_minute_stays_today() {
        let now = rome_now(8, 0) + chrono::Duration::seconds(30);
        let resolved = resolve_arrival_time("08:00", &now).unwrap();
        assert_eq!(resolved.date_naive(), now.date_naive());
    }

    #[test]
    fn garbage_time_is_rejected() {
        let now = rome_now(8, 0);
        assert!(resolve_arrival_time("soon", &now).is_err());
        assert!(resolve_arrival_time("25:99", &now).is_err());
        assert!(resolve_arrival_time("", &now).is_err());
    }

    #[test]
    fn predictions_are_parsed_and_time_resolved() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap();
        let body = r#"{
            "d": [
                {"linea": "151", "time": "08:05", "nome": "GIULIO CESARE - San Vitale", "id": "2103"},
                {"linea": " R2 ", "time": "08:02", "nome": "STAZIONE CENTRALE", "id": "2104"}
            ]
        }"#;

        let PredictionsPayload::Arrivals(predictions) = parse_predictions(body, &now).unwrap()
        else {
            unreachable!("expected arrivals");
        };

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].line, "151");
        assert_eq!(predictions[0].destination, "GIULIO CESARE - San Vitale");
        assert_eq!(predictions[0].vehicle_id, "2103");
        assert_eq!(predictions[0].arrival_time, now + chrono::Duration::minutes(5));
        assert_eq!(predictions[1].line, "R2");
    }

    #[test]
    fn invalid_key_sentinel_is_detected() {
        let now = Utc::now();
        let body = r#"{"d": [{"stato": "Chiave non valida"}]}"#;
        assert!(matches!(
            parse_predictions(body, &now).unwrap(),
            PredictionsPayload::InvalidKey
        ));
    }

    #[test]
    fn no_information_sentinel_yields_empty_answer() {
        let now = Utc::now();
        let body = r#"{"d": [{"stato": "Nessuna informazione alla palina."}]}"#;
        assert!(matches!(
            parse_predictions(body, &now).unwrap(),
            PredictionsPayload::NoInformation
        ));
    }

    #[test]
    fn records_with_missing_fields_are_skipped() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap();
        let body = r#"{
            "d": [
                {"linea": "151", "time": "08:05", "nome": "A", "id": "1"},
                {"linea": "", "time": "08:06", "nome": "B", "id": "2"},
                {"linea": "R2", "nome": "C", "id": "3"},
                {"linea": "R4", "time": "later", "nome": "D", "id": "4"}
            ]
        }"#;

        let PredictionsPayload::Arrivals(predictions) = parse_predictions(body, &now).unwrap()
        else {
            unreachable!("expected arrivals");
        };
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].line, "151");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let now = Utc::now();
        assert!(matches!(
            parse_predictions("not json", &now),
            Err(AnmError::ParseError(_))
        ));
    }

    #[test]
    fn empty_envelope_is_an_empty_arrival_list() {
        let now = Utc::now();
        let PredictionsPayload::Arrivals(predictions) =
            parse_predictions(r#"{"d": []}"#, &now).unwrap()
        else {
            unreachable!("expected arrivals");
        };
        assert!(predictions.is_empty());
    }

    #[test]
    fn stop_directory_is_parsed() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <ArrayOfPalina>
                <Palina>
                    <id>2103</id>
                    <nome>Piazza Dante</nome>
                    <lat>40.848</lat>
                    <lon>14.250</lon>
                    <stato>1</stato>
                </Palina>
                <Palina>
                    <id>4012</id>
                    <nome>Museo &amp; Cavour</nome>
                    <lat>40.853</lat>
                    <lon>14.254</lon>
                    <stato>1</stato>
                </Palina>
            </ArrayOfPalina>"#;

        let stops = parse_stop_directory(xml).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].id, "2103");
        assert_eq!(stops[0].name, "Piazza Dante");
        assert!((stops[0].latitude - 40.848).abs() < 1e-9);
        assert_eq!(stops[1].name, "Museo & Cavour");
    }

    #[test]
    fn directory_entries_without_id_are_dropped() {
        let xml = r"<ArrayOfPalina>
                <Palina><nome>Ghost stop</nome></Palina>
                <Palina><id>2103</id><nome>Piazza Dante</nome></Palina>
            </ArrayOfPalina>";

        let stops = parse_stop_directory(xml).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].id, "2103");
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(
            parse_stop_directory("<ArrayOfPalina><Palina></ArrayOfPalina>"),
            Err(AnmError::ParseError(_))
        ));
    }

    mod rollover_properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_wire_time_resolves_to_the_nearest_future_occurrence(
                hour in 0u32..24,
                minute in 0u32..60,
            ) {
                let now = rome_now(12, 30);
                let raw = format!("{hour:02}:{minute:02}");
                let resolved = resolve_arrival_time(&raw, &now).unwrap();

                // Strictly earlier than the current minute rolls to tomorrow,
                // everything else stays today; the clock face is preserved.
                if (hour, minute) < (12, 30) {
                    prop_assert_eq!(resolved.date_naive(), now.date_naive() + Days::new(1));
                } else {
                    prop_assert_eq!(resolved.date_naive(), now.date_naive());
                }
                prop_assert_eq!(resolved.format("%H:%M").to_string(), raw);
                prop_assert!(resolved + chrono::Duration::seconds(59) >= now);
            }
        }
    }
}
