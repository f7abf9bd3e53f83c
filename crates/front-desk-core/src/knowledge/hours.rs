//! Weekly opening hours and the bookable start times they produce.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::Deserialize;

use crate::models::validation;

/// Opening window per weekday; `None` means closed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Option<String>>")]
pub struct OpeningHours {
    days: [Option<(NaiveTime, NaiveTime)>; 7],
}

impl OpeningHours {
    /// Opening window on a given weekday.
    pub fn window(&self, weekday: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        self.days[weekday.num_days_from_monday() as usize]
    }

    /// Slot start times on `date` such that each whole slot fits before closing.
    pub fn slot_starts(&self, date: NaiveDate, slot_minutes: u32) -> Vec<NaiveTime> {
        let Some((open, close)) = self.window(date.weekday()) else {
            return Vec::new();
        };
        if slot_minutes == 0 {
            return Vec::new();
        }

        let close = minutes_of_day(close);
        let mut starts = Vec::new();
        let mut minute = minutes_of_day(open);
        while minute + slot_minutes <= close {
            if let Some(time) = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0) {
                starts.push(time);
            }
            minute += slot_minutes;
        }
        starts
    }

    /// Human-readable window for a weekday, e.g. `09:00-18:00` or `closed`.
    pub fn describe(&self, weekday: Weekday) -> String {
        match self.window(weekday) {
            Some((open, close)) => format!("{}-{}", open.format("%H:%M"), close.format("%H:%M")),
            None => "closed".to_string(),
        }
    }
}

fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Parse a weekday name in English or Italian, accents optional.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let name = raw.trim().to_lowercase();
    if let Ok(weekday) = name.parse::<Weekday>() {
        return Some(weekday);
    }
    match name.trim_end_matches(&['ì', 'i'][..]) {
        "luned" => Some(Weekday::Mon),
        "marted" => Some(Weekday::Tue),
        "mercoled" => Some(Weekday::Wed),
        "gioved" => Some(Weekday::Thu),
        "venerd" => Some(Weekday::Fri),
        "sabato" => Some(Weekday::Sat),
        "domenica" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_window(raw: &str) -> Result<(NaiveTime, NaiveTime), String> {
    let (open, close) = raw
        .split_once('-')
        .ok_or_else(|| format!("'{}' is not an HH:MM-HH:MM window", raw))?;
    let open = validation::parse_time(open).map_err(|e| e.to_string())?;
    let close = validation::parse_time(close).map_err(|e| e.to_string())?;
    if open >= close {
        return Err(format!("window '{}' closes before it opens", raw));
    }
    Ok((open, close))
}

impl TryFrom<BTreeMap<String, Option<String>>> for OpeningHours {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Option<String>>) -> Result<Self, Self::Error> {
        let mut days = [None; 7];
        for (day, window) in raw {
            let weekday = parse_weekday(&day).ok_or_else(|| format!("unknown weekday '{}'", day))?;
            days[weekday.num_days_from_monday() as usize] = match window.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(w) if w.eq_ignore_ascii_case("closed") || w.eq_ignore_ascii_case("chiuso") => None,
                Some(w) => Some(parse_window(w)?),
            };
        }
        Ok(Self { days })
    }
}
