use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single available time slot.
///
/// Times are wall-clock times on the venue's local calendar day and
/// serialize as `HH:MM`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Start of the slot
    #[serde(with = "hhmm")]
    pub time: NaiveTime,

    /// Court name as the venue labels it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,

    /// Price in euros for the slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl TimeSlot {
    pub fn new(time: NaiveTime) -> Self {
        Self {
            time,
            court: None,
            price: None,
        }
    }

    pub fn with_court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Parse a slot time as venues print it (`HH:MM` or `HH:MM:SS`).
    pub fn parse_time(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(court) = &self.court {
            write!(f, "{}: ", court)?;
        }
        write!(f, "{}", self.time.format("%H:%M"))?;
        if let Some(price) = self.price {
            write!(f, " ({}€)", price)?;
        }
        Ok(())
    }
}

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::TimeSlot::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid slot time: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_time_accepts_seconds() {
        assert_eq!(TimeSlot::parse_time("06:00:00"), Some(at(6, 0)));
        assert_eq!(TimeSlot::parse_time(" 18:30 "), Some(at(18, 30)));
        assert_eq!(TimeSlot::parse_time("late"), None);
    }

    #[test]
    fn test_serializes_as_hhmm() {
        let slot = TimeSlot::new(at(9, 30)).with_court("Court 1").with_price(dec!(12));
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["time"], "09:30");
        assert_eq!(json["court"], "Court 1");

        let back: TimeSlot = serde_json::from_value(json).unwrap();
        assert_eq!(back, slot);
    }

    #[test]
    fn test_display() {
        let slot = TimeSlot::new(at(20, 0)).with_court("Kortas 2").with_price(dec!(19));
        assert_eq!(slot.to_string(), "Kortas 2: 20:00 (19€)");
        assert_eq!(TimeSlot::new(at(7, 0)).to_string(), "07:00");
    }
}
