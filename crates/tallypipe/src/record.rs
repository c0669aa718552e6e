//! Parsed input records and the items that travel through the channel.

use crate::error::ParseError;
use std::str::FromStr;

/// One `timestamp,key,count` observation, e.g. cars passing a road sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: String,
    pub key: i64,
    pub count: i64,
}

impl Record {
    pub fn new(timestamp: impl Into<String>, key: i64, count: i64) -> Self {
        Self {
            timestamp: timestamp.into(),
            key,
            count,
        }
    }

    /// Parses a `timestamp,key,count` line.
    ///
    /// Fields are trimmed before parsing. Exactly three fields are required.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut fields = line.split(',');
        let (Some(timestamp), Some(key), Some(count), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(ParseError::FieldCount {
                found: line.split(',').count(),
            });
        };

        let timestamp = timestamp.trim();
        if timestamp.is_empty() {
            return Err(ParseError::EmptyTimestamp);
        }

        Ok(Self {
            timestamp: timestamp.to_string(),
            key: parse_field("key", key)?,
            count: parse_field("count", count)?,
        })
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<i64, ParseError> {
    let raw = raw.trim();
    raw.parse().map_err(|_| ParseError::InvalidInteger {
        field,
        value: raw.to_string(),
    })
}

impl FromStr for Record {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What producers put into the bounded channel.
///
/// `Shutdown` is the sentinel: it carries no payload and tells exactly one
/// consumer to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Data(Record),
    Shutdown,
}

impl From<Record> for Item {
    fn from(record: Record) -> Self {
        Self::Data(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let record = Record::parse("2024-01-01T08:00,7,12").unwrap();
        assert_eq!(record, Record::new("2024-01-01T08:00", 7, 12));
    }

    #[test]
    fn test_parse_trims_fields() {
        let record: Record = " t1 , 3 , 9\r".parse().unwrap();
        assert_eq!(record, Record::new("t1", 3, 9));
    }

    #[test]
    fn test_parse_negative_values() {
        let record = Record::parse("t1,-4,-2").unwrap();
        assert_eq!(record.key, -4);
        assert_eq!(record.count, -2);
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(
            Record::parse("t1,2"),
            Err(ParseError::FieldCount { found: 2 })
        );
        assert_eq!(
            Record::parse("t1,2,3,4"),
            Err(ParseError::FieldCount { found: 4 })
        );
        assert_eq!(Record::parse(""), Err(ParseError::FieldCount { found: 1 }));
    }

    #[test]
    fn test_parse_empty_timestamp() {
        assert_eq!(Record::parse(" ,1,2"), Err(ParseError::EmptyTimestamp));
    }

    #[test]
    fn test_parse_bad_integer() {
        assert_eq!(
            Record::parse("t1,abc,2"),
            Err(ParseError::InvalidInteger {
                field: "key",
                value: "abc".to_string()
            })
        );
        assert_eq!(
            Record::parse("t1,1,"),
            Err(ParseError::InvalidInteger {
                field: "count",
                value: String::new()
            })
        );
    }

    #[test]
    fn test_item_from_record() {
        assert_eq!(
            Item::from(Record::new("t", 1, 1)),
            Item::Data(Record::new("t", 1, 1))
        );
    }
}
