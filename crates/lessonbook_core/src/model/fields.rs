//! Validated scalar field values shared by students and lessons.
//!
//! # Responsibility
//! - Parse raw strings into typed field values exactly once.
//! - Keep the textual wire form of each value stable for persistence.
//!
//! # Invariants
//! - A constructed value always satisfies its field rule.
//! - `as_str()`/`Display` return the canonical wire form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ]*$").expect("valid name regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9]+([+_.\-][A-Za-z0-9]+)*@([A-Za-z0-9]([A-Za-z0-9\-]*[A-Za-z0-9])?\.)*[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9]$",
    )
    .expect("valid email regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid tag regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3])([0-5][0-9])$").expect("valid time regex"));

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    InvalidName(String),
    InvalidPhone(String),
    InvalidEmail(String),
    InvalidTag(String),
    InvalidDay(String),
    InvalidTime(String),
    /// Lesson window ends before it starts.
    EndBeforeStart { start: Time, end: Time },
}

impl FieldError {
    /// Human-readable rule the rejected value violated.
    pub fn constraint(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => {
                "names should only contain alphanumeric characters and spaces, and must not be blank"
            }
            Self::InvalidPhone(_) => "phone numbers should only contain digits and be at least 3 digits long",
            Self::InvalidEmail(_) => "emails should be of the format local-part@domain",
            Self::InvalidTag(_) => "tag names should be alphanumeric",
            Self::InvalidDay(_) => "day should be one of: Mon, Tue, Wed, Thu, Fri, Sat, Sun (case-insensitive)",
            Self::InvalidTime(_) => "time should be in 24-hour format HHMM (e.g. 0930)",
            Self::EndBeforeStart { .. } => "end time must not be earlier than start time",
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value)
            | Self::InvalidPhone(value)
            | Self::InvalidEmail(value)
            | Self::InvalidTag(value)
            | Self::InvalidDay(value)
            | Self::InvalidTime(value) => write!(f, "invalid value `{value}`: {}", self.constraint()),
            Self::EndBeforeStart { start, end } => {
                write!(f, "end time {end} is earlier than start time {start}")
            }
        }
    }
}

impl Error for FieldError {}

macro_rules! checked_text_field {
    ($(#[$meta:meta])* $name:ident, $re:ident, $err:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: impl Into<String>) -> Result<Self, FieldError> {
                let value = value.into();
                if $re.is_match(&value) {
                    Ok(Self(value))
                } else {
                    Err(FieldError::$err(value))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = FieldError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }
    };
}

checked_text_field!(
    /// Student display name.
    Name,
    NAME_RE,
    InvalidName
);
checked_text_field!(
    /// Contact phone number, digits only.
    Phone,
    PHONE_RE,
    InvalidPhone
);
checked_text_field!(
    /// Contact email address.
    Email,
    EMAIL_RE,
    InvalidEmail
);
checked_text_field!(
    /// Free-form label attached to a student.
    Tag,
    TAG_RE,
    InvalidTag
);

/// Free-text note. Any string is accepted, including empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Note(String);

impl Note {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location where a lesson takes place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Venue(String);

impl Venue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Venue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Day of the week a lesson is held on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    /// Parses a day name case-insensitively (`mon`, `Mon`, `MON`).
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        match value.to_ascii_uppercase().as_str() {
            "MON" => Ok(Self::Mon),
            "TUE" => Ok(Self::Tue),
            "WED" => Ok(Self::Wed),
            "THU" => Ok(Self::Thu),
            "FRI" => Ok(Self::Fri),
            "SAT" => Ok(Self::Sat),
            "SUN" => Ok(Self::Sun),
            _ => Err(FieldError::InvalidDay(value.to_string())),
        }
    }

    /// Upper-case wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mon => "MON",
            Self::Tue => "TUE",
            Self::Wed => "WED",
            Self::Thu => "THU",
            Self::Fri => "FRI",
            Self::Sat => "SAT",
            Self::Sun => "SUN",
        }
    }
}

impl Display for Day {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Wall-clock time of day written as 24-hour `HHMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    hour: u8,
    minute: u8,
}

impl Time {
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        let caps = TIME_RE
            .captures(value)
            .ok_or_else(|| FieldError::InvalidTime(value.to_string()))?;
        let hour = caps[1]
            .parse()
            .map_err(|_| FieldError::InvalidTime(value.to_string()))?;
        let minute = caps[2]
            .parse()
            .map_err(|_| FieldError::InvalidTime(value.to_string()))?;
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}{:02}", self.hour, self.minute)
    }
}

impl FromStr for Time {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Day, Email, FieldError, Name, Phone, Tag, Time};

    #[test]
    fn name_rejects_blank_and_symbols() {
        assert!(Name::parse("Alice Pauline").is_ok());
        assert!(Name::parse("").is_err());
        assert!(Name::parse(" leading").is_err());
        assert!(Name::parse("peter*").is_err());
    }

    #[test]
    fn phone_requires_three_digits() {
        assert!(Phone::parse("911").is_ok());
        assert!(Phone::parse("91").is_err());
        assert!(Phone::parse("9011p041").is_err());
    }

    #[test]
    fn email_accepts_common_shapes() {
        for valid in ["a@bc", "alice@example.com", "a+b.c-d@mail.example-host.org"] {
            assert!(Email::parse(valid).is_ok(), "{valid} should be valid");
        }
        for invalid in ["", "@example.com", "alice@", "alice@x", "-a@example.com", "a@-ex.com"] {
            assert!(Email::parse(invalid).is_err(), "{invalid} should be invalid");
        }
    }

    #[test]
    fn tag_must_be_alphanumeric() {
        assert!(Tag::parse("owesMoney").is_ok());
        assert!(Tag::parse("owes money").is_err());
    }

    #[test]
    fn day_parses_case_insensitively_and_writes_upper_case() {
        assert_eq!(Day::parse("mon").unwrap(), Day::Mon);
        assert_eq!(Day::parse("Sun").unwrap().to_string(), "SUN");
        assert!(matches!(Day::parse("Funday"), Err(FieldError::InvalidDay(_))));
    }

    #[test]
    fn time_accepts_only_hhmm() {
        let time = Time::parse("0930").unwrap();
        assert_eq!((time.hour(), time.minute()), (9, 30));
        assert_eq!(time.to_string(), "0930");
        for invalid in ["2500", "9999", "930", "09:30", "1260", ""] {
            assert!(Time::parse(invalid).is_err(), "{invalid} should be invalid");
        }
        assert!(Time::parse("0900").unwrap() < Time::parse("1030").unwrap());
    }
}
