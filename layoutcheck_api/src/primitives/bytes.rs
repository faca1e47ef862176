use std::{
    fmt::Display,
    ops::{Add, Div, Mul, Sub},
    str::FromStr,
};

pub const KIB: u64 = 1 << 10;
pub const MIB: u64 = 1 << 20;
pub const GIB: u64 = 1 << 30;
pub const TIB: u64 = 1 << 40;

/// Binary units, largest first, used for display.
const BINARY_UNITS: [(u64, &str); 4] = [(TIB, "TiB"), (GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseByteCountError {
    #[error("size is empty")]
    Empty,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown size unit '{0}'")]
    UnknownUnit(String),
    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteCount(pub u64);

impl From<u64> for ByteCount {
    fn from(x: u64) -> Self {
        ByteCount(x)
    }
}

impl ByteCount {
    /// Saturates at `u64::MAX` bytes.
    pub const fn from_mib(mib: u64) -> Self {
        ByteCount(mib.saturating_mul(MIB))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Size in whole MiB, rounded down.
    pub fn mib(self) -> u64 {
        self.0 / MIB
    }

    /// Human readable size using binary units and at most two decimals, for
    /// messages shown to the operator. Rounded, so not suitable for
    /// round-tripping.
    pub fn to_human_readable(&self) -> String {
        let Some((unit, suffix)) = BINARY_UNITS.iter().find(|(unit, _)| self.0 >= *unit) else {
            return format!("{} B", self.0);
        };

        let value = format!("{:.2}", self.0 as f64 / *unit as f64);
        let value = value.trim_end_matches('0').trim_end_matches('.');
        format!("{value} {suffix}")
    }

    /// Exact representation: the largest binary unit that divides the count
    /// evenly, or `None` when the count is not a multiple of 1 KiB.
    fn to_exact_string(self) -> Option<String> {
        if self.0 == 0 {
            return Some("0".into());
        }

        BINARY_UNITS
            .iter()
            .find(|(unit, _)| self.0 % unit == 0)
            .map(|(unit, suffix)| format!("{} {suffix}", self.0 / unit))
    }

    pub fn from_human_readable(s: &str) -> Result<Self, ParseByteCountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseByteCountError::Empty);
        }

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        if number.is_empty() {
            return Err(ParseByteCountError::InvalidNumber(s.into()));
        }

        let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "k" | "kib" => KIB,
            "m" | "mib" => MIB,
            "g" | "gib" => GIB,
            "t" | "tib" => TIB,
            "kb" => 1_000,
            "mb" => 1_000_000,
            "gb" => 1_000_000_000,
            "tb" => 1_000_000_000_000,
            _ => return Err(ParseByteCountError::UnknownUnit(unit.trim().into())),
        };

        if number.contains('.') {
            let value = number
                .parse::<f64>()
                .map_err(|_| ParseByteCountError::InvalidNumber(number.into()))?;
            let bytes = value * multiplier as f64;
            if bytes >= u64::MAX as f64 {
                return Err(ParseByteCountError::Overflow(s.into()));
            }
            Ok(Self(bytes.round() as u64))
        } else {
            let value = number
                .parse::<u64>()
                .map_err(|_| ParseByteCountError::InvalidNumber(number.into()))?;
            value
                .checked_mul(multiplier)
                .map(Self)
                .ok_or_else(|| ParseByteCountError::Overflow(s.into()))
        }
    }

    /// Parses a size typed by a user. A bare number is taken to be in MiB and
    /// anything smaller than 1 MiB is raised to 1 MiB. Returns `None` when
    /// there is nothing to parse or the input is not a valid size.
    pub fn from_input(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let size = if input.ends_with(|c: char| c.is_ascii_digit() || c == '.') {
            Self::from_human_readable(&format!("{input}MiB"))
        } else {
            Self::from_human_readable(input)
        }
        .ok()?;

        Some(size.max(ByteCount(MIB)))
    }
}

impl Add for ByteCount {
    type Output = ByteCount;

    fn add(self, rhs: Self) -> Self::Output {
        ByteCount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for ByteCount {
    type Output = ByteCount;

    fn sub(self, rhs: Self) -> Self::Output {
        ByteCount(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u64> for ByteCount {
    type Output = ByteCount;

    fn mul(self, rhs: u64) -> Self::Output {
        ByteCount(self.0.saturating_mul(rhs))
    }
}

impl Div<u64> for ByteCount {
    type Output = ByteCount;

    fn div(self, rhs: u64) -> Self::Output {
        ByteCount(self.0 / rhs)
    }
}

impl Display for ByteCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

impl FromStr for ByteCount {
    type Err = ParseByteCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_human_readable(s)
    }
}

impl<'de> serde::Deserialize<'de> for ByteCount {
    fn deserialize<D>(deserializer: D) -> Result<ByteCount, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Size may be provided as a string (e.g. "1 MiB") or as a pure number
        // of bytes (e.g. 1048576). Serde forces a number when only digits are
        // provided, so we need to deserialize as a generic value and then
        // check the type.
        let value = serde_yaml::Value::deserialize(deserializer)?;

        match value {
            serde_yaml::Value::String(s) => ByteCount::from_str(s.as_str())
                .map_err(|e| serde::de::Error::custom(format!("invalid byte count size: {e}"))),
            serde_yaml::Value::Number(n) => {
                let n = n.as_u64().ok_or_else(|| {
                    serde::de::Error::custom("invalid byte count size, expected unsigned integer")
                })?;
                Ok(ByteCount(n))
            }
            _ => Err(serde::de::Error::custom("invalid byte count size")),
        }
    }
}

impl serde::Serialize for ByteCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.to_exact_string() {
            Some(s) if self.0 != 0 => serializer.serialize_str(&s),
            // Not a multiple of 1 KiB, so only a raw number is exact.
            _ => serializer.serialize_u64(self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        assert_eq!(ByteCount::from_str("1").unwrap(), ByteCount(1));
        assert_eq!(ByteCount::from_str("20K").unwrap(), ByteCount(20 * KIB));
        assert_eq!(ByteCount::from_str("30 MiB").unwrap(), ByteCount(30 * MIB));
        assert_eq!(ByteCount::from_str("40GiB").unwrap(), ByteCount(40 * GIB));
        assert_eq!(ByteCount::from_str("50 T").unwrap(), ByteCount(50 * TIB));
        assert_eq!(
            ByteCount::from_str("2 GB").unwrap(),
            ByteCount(2_000_000_000)
        );
        assert_eq!(
            ByteCount::from_str("1.5 GiB").unwrap(),
            ByteCount(GIB + GIB / 2)
        );

        // Allowed spacing
        assert_eq!(ByteCount::from_str(" 1024 ").unwrap(), ByteCount(1024));
        assert_eq!(
            ByteCount::from_str(" 300 kib ").unwrap(),
            ByteCount(300 * KIB)
        );

        // Invalid spacing
        assert!(matches!(
            ByteCount::from_str("1 0K"),
            Err(ParseByteCountError::UnknownUnit(_))
        ));

        // Invalid units
        assert!(ByteCount::from_str("1.0X").is_err());
        assert!(ByteCount::from_str("1KX").is_err());

        // Invalid leading characters
        assert!(matches!(
            ByteCount::from_str("X10K"),
            Err(ParseByteCountError::InvalidNumber(_))
        ));

        // Garbage
        assert_eq!(ByteCount::from_str("   "), Err(ParseByteCountError::Empty));
        assert!(ByteCount::from_str("1.2.3M").is_err());
        assert!(matches!(
            ByteCount::from_str("99999999999T"),
            Err(ParseByteCountError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(ByteCount(0).to_string(), "0 B");
        assert_eq!(ByteCount(1023).to_string(), "1023 B");
        assert_eq!(ByteCount(KIB).to_string(), "1 KiB");
        assert_eq!(ByteCount::from_mib(250).to_string(), "250 MiB");
        assert_eq!(ByteCount::from_mib(1536).to_string(), "1.5 GiB");
        assert_eq!(ByteCount::from_mib(520).to_string(), "520 MiB");
        assert_eq!(ByteCount(GIB + 1).to_string(), "1 GiB");
        assert_eq!(ByteCount(3 * TIB).to_string(), "3 TiB");
    }

    #[test]
    fn test_from_input() {
        assert_eq!(ByteCount::from_input(""), None);
        assert_eq!(ByteCount::from_input("   "), None);
        assert_eq!(ByteCount::from_input("500"), Some(ByteCount::from_mib(500)));
        assert_eq!(ByteCount::from_input("2 GiB"), Some(ByteCount(2 * GIB)));
        assert_eq!(
            ByteCount::from_input("1.5"),
            Some(ByteCount(MIB + MIB / 2))
        );
        // Anything below 1 MiB is raised to the minimum
        assert_eq!(ByteCount::from_input("10 KiB"), Some(ByteCount(MIB)));
        assert_eq!(ByteCount::from_input("0"), Some(ByteCount(MIB)));
        assert_eq!(ByteCount::from_input("lots"), None);
        assert_eq!(ByteCount::from_input("5 XB"), None);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            ByteCount::from_mib(320) + ByteCount::from_mib(200),
            ByteCount::from_mib(520)
        );
        assert_eq!(ByteCount(1) - ByteCount(2), ByteCount(0));
        assert_eq!(ByteCount::from_mib(3) * 2, ByteCount::from_mib(6));
        assert_eq!(ByteCount::from_mib(6) / 3, ByteCount::from_mib(2));
        assert_eq!(ByteCount(GIB + 1).mib(), 1024);
        assert_eq!(ByteCount::from_mib(u64::MAX), ByteCount(u64::MAX));
        assert_eq!(ByteCount::from_mib(u64::MAX / 1024), ByteCount(u64::MAX));
    }

    #[test]
    fn test_serialization() {
        #[derive(Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
        struct TestStruct {
            size: ByteCount,
        }

        impl TestStruct {
            fn size(v: u64) -> Self {
                Self { size: v.into() }
            }
        }

        let test_cases = [
            ("size: 0", TestStruct::size(0), "size: 0"),
            ("size: 512", TestStruct::size(512), "size: 512"),
            ("size: 1K", TestStruct::size(1024), "size: 1 KiB"),
            ("size: 1024", TestStruct::size(1024), "size: 1 KiB"),
            ("size: 1025", TestStruct::size(1025), "size: 1025"),
            ("size: 1M", TestStruct::size(MIB), "size: 1 MiB"),
            ("size: 1025 KiB", TestStruct::size(1025 * KIB), "size: 1025 KiB"),
            ("size: 250 MiB", TestStruct::size(250 * MIB), "size: 250 MiB"),
            ("size: 1024M", TestStruct::size(GIB), "size: 1 GiB"),
        ];

        for (input_yaml, expected_struct, expected_yaml) in test_cases.iter() {
            let actual: TestStruct = serde_yaml::from_str(input_yaml).unwrap();
            assert_eq!(
                actual, *expected_struct,
                "failed to deserialize '{input_yaml}'"
            );

            let actual = serde_yaml::to_string(&actual).unwrap();
            assert_eq!(
                actual.trim(),
                *expected_yaml,
                "failed to serialize '{expected_struct:?}'"
            );
        }

        assert!(serde_yaml::from_str::<TestStruct>("size: [1]").is_err());
        assert!(serde_yaml::from_str::<TestStruct>("size: -4").is_err());
    }
}
