use anyhow::{Context as _, anyhow, bail, ensure};
use logos::{Lexer, Logos};
use serde::{Deserialize, Deserializer, de};
use std::{fmt, str::FromStr, time};

/// A human written duration, such as `"30s"` or `"1m 30s"`
///
/// Components are summed. Supported units: `ns`, `us` (or `μs`), `ms`,
/// `s`, `m` and `h`.
///
/// ```
/// # use nextroute::duration::Duration;
/// let duration: Duration = "1m 30s".parse().unwrap();
/// assert_eq!(duration.into_duration().as_secs(), 90);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(time::Duration);

impl Duration {
    pub const fn new(duration: time::Duration) -> Self {
        Self(duration)
    }

    #[inline]
    pub const fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<time::Duration> for Duration {
    fn from(duration: time::Duration) -> Self {
        Self(duration)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

fn component(number: u64, unit: Token) -> Option<time::Duration> {
    match unit {
        Token::NanoSeconds => Some(time::Duration::from_nanos(number)),
        Token::MicroSeconds => Some(time::Duration::from_micros(number)),
        Token::MilliSeconds => Some(time::Duration::from_millis(number)),
        Token::Seconds => Some(time::Duration::from_secs(number)),
        Token::Minutes => number.checked_mul(60).map(time::Duration::from_secs),
        Token::Hours => number.checked_mul(3_600).map(time::Duration::from_secs),
        Token::Value => None,
    }
}

impl FromStr for Duration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);
        let mut total = time::Duration::ZERO;
        let mut components = 0;

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse duration: {s}"))?;
            ensure!(
                number == Token::Value,
                "Expecting duration to start with a number. Cannot parse {s}"
            );
            let number: u64 = lex
                .slice()
                .parse()
                .with_context(|| format!("Failed to parse duration value in `{s}'"))?;

            let Some(Ok(unit)) = lex.next() else {
                bail!("Expecting a unit, failed to parse: {s}")
            };
            if unit == Token::Value {
                bail!("Failed to parse `{s}', expecting a unit.")
            }
            let duration =
                component(number, unit).ok_or_else(|| anyhow!("Duration overflow: {s}"))?;
            total = total
                .checked_add(duration)
                .ok_or_else(|| anyhow!("Duration overflow: {s}"))?;
            components += 1;
        }

        ensure!(components > 0, "Empty duration");
        Ok(Self(total))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(|error: anyhow::Error| de::Error::custom(format!("{error:#}")))
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,
    #[token("h")]
    Hours,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer() {
        let mut lex = Token::lexer("30ms");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.slice(), "30");

        assert_eq!(lex.next(), Some(Ok(Token::MilliSeconds)));
        assert_eq!(lex.span(), 2..4);
        assert_eq!(lex.next(), None);
    }

    #[test]
    fn parse() {
        let Duration(duration) = "30s".parse().unwrap();
        assert_eq!(duration.as_secs(), 30);

        let Duration(duration) = "1m 30s".parse().unwrap();
        assert_eq!(duration.as_secs(), 90);

        let Duration(duration) = "1h".parse().unwrap();
        assert_eq!(duration.as_secs(), 3_600);

        let Duration(duration) = "1s 2000ms 3000000us".parse().unwrap();
        assert_eq!(duration.as_secs(), 6);
    }

    #[test]
    fn invalid() {
        assert!("".parse::<Duration>().is_err());
        assert!("30".parse::<Duration>().is_err());
        assert!("s".parse::<Duration>().is_err());
        assert!("30 40s".parse::<Duration>().is_err());
        assert!("30d".parse::<Duration>().is_err());
        assert!(format!("{}h", u64::MAX).parse::<Duration>().is_err());
    }

    #[test]
    fn display() {
        let duration = Duration::new(time::Duration::from_millis(1_500));
        assert_eq!(duration.to_string(), "1.5s");
    }
}
