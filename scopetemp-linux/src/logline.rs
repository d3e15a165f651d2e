use chrono::{DateTime, Utc};
use scopetemp_protocol::CHANNELS;
use std::fmt;

/// One line of the temperature log:
/// `<unix time> <t1> <t2> <t3> <t4> <fan1> <fan2>`.
///
/// Temperatures have three decimals, fans are `0` or `1`. A channel without a reading is
/// written as `nan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLine {
    /// Time of the reading.
    pub time: DateTime<Utc>,
    /// Channel temperatures.
    pub temperatures: [Option<f64>; CHANNELS],
    /// Fan 1 and fan 2 on.
    pub fans: (bool, bool),
}

impl LogLine {
    /// Line stamped with the current time.
    pub fn now(temperatures: [Option<f64>; CHANNELS], fans: (bool, bool)) -> Self {
        Self {
            time: Utc::now(),
            temperatures,
            fans,
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.timestamp())?;
        for t in self.temperatures {
            match t {
                Some(t) => write!(f, " {t:.3}")?,
                None => f.write_str(" nan")?,
            }
        }
        write!(f, " {} {}", self.fans.0 as u8, self.fans.1 as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_the_log_file() {
        let line = LogLine {
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            temperatures: [Some(40.0), Some(-1.4376), None, Some(21.0624)],
            fans: (true, false),
        };
        assert_eq!(
            line.to_string(),
            "1700000000 40.000 -1.438 nan 21.062 1 0"
        );
    }
}
