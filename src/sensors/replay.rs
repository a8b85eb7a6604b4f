//! Line-oriented sensor source.
//!
//! Each line is one directive:
//!
//! ```text
//! # comment
//! accelerometer 0 9.8 0
//! rotation_vector 0.1 0.2 0.3 0.9
//! location 55.75 37.62 150 4 1.2 0.5 90 10
//! availability true
//! sleep 500
//! ```

use std::io::{self, BufRead};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    LocationReading, Registration, SamplingRequest, SensorEvent, SensorSource, SensorType,
    SourceEvent,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },
    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: expected true or false, found '{value}'")]
    InvalidFlag { line: usize, value: String },
    #[error("line {line}: expected {expected} values, found {found}")]
    WrongArity {
        line: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayDirective {
    Event(SourceEvent),
    Sleep(Duration),
}

/// Parses one line; blank lines and comments yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ReplayDirective>, ReplayError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let directive = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let parsed = match directive {
        "sleep" => {
            let [ms] = fixed_args::<1>(line_no, &args)?;
            let ms = ms.parse::<u64>().map_err(|_| ReplayError::InvalidNumber {
                line: line_no,
                value: ms.to_string(),
            })?;
            ReplayDirective::Sleep(Duration::from_millis(ms))
        }
        "availability" => {
            let [flag] = fixed_args::<1>(line_no, &args)?;
            let available = flag.parse::<bool>().map_err(|_| ReplayError::InvalidFlag {
                line: line_no,
                value: flag.to_string(),
            })?;
            ReplayDirective::Event(SourceEvent::LocationAvailability(available))
        }
        "location" => {
            let values = fixed_args::<8>(line_no, &args)?;
            let [lat, lon, alt, acc, speed, speed_acc, bearing, bearing_acc] = values;
            ReplayDirective::Event(SourceEvent::Location(LocationReading {
                latitude: number(line_no, lat)?,
                longitude: number(line_no, lon)?,
                altitude: number(line_no, alt)?,
                accuracy: number(line_no, acc)?,
                speed: number(line_no, speed)?,
                speed_accuracy: number(line_no, speed_acc)?,
                bearing: number(line_no, bearing)?,
                bearing_accuracy: number(line_no, bearing_acc)?,
            }))
        }
        other => {
            let sensor = other
                .parse::<SensorType>()
                .map_err(|_| ReplayError::UnknownDirective {
                    line: line_no,
                    directive: other.to_string(),
                })?;
            if args.len() < sensor.dims() {
                return Err(ReplayError::WrongArity {
                    line: line_no,
                    expected: sensor.dims(),
                    found: args.len(),
                });
            }
            let values = args
                .iter()
                .map(|value| number::<f32>(line_no, value))
                .collect::<Result<Vec<_>, _>>()?;
            ReplayDirective::Event(SourceEvent::Reading(SensorEvent::new(sensor, values)))
        }
    };

    Ok(Some(parsed))
}

fn fixed_args<'a, const N: usize>(
    line_no: usize,
    args: &[&'a str],
) -> Result<[&'a str; N], ReplayError> {
    <[&str; N]>::try_from(args).map_err(|_| ReplayError::WrongArity {
        line: line_no,
        expected: N,
        found: args.len(),
    })
}

fn number<T: std::str::FromStr>(line_no: usize, value: &str) -> Result<T, ReplayError> {
    value.parse::<T>().map_err(|_| ReplayError::InvalidNumber {
        line: line_no,
        value: value.to_string(),
    })
}

type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Where replay lines come from.
enum LineFeed {
    Reader(Lines<BoxedReader>),
    /// Lines pushed by a blocking reader thread.
    Channel(mpsc::UnboundedReceiver<String>),
}

impl LineFeed {
    /// Cancel safe in both variants.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self {
            LineFeed::Reader(lines) => lines.next_line().await,
            LineFeed::Channel(rx) => Ok(rx.recv().await),
        }
    }
}

/// Replays directives from a line feed, once.
pub struct ReplaySource {
    feed: Mutex<Option<LineFeed>>,
    available: Vec<SensorType>,
}

impl ReplaySource {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        Self::from_feed(LineFeed::Reader(reader.lines()))
    }

    /// Replays lines as they arrive on `lines`; the feed ends when every sender is dropped.
    pub fn from_lines(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self::from_feed(LineFeed::Channel(lines))
    }

    /// Reads process stdin on a dedicated thread.
    ///
    /// tokio's stdin parks a blocking-pool thread that cannot be cancelled and would hold
    /// up runtime shutdown while the terminal stays open. The detached thread here never
    /// blocks process exit.
    pub fn stdin() -> Result<Self> {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("sensordemo-stdin".into())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .context("failed to spawn stdin reader thread")?;
        Ok(Self::from_lines(line_rx))
    }

    pub fn with_channels(mut self, available: Vec<SensorType>) -> Self {
        self.available = available;
        self
    }

    fn from_feed(feed: LineFeed) -> Self {
        Self {
            feed: Mutex::new(Some(feed)),
            available: SensorType::PHYSICAL.to_vec(),
        }
    }
}

impl SensorSource for ReplaySource {
    fn available_channels(&self) -> Vec<SensorType> {
        self.available.clone()
    }

    fn register(
        &self,
        channels: &[SensorType],
        request: SamplingRequest,
        sink: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<Registration> {
        let feed = self
            .feed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(feed) = feed else {
            bail!("replay input already consumed");
        };

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(replay_loop(
            feed,
            channels.to_vec(),
            request.location_interval.is_some(),
            sink,
            cancel_token.clone(),
        ));

        Ok(Registration::new(cancel_token, Some(handle)))
    }
}

async fn replay_loop(
    mut feed: LineFeed,
    channels: Vec<SensorType>,
    with_location: bool,
    sink: mpsc::UnboundedSender<SourceEvent>,
    cancel_token: CancellationToken,
) {
    let mut line_no = 0usize;

    loop {
        let next = tokio::select! {
            _ = cancel_token.cancelled() => break,
            next = feed.next_line() => next,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                log_info!("replay input exhausted after {line_no} lines");
                break;
            }
            Err(err) => {
                log_warn!("replay input read failed: {err}");
                break;
            }
        };
        line_no += 1;

        let event = match parse_line(line_no, &line) {
            Ok(Some(ReplayDirective::Event(event))) => event,
            Ok(Some(ReplayDirective::Sleep(duration))) => {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(duration) => continue,
                }
            }
            Ok(None) => continue,
            Err(err) => {
                log_warn!("skipping replay line: {err}");
                continue;
            }
        };

        let wanted = match &event {
            SourceEvent::Reading(reading) => channels.contains(&reading.sensor),
            SourceEvent::Location(_) | SourceEvent::LocationAvailability(_) => with_location,
        };
        if wanted && sink.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn parses_channel_reading() {
        let parsed = parse_line(1, "accelerometer 0 9.8 0").unwrap().unwrap();
        assert_eq!(
            parsed,
            ReplayDirective::Event(SourceEvent::Reading(SensorEvent::new(
                SensorType::Accelerometer,
                [0.0, 9.8, 0.0]
            )))
        );
    }

    #[test]
    fn parses_location_sleep_and_availability() {
        let Some(ReplayDirective::Event(SourceEvent::Location(fix))) =
            parse_line(1, "location 55.75 37.62 150 4 1.2 0.5 90 10").unwrap()
        else {
            panic!("expected location");
        };
        assert_eq!(fix.latitude, 55.75);
        assert_eq!(fix.bearing_accuracy, 10.0);

        assert_eq!(
            parse_line(2, "sleep 250").unwrap(),
            Some(ReplayDirective::Sleep(Duration::from_millis(250)))
        );
        assert_eq!(
            parse_line(3, "availability false").unwrap(),
            Some(ReplayDirective::Event(SourceEvent::LocationAvailability(false)))
        );
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        assert_eq!(parse_line(1, "   ").unwrap(), None);
        assert_eq!(parse_line(2, "# header").unwrap(), None);
    }

    #[test]
    fn reports_malformed_lines() {
        assert_eq!(
            parse_line(4, "barometer 1013").unwrap_err(),
            ReplayError::UnknownDirective {
                line: 4,
                directive: "barometer".into()
            }
        );
        assert_eq!(
            parse_line(5, "rotation_vector 0 0 1").unwrap_err(),
            ReplayError::WrongArity {
                line: 5,
                expected: 4,
                found: 3
            }
        );
        assert!(matches!(
            parse_line(6, "gyroscope 1 two 3").unwrap_err(),
            ReplayError::InvalidNumber { line: 6, .. }
        ));
    }

    #[test]
    fn bad_availability_flag_is_not_a_number_error() {
        let err = parse_line(7, "availability maybe").unwrap_err();
        assert_eq!(
            err,
            ReplayError::InvalidFlag {
                line: 7,
                value: "maybe".into()
            }
        );
        assert_eq!(err.to_string(), "line 7: expected true or false, found 'maybe'");
    }

    #[tokio::test]
    async fn delivers_only_registered_channels() {
        let input = "accelerometer 0 9.8 0\nbad line\ngyroscope 1 2 3\nlocation 1 2 3 4 5 6 7 8\n";
        let source = ReplaySource::new(BufReader::new(input.as_bytes()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = SamplingRequest {
            location_interval: None,
            ..SamplingRequest::default()
        };

        let registration = source
            .register(&[SensorType::Gyroscope], request, tx)
            .unwrap();

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }
        registration.unregister().await.unwrap();

        assert_eq!(
            received,
            vec![SourceEvent::Reading(SensorEvent::new(
                SensorType::Gyroscope,
                [1.0, 2.0, 3.0]
            ))]
        );
    }

    #[tokio::test]
    async fn input_can_only_be_registered_once() {
        let source = ReplaySource::new(BufReader::new(&b""[..]));
        let (tx, _rx) = mpsc::unbounded_channel();
        let first = source
            .register(&SensorType::PHYSICAL, SamplingRequest::default(), tx.clone())
            .unwrap();
        assert!(source
            .register(&SensorType::PHYSICAL, SamplingRequest::default(), tx)
            .is_err());
        first.unregister().await.unwrap();
    }

    #[tokio::test]
    async fn unregister_does_not_wait_for_an_open_line_feed() {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let source = ReplaySource::from_lines(line_rx);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let registration = source
            .register(&SensorType::PHYSICAL, SamplingRequest::default(), tx)
            .unwrap();

        line_tx.send("gravity 0 0 9.8".to_string()).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            SourceEvent::Reading(SensorEvent::new(SensorType::Gravity, [0.0, 0.0, 9.8]))
        );

        // The sender stays alive, like an interactive terminal that never reaches EOF.
        tokio::time::timeout(Duration::from_secs(1), registration.unregister())
            .await
            .expect("unregister blocked on the line feed")
            .unwrap();
        assert!(line_tx.is_closed());
    }
}
