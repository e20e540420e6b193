use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str,
};

use nom::{
    character::complete::{digit1, multispace0},
    combinator::{map, map_res},
    error::ParseError,
    sequence::delimited,
    IResult, Parser,
};

use crate::{
    data::{BlockDeviceStats, RequestCounters},
    error::{Error, Result},
    helper::{read_file, under_root},
    platform::interface::Measurement,
};

pub const DEFAULT_PATTERN: &str = "/sys/block/sd*/stat";

/// A combinator that takes a parser `inner` and produces a parser that also
/// consumes both leading and trailing whitespace, returning the output of
/// `inner`.
pub fn ws<'a, O, E: ParseError<&'a str>, F>(
    inner: F,
) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn num<T: str::FromStr>(input: &str) -> IResult<&str, T> {
    map_res(ws(digit1), str::FromStr::from_str).parse(input)
}

fn requests(input: &str) -> IResult<&str, RequestCounters> {
    map((num, num, num, num), |(ios, merges, sectors, ticks)| {
        RequestCounters {
            ios,
            merges,
            sectors,
            ticks,
        }
    })
    .parse(input)
}

/// The first 11 counters of a block `stat` file. Newer kernels append
/// discard and flush counters, which are left unconsumed.
fn block_stat(input: &str) -> IResult<&str, BlockDeviceStats> {
    map(
        (requests, requests, num, num, num),
        |(read, write, in_flight, total_ticks, time_in_queue)| {
            BlockDeviceStats {
                name: String::new(),
                read,
                write,
                in_flight,
                total_ticks,
                time_in_queue,
            }
        },
    )
    .parse(input)
}

/// Device name of a `/sys/block/<name>/stat` style path. The path text is
/// split on `/` as written, so it must have exactly five segments (the
/// leading empty one included) with the name at index 3.
pub fn device_name(path: &Path) -> Result<String> {
    let text = path.to_string_lossy();
    match text.split('/').collect::<Vec<_>>().as_slice() {
        [_, _, _, name, _] => Ok(name.to_string()),
        _ => Err(Error::MalformedPath {
            path: path.to_path_buf(),
        }),
    }
}

/// Builds a sample from the logical `path` and the contents read from it.
pub fn parse_block_stat(
    path: &Path,
    content: &str,
) -> Result<BlockDeviceStats> {
    let name = device_name(path)?;
    let (_, stats) = block_stat(content).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        reason: match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => format!(
                "expected unsigned counter, found {:?}",
                e.input.split_whitespace().next().unwrap_or("end of file")
            ),
            nom::Err::Incomplete(_) => "incomplete input".to_string(),
        },
    })?;
    Ok(BlockDeviceStats { name, ..stats })
}

/// An absolute path glob with a single `*` in one non-final segment, such as
/// `/sys/block/sd*/stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePattern {
    raw: String,
    base: PathBuf,
    prefix: String,
    suffix: String,
    tail: PathBuf,
}

impl DevicePattern {
    /// Directory listed during discovery.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a directory entry name matches the wildcard segment.
    pub fn matches(&self, name: &str) -> bool {
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }

    fn invalid(s: &str, reason: &'static str) -> Error {
        Error::Pattern {
            pattern: s.to_string(),
            reason,
        }
    }
}

impl str::FromStr for DevicePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(Self::invalid(s, "must be an absolute path"));
        };
        if s.matches('*').count() != 1 {
            return Err(Self::invalid(s, "must contain exactly one '*'"));
        }

        let segments: Vec<&str> = rest.split('/').collect();
        let idx = segments
            .iter()
            .position(|segment| segment.contains('*'))
            .ok_or_else(|| Self::invalid(s, "must contain exactly one '*'"))?;
        let tail = segments[idx + 1..].join("/");
        if tail.is_empty() {
            return Err(Self::invalid(
                s,
                "wildcard must not be in the final segment",
            ));
        }
        let (prefix, suffix) = segments[idx]
            .split_once('*')
            .ok_or_else(|| Self::invalid(s, "must contain exactly one '*'"))?;

        Ok(DevicePattern {
            raw: s.to_string(),
            base: Path::new("/").join(segments[..idx].join("/")),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            tail: PathBuf::from(tail),
        })
    }
}

impl fmt::Display for DevicePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Reads block device statistics from sysfs, resolving every logical path
/// under `root`.
#[derive(Debug, Clone)]
pub struct SysfsMeasurement {
    root: PathBuf,
    pattern: DevicePattern,
}

impl SysfsMeasurement {
    pub fn new<P: Into<PathBuf>>(root: P, pattern: DevicePattern) -> Self {
        SysfsMeasurement {
            root: root.into(),
            pattern,
        }
    }

    pub fn pattern(&self) -> &DevicePattern {
        &self.pattern
    }

    fn discovery_error(&self, source: io::Error) -> Error {
        Error::Discovery {
            pattern: self.pattern.to_string(),
            source,
        }
    }
}

impl Measurement for SysfsMeasurement {
    fn block_devices(&self) -> Result<Vec<PathBuf>> {
        let base = under_root(&self.root, &self.pattern.base);
        let entries = match fs::read_dir(&base) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist", base.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.discovery_error(err)),
        };

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| self.discovery_error(err))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !self.pattern.matches(name) {
                continue;
            }
            let logical = self.pattern.base.join(name).join(&self.pattern.tail);
            if under_root(&self.root, &logical).exists() {
                devices.push(logical);
            }
        }
        devices.sort();
        Ok(devices)
    }

    fn block_device_stats(
        &self,
        devices: &[PathBuf],
    ) -> Result<Vec<BlockDeviceStats>> {
        devices
            .iter()
            .map(|device| {
                let physical = under_root(&self.root, device);
                let content = read_file(&physical).map_err(|source| {
                    Error::Open {
                        path: physical,
                        source,
                    }
                })?;
                parse_block_stat(device, &content)
            })
            .collect()
    }
}

#[test]
fn test_block_stat_trailing_counters() {
    let input = concat!(
        "  123456     7890  9876543   45678    23456    34567  3456789",
        "   123456        0    98765   234567        0        0        0",
        "        0     1234      567\n",
    );
    let result =
        parse_block_stat(Path::new("/sys/block/sda/stat"), input).unwrap();
    assert_eq!(result.name, "sda");
    assert_eq!(
        result.read,
        RequestCounters {
            ios: 123456,
            merges: 7890,
            sectors: 9876543,
            ticks: 45678,
        }
    );
    assert_eq!(
        result.write,
        RequestCounters {
            ios: 23456,
            merges: 34567,
            sectors: 3456789,
            ticks: 123456,
        }
    );
    assert_eq!(result.in_flight, 0);
    assert_eq!(result.total_ticks, 98765);
    assert_eq!(result.time_in_queue, 234567);
}

#[test]
fn test_block_stat_matches_rendered_counters() {
    let stats = BlockDeviceStats {
        name: "sdc".to_string(),
        read: RequestCounters {
            ios: 11,
            merges: 0,
            sectors: u64::MAX,
            ticks: 7,
        },
        write: RequestCounters {
            ios: 3,
            merges: 1,
            sectors: 24,
            ticks: 9,
        },
        in_flight: 2,
        total_ticks: 40,
        time_in_queue: 51,
    };
    let rendered = stats.to_string();
    let (name, counters) = rendered.split_once(' ').unwrap();
    assert_eq!(name, "sdc");
    let parsed =
        parse_block_stat(Path::new("/sys/block/sdc/stat"), counters).unwrap();
    assert_eq!(parsed, stats);
}

#[test]
fn test_block_stat_missing_field() {
    let err = parse_block_stat(
        Path::new("/sys/block/sda/stat"),
        "1 2 3 4 5 6 7 8 9 10\n",
    )
    .unwrap_err();
    match err {
        Error::Parse { path, reason } => {
            assert_eq!(path, Path::new("/sys/block/sda/stat"));
            assert!(reason.contains("end of file"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_block_stat_non_numeric_field() {
    let err = parse_block_stat(
        Path::new("/sys/block/sda/stat"),
        "1 2 3 4 5 six 7 8 9 10 11\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("/sys/block/sda/stat"));
    assert!(err.to_string().contains("six"));
}

#[test]
fn test_block_stat_overflowing_field() {
    let err = parse_block_stat(
        Path::new("/sys/block/sda/stat"),
        "1 2 3 4 5 6 7 8 9 99999999999999999999 11\n",
    )
    .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_device_name_component_count() {
    let valid = "1 2 3 4 5 6 7 8 9 10 11";
    for path in ["/sys/block/stat", "/sys/block/sda/device/stat", "stat"] {
        match parse_block_stat(Path::new(path), valid) {
            Err(Error::MalformedPath { path: bad }) => {
                assert_eq!(bad, Path::new(path))
            }
            other => panic!("{path}: unexpected result {other:?}"),
        }
    }
    assert_eq!(
        device_name(Path::new("/sys/block/nvme0n1/stat")).unwrap(),
        "nvme0n1"
    );
}

#[test]
fn test_device_name_counts_segments_as_written() {
    for path in [
        "/sys/block/./sda/stat",
        "/sys//block/sda/stat",
        "/sys/block/sda/stat/",
    ] {
        assert!(
            matches!(
                device_name(Path::new(path)),
                Err(Error::MalformedPath { .. })
            ),
            "{path}"
        );
    }
}

#[test]
fn test_device_pattern() {
    let pattern: DevicePattern = DEFAULT_PATTERN.parse().unwrap();
    assert_eq!(pattern.base(), Path::new("/sys/block"));
    assert!(pattern.matches("sda"));
    assert!(pattern.matches("sd"));
    assert!(!pattern.matches("nvme0n1"));
    assert_eq!(pattern.to_string(), DEFAULT_PATTERN);

    let pattern: DevicePattern = "/sys/block/*n1/stat".parse().unwrap();
    assert!(pattern.matches("nvme0n1"));
    assert!(!pattern.matches("sda"));

    for bad in [
        "sys/block/sd*/stat",
        "/sys/block/sda/stat",
        "/sys/block/sd*/*",
        "/sys/block/sd*",
        "/sys/block/sd*/",
    ] {
        assert!(
            matches!(bad.parse::<DevicePattern>(), Err(Error::Pattern { .. })),
            "{bad}"
        );
    }
}
