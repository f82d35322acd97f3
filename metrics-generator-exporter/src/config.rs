use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use getopts::Options;
use ipnet::IpNet;
use metrics_generator::DEFAULT_INTERVAL;

use crate::error::ConfigError;

/// What the command line asked for.
#[derive(Debug)]
pub enum Command {
    /// Run the exporter.
    Run(ExporterConfig),
    /// Print the usage text and exit.
    Help(String),
}

/// Exporter configuration.
///
/// Every setting has a default, so `ExporterConfig::default()` describes an exporter on port 9200
/// that serves only build info, ticking once per second.
#[derive(Clone, Debug, PartialEq)]
pub struct ExporterConfig {
    listen_address: SocketAddr,
    metric_num: usize,
    label_num: usize,
    interval: Duration,
    file: Option<PathBuf>,
    series: Option<usize>,
    allowed_addresses: Option<Vec<IpNet>>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            listen_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9200)),
            metric_num: 0,
            label_num: 0,
            interval: DEFAULT_INTERVAL,
            file: None,
            series: None,
            allowed_addresses: None,
        }
    }
}

impl ExporterConfig {
    /// Creates a new [`ExporterConfig`] with every setting at its default.
    pub fn new() -> ExporterConfig {
        ExporterConfig::default()
    }

    /// Sets the address the HTTP listener binds to.
    ///
    /// Defaults to `0.0.0.0:9200`.
    pub fn with_listen_address(mut self, address: SocketAddr) -> Self {
        self.listen_address = address;
        self
    }

    /// Sets the number of synthetic metrics to generate.
    ///
    /// Zero, the default, disables generation.  Anything else below the minimum is raised to it
    /// when the exporter starts.
    pub fn with_metric_num(mut self, metric_num: usize) -> Self {
        self.metric_num = metric_num;
        self
    }

    /// Sets the number of `keyN` labels on every synthetic vector.
    pub fn with_label_num(mut self, label_num: usize) -> Self {
        self.label_num = label_num;
        self
    }

    /// Sets the interval between mutation passes.
    ///
    /// Defaults to one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets a text-format snapshot to replay at startup.
    pub fn with_file<P: Into<PathBuf>>(mut self, file: P) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets how many series of each vector are touched per pass, instead of the unit count.
    pub fn with_series(mut self, series: usize) -> Self {
        self.series = Some(series);
        self
    }

    /// Adds an IP address or subnet to the allow-list.
    ///
    /// Once any address is added, requests from addresses outside the list are rejected with
    /// `403 Forbidden`.  A bare address is treated as a single-host subnet.
    ///
    /// ## Errors
    ///
    /// If the given address cannot be parsed into an IP address or subnet, an error variant will
    /// be returned describing the error.
    pub fn add_allowed_address<A>(mut self, address: A) -> Result<Self, ConfigError>
    where
        A: AsRef<str>,
    {
        let address = address.as_ref();
        let net = IpNet::from_str(address)
            .or_else(|_| IpAddr::from_str(address).map(IpNet::from))
            .map_err(|e| ConfigError::InvalidAllowlistAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        self.allowed_addresses.get_or_insert_with(Vec::new).push(net);

        Ok(self)
    }

    /// Address the HTTP listener binds to.
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Number of synthetic metrics requested.
    pub fn metric_num(&self) -> usize {
        self.metric_num
    }

    /// Number of `keyN` labels requested.
    pub fn label_num(&self) -> usize {
        self.label_num
    }

    /// Interval between mutation passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Snapshot to replay at startup, if any.
    pub fn file(&self) -> Option<&PathBuf> {
        self.file.as_ref()
    }

    /// Vector fan-out override, if any.
    pub fn series(&self) -> Option<usize> {
        self.series
    }

    /// Allow-list, if any address was added.
    pub fn allowed_addresses(&self) -> Option<&[IpNet]> {
        self.allowed_addresses.as_deref()
    }

    /// Whether synthetic metrics should be generated at all.
    pub fn generates(&self) -> bool {
        self.metric_num > 0
    }
}

/// Builds the command-line options.
pub fn options() -> Options {
    let mut opts = Options::new();

    opts.optopt(
        "l",
        "listen-address",
        "address to listen on for HTTP requests (default \":9200\")",
        "ADDRESS",
    );
    opts.optopt("m", "metrics", "number of synthetic metrics to generate (default 0)", "INTEGER");
    opts.optopt("n", "labels", "number of labels on each synthetic vector (default 0)", "INTEGER");
    opts.optopt("i", "interval", "interval between mutation passes (default 1s)", "DURATION");
    opts.optopt("f", "file", "text-format metrics file to replay at startup", "PATH");
    opts.optopt(
        "s",
        "series",
        "number of series touched in each vector per pass (default: metrics / 20)",
        "INTEGER",
    );
    opts.optmulti("a", "allow", "IP address or subnet allowed to scrape (repeatable)", "CIDR");
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Formats the usage text for the given program name.
pub fn usage(program: &str, opts: &Options) -> String {
    let brief = format!("Usage: {} [options]", program);
    opts.usage(&brief)
}

/// Parses command-line arguments, not including the program name.
pub fn parse_args<S: AsRef<str>>(program: &str, args: &[S]) -> Result<Command, ConfigError> {
    let opts = options();
    let matches = opts.parse(args.iter().map(|arg| arg.as_ref()))?;

    if matches.opt_present("help") {
        return Ok(Command::Help(usage(program, &opts)));
    }

    let mut config = ExporterConfig::new();

    if let Some(address) = matches.opt_str("listen-address") {
        config = config.with_listen_address(parse_listen_address(&address)?);
    }
    if let Some(value) = matches.opt_str("metrics") {
        config = config.with_metric_num(parse_count("metrics", &value)?);
    }
    if let Some(value) = matches.opt_str("labels") {
        config = config.with_label_num(parse_count("labels", &value)?);
    }
    if let Some(value) = matches.opt_str("interval") {
        let interval = parse_duration(&value).map_err(|reason| ConfigError::InvalidValue {
            option: "interval",
            value: value.clone(),
            reason,
        })?;
        config = config.with_interval(interval);
    }
    if let Some(file) = matches.opt_str("file").filter(|file| !file.is_empty()) {
        config = config.with_file(file);
    }
    if let Some(value) = matches.opt_str("series") {
        config = config.with_series(parse_count("series", &value)?);
    }
    for address in matches.opt_strs("allow") {
        config = config.add_allowed_address(address)?;
    }

    Ok(Command::Run(config))
}

/// Parses a listen address.
///
/// A bare `:port` binds every interface.  Host names are resolved and the first address is used.
pub fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        option: "listen-address",
        value: address.to_string(),
        reason,
    };

    if let Some(port) = address.strip_prefix(':') {
        let port = port.parse::<u16>().map_err(|e| invalid(e.to_string()))?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    if let Ok(address) = SocketAddr::from_str(address) {
        return Ok(address);
    }

    address
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("resolved to no addresses".to_string()))
}

fn parse_count(option: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|e| ConfigError::InvalidValue {
        option,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a duration such as `1s`, `250ms` or `1m30s`.
///
/// Accepted units are `ns`, `us`, `ms`, `s`, `m` and `h`; fractional amounts such as `1.5s` are
/// allowed.  The result must be greater than zero.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    if value.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total_nanos = 0.0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let number_end =
            rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if number_end == 0 {
            return Err(format!("expected a number at `{}`", rest));
        }
        let amount = rest[..number_end].parse::<f64>().map_err(|e| e.to_string())?;
        rest = &rest[number_end..];

        let unit_end = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err("missing unit".to_string()),
            other => return Err(format!("unknown unit `{}`", other)),
        };
        rest = &rest[unit_end..];

        total_nanos += amount * nanos_per_unit;
    }

    let total_nanos = total_nanos.round();
    if total_nanos < 1.0 {
        return Err("duration must be greater than zero".to_string());
    }
    if total_nanos > u64::MAX as f64 {
        return Err("duration is too large".to_string());
    }
    Ok(Duration::from_nanos(total_nanos as u64))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{parse_args, parse_duration, parse_listen_address, Command, ExporterConfig};
    use crate::error::ConfigError;

    fn run(args: &[&str]) -> ExporterConfig {
        match parse_args("metrics-generator", args).expect("arguments should parse") {
            Command::Run(config) => config,
            Command::Help(_) => panic!("expected a run command"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = run(&[]);
        assert_eq!(config, ExporterConfig::default());
        assert_eq!(config.listen_address(), "0.0.0.0:9200".parse::<SocketAddr>().unwrap());
        assert_eq!(config.metric_num(), 0);
        assert_eq!(config.label_num(), 0);
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert!(config.file().is_none());
        assert!(config.series().is_none());
        assert!(config.allowed_addresses().is_none());
        assert!(!config.generates());
    }

    #[test]
    fn test_all_options() {
        let config = run(&[
            "-l",
            "127.0.0.1:9300",
            "--metrics",
            "100",
            "-n",
            "3",
            "--interval",
            "250ms",
            "-f",
            "snapshot.txt",
            "--series",
            "7",
            "-a",
            "10.0.0.0/8",
            "--allow",
            "127.0.0.1",
        ]);

        assert_eq!(config.listen_address(), "127.0.0.1:9300".parse::<SocketAddr>().unwrap());
        assert_eq!(config.metric_num(), 100);
        assert_eq!(config.label_num(), 3);
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.file(), Some(&PathBuf::from("snapshot.txt")));
        assert_eq!(config.series(), Some(7));
        assert!(config.generates());

        let allowed = config.allowed_addresses().expect("allow-list is set");
        assert_eq!(allowed.len(), 2);
        assert_eq!(allowed[1].to_string(), "127.0.0.1/32");
    }

    #[test]
    fn test_help() {
        match parse_args("metrics-generator", &["--help"]).expect("parses") {
            Command::Help(usage) => {
                assert!(usage.starts_with("Usage: metrics-generator [options]"));
                assert!(usage.contains("--listen-address"));
            }
            Command::Run(_) => panic!("expected help"),
        }
    }

    #[test]
    fn test_invalid_values() {
        let result = parse_args("p", &["-m", "lots"]);
        assert!(matches!(result, Err(ConfigError::InvalidValue { option: "metrics", .. })));

        let result = parse_args("p", &["-i", "soon"]);
        assert!(matches!(result, Err(ConfigError::InvalidValue { option: "interval", .. })));

        let result = parse_args("p", &["-a", "not-an-ip"]);
        assert!(matches!(result, Err(ConfigError::InvalidAllowlistAddress { .. })));

        assert!(matches!(parse_args("p", &["--bogus"]), Err(ConfigError::Args(_))));
        assert!(parse_args("p", &["-n", "-1"]).is_err());
    }

    #[test]
    fn test_listen_address() {
        assert_eq!(
            parse_listen_address(":9200").expect("parses"),
            "0.0.0.0:9200".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_address("[::1]:80").expect("parses"),
            "[::1]:80".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_address(":http").is_err());
        assert!(parse_listen_address(":70000").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));

        for bad in ["", "0s", "10", "s", "5 s", "3d", "1.2.3s"] {
            assert!(parse_duration(bad).is_err(), "{:?} should not parse", bad);
        }
    }
}
