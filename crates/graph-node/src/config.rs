use clap::Parser;

/// Host process configuration. `--cpus` takes precedence over
/// `GRAPHD_CPUS`, which takes precedence over the number of cores
/// detected on the machine.
#[derive(Debug, Parser)]
#[command(name = "graph-node", about = "Brings up a sharded graph store cluster")]
pub struct Config {
    /// Number of shards to run, one per OS thread. Defaults to the
    /// detected core count.
    #[arg(long, env = "GRAPHD_CPUS")]
    cpus: Option<u16>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("cpus must be between 1 and 1024, got {0}")]
    OutOfRange(u16),
}

impl Config {
    /// Resolves and validates the shard count this process should run.
    pub fn shard_count(&self) -> Result<u16, Error> {
        let cpus = self.cpus.unwrap_or_else(|| {
            num_cpus::get().clamp(1, u16::MAX as usize) as u16
        });
        if cpus == 0 || cpus > 1024 {
            return Err(Error::OutOfRange(cpus));
        }
        Ok(cpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_zero_and_over_limit() {
        let mut config = Config::parse_from(["graph-node"]);
        config.cpus = Some(0);
        assert_eq!(config.shard_count(), Err(Error::OutOfRange(0)));

        config.cpus = Some(1025);
        assert_eq!(config.shard_count(), Err(Error::OutOfRange(1025)));
    }

    #[test]
    fn accepts_explicit_value() {
        let mut config = Config::parse_from(["graph-node"]);
        config.cpus = Some(16);
        assert_eq!(config.shard_count(), Ok(16));
    }
}
