use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::block::Dialect;
use crate::graph::ChainPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "dbh-rs",
    about = "Compiles DBH command scripts into Scratch 3 projects (.sb3 or project.json)."
)]
pub struct Args {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Write a plain project.json document instead of an .sb3 archive.")]
    pub json: bool,

    #[arg(long, value_enum, default_value_t = DialectArg::Tuple, help = "Operand encoding used for block inputs.")]
    pub dialect: DialectArg,

    #[arg(long, value_enum, default_value_t = ChainArg::Independent, help = "How consecutive top-level commands are linked.")]
    pub chain: ChainArg,

    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100), help = "JPEG quality for re-encoded opaque bitmaps.")]
    pub quality: u8,

    #[arg(long, help = "Keep bitmap costumes exactly as supplied.")]
    pub no_compress: bool,

    #[arg(long, help = "Project name reported when the package is written (defaults to the input file stem).")]
    pub name: Option<String>,

    #[arg(long, help = "Treat INPUT as an existing package and print a summary of it.")]
    pub inspect: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v debug, -vv trace).")]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Tuple,
    Named,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tuple => Dialect::TypedTuple,
            DialectArg::Named => Dialect::NamedField,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChainArg {
    Independent,
    Sequential,
}

impl From<ChainArg> for ChainPolicy {
    fn from(arg: ChainArg) -> Self {
        match arg {
            ChainArg::Independent => ChainPolicy::Independent,
            ChainArg::Sequential => ChainPolicy::Sequential,
        }
    }
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_an_archive_with_tuple_inputs() {
        let args = Args::try_parse_from(["dbh-rs", "game.dbh", "game.sb3"]).unwrap();
        assert!(!args.json);
        assert_eq!(Dialect::from(args.dialect), Dialect::TypedTuple);
        assert_eq!(ChainPolicy::from(args.chain), ChainPolicy::Independent);
        assert_eq!(args.quality, 85);
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn flags_select_alternatives() {
        let args = Args::try_parse_from([
            "dbh-rs",
            "game.dbh",
            "--json",
            "--dialect",
            "named",
            "--chain",
            "sequential",
            "-vv",
        ])
        .unwrap();
        assert!(args.json);
        assert_eq!(Dialect::from(args.dialect), Dialect::NamedField);
        assert_eq!(ChainPolicy::from(args.chain), ChainPolicy::Sequential);
        assert_eq!(args.log_filter(), "trace");
    }

    #[test]
    fn name_flag_is_optional() {
        let args = Args::try_parse_from(["dbh-rs", "game.dbh", "--name", "Arcade"]).unwrap();
        assert_eq!(args.name.as_deref(), Some("Arcade"));
        let args = Args::try_parse_from(["dbh-rs", "game.dbh"]).unwrap();
        assert!(args.name.is_none());
    }

    #[test]
    fn quality_is_bounded() {
        assert!(Args::try_parse_from(["dbh-rs", "a", "--quality", "0"]).is_err());
        assert!(Args::try_parse_from(["dbh-rs", "a", "--quality", "101"]).is_err());
    }
}
