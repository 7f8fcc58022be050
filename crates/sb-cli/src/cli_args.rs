use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sb-cli")]
#[command(about = "ScriptBridge host harness CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Load scripts against the sample machine and drive run ticks.
    Run(RunArgs),
    /// Print the sample machine's scripting memory map.
    Map,
    /// Print the reflected machine surface.
    Describe,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "script")]
    pub(crate) scripts: Vec<String>,
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: Option<String>,
    #[arg(long = "ticks", default_value_t = 60)]
    pub(crate) ticks: u32,
    #[arg(long = "symbol")]
    pub(crate) symbol: Option<String>,
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn run_arguments_parse_with_defaults() {
        let cli = Cli::try_parse_from(["sb-cli", "run", "--script", "demo.rhai"])
            .expect("run args should parse");
        let Mode::Run(args) = cli.command else {
            panic!("expected run mode");
        };
        assert_eq!(args.scripts, vec!["demo.rhai".to_string()]);
        assert_eq!(args.ticks, 60);
        assert!(args.scripts_dir.is_none());
        assert!(args.symbol.is_none());
    }

    #[test]
    fn map_and_describe_parse() {
        assert!(matches!(
            Cli::try_parse_from(["sb-cli", "map"]).expect("map should parse").command,
            Mode::Map
        ));
        assert!(matches!(
            Cli::try_parse_from(["sb-cli", "describe"])
                .expect("describe should parse")
                .command,
            Mode::Describe
        ));
    }
}
